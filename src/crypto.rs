//! RSA 密码加密模块

use crate::error::{EmtError, Result};
use crate::protocol::PUBLIC_KEY_PEM;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

/// 登录密码加密器
///
/// 使用内置的服务器公钥 (PKCS#1 v1.5 填充), 输出 base64 文本以便表单提交
#[derive(Clone)]
pub struct CredentialEncryptor {
    public_key: RsaPublicKey,
}

impl CredentialEncryptor {
    /// 创建新的加密器
    pub fn new() -> Result<Self> {
        let public_key = RsaPublicKey::from_public_key_pem(PUBLIC_KEY_PEM.trim())
            .map_err(|e| EmtError::Encryption(format!("Failed to load public key: {}", e)))?;
        Ok(Self { public_key })
    }

    /// 加密明文
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut rng = rand::thread_rng();
        let encrypted = self
            .public_key
            .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext.as_bytes())
            .map_err(|e| EmtError::Encryption(format!("Encryption failed: {}", e)))?;
        Ok(STANDARD.encode(encrypted))
    }
}

impl std::fmt::Debug for CredentialEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEncryptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;

    #[test]
    fn test_public_key_loads() {
        let encryptor = CredentialEncryptor::new().unwrap();
        assert_eq!(encryptor.public_key.size(), 128);
    }

    #[test]
    fn test_encrypt_produces_base64_block() {
        let encryptor = CredentialEncryptor::new().unwrap();
        let encrypted = encryptor.encrypt("123456").unwrap();

        let raw = STANDARD.decode(&encrypted).unwrap();
        assert_eq!(raw.len(), 128);
        assert!(!encrypted.contains("123456"));
    }

    #[test]
    fn test_padding_is_randomized() {
        let encryptor = CredentialEncryptor::new().unwrap();
        let a = encryptor.encrypt("password").unwrap();
        let b = encryptor.encrypt("password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_oversized_plaintext_rejected() {
        let encryptor = CredentialEncryptor::new().unwrap();
        let long = "x".repeat(200);
        assert!(matches!(encryptor.encrypt(&long), Err(EmtError::Encryption(_))));
    }
}
