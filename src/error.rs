//! 错误类型定义

use thiserror::Error;

/// 交易客户端错误类型
#[derive(Error, Debug)]
pub enum EmtError {
    /// HTTP 请求错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 非 200 响应
    #[error("Transport error: HTTP {status} - {body}")]
    Transport { status: u16, body: String },

    /// 协议错误 (响应格式不符合预期)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON 解析错误
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 加密错误
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// 验证码识别失败
    #[error("Captcha error: {0}")]
    Captcha(String),

    /// 超时
    #[error("Operation timeout")]
    Timeout,

    /// 调用方取消
    #[error("Operation cancelled")]
    Cancelled,

    /// 文件读写错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 无效参数
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(String),
}

impl EmtError {
    /// 从非 200 响应创建错误, 响应体截断到 256 字节
    pub fn transport(status: u16, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let body = text.chars().take(256).collect();
        EmtError::Transport { status, body }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, EmtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_body_truncated() {
        let body = vec![b'x'; 1000];
        match EmtError::transport(502, &body) {
            EmtError::Transport { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), 256);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
