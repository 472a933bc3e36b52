//! 登录验证码
//!
//! 验证码图片与一个随机的关联数绑定, 登录时必须原样带回。识别由外部 OCR 完成。

use crate::api::{HttpRequest, Transport};
use crate::config::ClientConfig;
use crate::error::{EmtError, Result};
use crate::protocol::CAPTCHA_PATH;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// 验证码识别引擎
pub trait CaptchaRecognizer: Send + Sync {
    /// 尽力识别图片中的数字, 结果可能为空或包含非数字
    fn recognize(&self, image: &[u8]) -> String;
}

impl<F> CaptchaRecognizer for F
where
    F: Fn(&[u8]) -> String + Send + Sync,
{
    fn recognize(&self, image: &[u8]) -> String {
        self(image)
    }
}

/// 验证码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaAnswer {
    /// 关联数, 与获取图片时发送的文本完全一致
    pub correlation: String,
    /// 识别出的数字
    pub code: String,
}

/// 验证码求解器
pub struct CaptchaSolver {
    recognizer: Arc<dyn CaptchaRecognizer>,
    base_url: String,
    max_attempts: u32,
    backoff: Duration,
    image_path: Option<PathBuf>,
    correlation_source: fn() -> f64,
}

impl CaptchaSolver {
    pub fn new(config: &ClientConfig, recognizer: Arc<dyn CaptchaRecognizer>) -> Self {
        Self {
            recognizer,
            base_url: config.base_url.clone(),
            max_attempts: config.captcha_max_attempts.max(1),
            backoff: config.captcha_retry_backoff,
            image_path: config.captcha_image_path.clone(),
            correlation_source: rand::random::<f64>,
        }
    }

    /// 替换关联数来源
    pub fn with_correlation_source(mut self, source: fn() -> f64) -> Self {
        self.correlation_source = source;
        self
    }

    /// 获取一张验证码图片, 返回 (关联数, 图片)
    pub async fn fetch(&self, transport: &dyn Transport, headers: &[(String, String)]) -> Result<(String, Vec<u8>)> {
        let correlation = (self.correlation_source)().to_string();
        let url = format!("{}{}?randNum={}", self.base_url, CAPTCHA_PATH, correlation);

        let reply = transport.execute(HttpRequest::get(url).headers(headers)).await?;
        if !reply.is_success() {
            tracing::error!("Get captcha failed, code={}, response={}", reply.status, reply.text());
            return Err(EmtError::transport(reply.status, &reply.body));
        }

        if let Err(e) = self.persist(&reply.body).await {
            tracing::warn!("Failed to save captcha image: {}", e);
        }
        Ok((correlation, reply.body))
    }

    /// 识别验证码, 只有纯数字结果才有效
    pub fn recognize(&self, image: &[u8]) -> Option<String> {
        let raw = self.recognizer.recognize(image);
        let code = raw.trim();
        if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
            Some(code.to_string())
        } else {
            tracing::warn!("Captcha recognized as non-numeric: {:?}", raw);
            None
        }
    }

    /// 获取并识别验证码, 最多尝试 `max_attempts` 次
    pub async fn solve(&self, transport: &dyn Transport, headers: &[(String, String)]) -> Result<CaptchaAnswer> {
        for attempt in 1..=self.max_attempts {
            let (correlation, image) = self.fetch(transport, headers).await?;
            if let Some(code) = self.recognize(&image) {
                tracing::debug!("Captcha solved on attempt {}: correlation={}, code={}", attempt, correlation, code);
                return Ok(CaptchaAnswer { correlation, code });
            }
            if attempt < self.max_attempts && !self.backoff.is_zero() {
                tokio::time::sleep(self.backoff).await;
            }
        }
        Err(EmtError::Captcha(format!(
            "no numeric code after {} attempts",
            self.max_attempts
        )))
    }

    /// 保存最近一次的图片, 仅用于排查
    async fn persist(&self, image: &[u8]) -> Result<()> {
        let Some(path) = &self.image_path else {
            return Ok(());
        };
        tokio::fs::write(path, image).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpReply;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct ImageServer {
        status: u16,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for ImageServer {
        async fn execute(&self, request: HttpRequest) -> Result<HttpReply> {
            let n = {
                let mut urls = self.urls.lock().unwrap();
                urls.push(request.url.clone());
                urls.len()
            };
            Ok(HttpReply {
                status: self.status,
                body: format!("image-{}", n).into_bytes(),
            })
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::default()
            .with_base_url("http://captcha.test")
            .with_captcha_retry(3, Duration::ZERO)
            .with_captcha_image_path(None)
    }

    #[tokio::test]
    async fn test_solve_first_attempt() {
        let server = ImageServer { status: 200, ..Default::default() };
        let solver = CaptchaSolver::new(&config(), Arc::new(|_: &[u8]| " 8421 ".to_string()))
            .with_correlation_source(|| 0.734);

        let answer = solver.solve(&server, &[]).await.unwrap();
        assert_eq!(answer.correlation, "0.734");
        assert_eq!(answer.code, "8421");
        assert_eq!(
            server.urls.lock().unwrap().as_slice(),
            ["http://captcha.test/Login/YZM?randNum=0.734"]
        );
    }

    #[tokio::test]
    async fn test_solve_retries_until_numeric() {
        let server = ImageServer { status: 200, ..Default::default() };
        let recognizer = |image: &[u8]| {
            if image == b"image-3" {
                "0421".to_string()
            } else {
                "84a1".to_string()
            }
        };
        let solver = CaptchaSolver::new(&config(), Arc::new(recognizer));

        let answer = solver.solve(&server, &[]).await.unwrap();
        assert_eq!(answer.code, "0421");
        assert_eq!(server.urls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_solve_gives_up_after_max_attempts() {
        let server = ImageServer { status: 200, ..Default::default() };
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let recognizer = move |_: &[u8]| {
            counter.fetch_add(1, Ordering::SeqCst);
            String::new()
        };
        let solver = CaptchaSolver::new(&config(), Arc::new(recognizer));

        let result = solver.solve(&server, &[]).await;
        assert!(matches!(result, Err(EmtError::Captcha(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(server.urls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_non_200() {
        let server = ImageServer { status: 503, ..Default::default() };
        let solver = CaptchaSolver::new(&config(), Arc::new(|_: &[u8]| "1234".to_string()));
        let result = solver.fetch(&server, &[]).await;
        assert!(matches!(result, Err(EmtError::Transport { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_fetch_persists_image() {
        let path = std::env::temp_dir().join(format!("emt_captcha_{}.jpg", std::process::id()));
        let server = ImageServer { status: 200, ..Default::default() };
        let solver = CaptchaSolver::new(
            &config().with_captcha_image_path(Some(path.clone())),
            Arc::new(|_: &[u8]| "1234".to_string()),
        );

        solver.fetch(&server, &[]).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"image-1");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_fetch_survives_unwritable_image_path() {
        let path = std::env::temp_dir()
            .join(format!("emt_missing_dir_{}", std::process::id()))
            .join("captcha.jpg");
        let server = ImageServer { status: 200, ..Default::default() };
        let solver = CaptchaSolver::new(
            &config().with_captcha_image_path(Some(path.clone())),
            Arc::new(|_: &[u8]| "1234".to_string()),
        );

        assert!(matches!(solver.persist(b"image").await, Err(EmtError::Io(_))));
        let (_, image) = solver.fetch(&server, &[]).await.unwrap();
        assert_eq!(image, b"image-1");
        assert!(!path.exists());
    }
}
