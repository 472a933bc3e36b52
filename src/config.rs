//! 客户端配置

use crate::error::{EmtError, Result};
use crate::protocol::{BASE_URL, CAPTCHA_IMAGE_PATH, USER_AGENT};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 会话客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 交易站点基础 URL
    pub base_url: String,
    /// 单次网络请求超时
    pub request_timeout: Duration,
    /// 验证码最多尝试次数
    pub captcha_max_attempts: u32,
    /// 两次验证码尝试之间的等待
    pub captcha_retry_backoff: Duration,
    /// 最近一次验证码图片的保存路径 (None 表示不保存)
    pub captcha_image_path: Option<PathBuf>,
    /// 浏览器 User-Agent
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            captcha_max_attempts: 5,
            captcha_retry_backoff: Duration::from_millis(300),
            captcha_image_path: Some(PathBuf::from(CAPTCHA_IMAGE_PATH)),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// 从环境变量加载 (会先读取 `.env`)
    ///
    /// 未设置的变量使用默认值, 设置了但无法解析时返回 `EmtError::Config`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(url) = env::var("EMT_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var::<u64>("EMT_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var::<u32>("EMT_CAPTCHA_MAX_ATTEMPTS")? {
            config.captcha_max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>("EMT_CAPTCHA_BACKOFF_MS")? {
            config.captcha_retry_backoff = Duration::from_millis(ms);
        }
        if let Ok(path) = env::var("EMT_CAPTCHA_PATH") {
            config.captcha_image_path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Ok(ua) = env::var("EMT_USER_AGENT") {
            config.user_agent = ua;
        }

        config.validate()?;
        tracing::debug!("Loaded client config: {:?}", config);
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_captcha_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.captcha_max_attempts = max_attempts;
        self.captcha_retry_backoff = backoff;
        self
    }

    pub fn with_captcha_image_path(mut self, path: Option<PathBuf>) -> Self {
        self.captcha_image_path = path;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.captcha_max_attempts == 0 {
            return Err(EmtError::Config(
                "captcha_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(EmtError::Config("request_timeout must be positive".to_string()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| EmtError::Config(format!("invalid base_url {}: {}", self.base_url, e)))?;
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| EmtError::Config(format!("{} has invalid value {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}
