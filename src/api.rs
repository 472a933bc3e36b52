//! HTTP 传输层
//!
//! 会话核心只依赖 [`Transport`] trait, 默认实现基于带 cookie 的 reqwest 客户端。
//! 所有请求都经过 [`GuardedTransport`], 它为每次调用加上超时与取消。

use crate::error::{EmtError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// HTTP 请求
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// 表单内容 (application/x-www-form-urlencoded)
    pub form: Option<Vec<(String, String)>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            form: None,
        }
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            form: Some(form),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers.extend_from_slice(headers);
        self
    }

    /// 表单字段值
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP 响应
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 会话使用的传输层, cookie 由实现方维护
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpReply>;
}

/// 基于 reqwest 的传输层
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// 创建带 cookie 存储的客户端
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpReply> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpReply { status, body })
    }
}

/// 为每次调用加上超时与取消的传输层包装
pub struct GuardedTransport {
    inner: Arc<dyn Transport>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl GuardedTransport {
    pub fn new(inner: Arc<dyn Transport>, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            inner,
            timeout,
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[async_trait]
impl Transport for GuardedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpReply> {
        if self.cancel.is_cancelled() {
            return Err(EmtError::Cancelled);
        }
        let url = request.url.clone();
        tokio::select! {
            _ = self.cancel.cancelled() => {
                tracing::warn!("Request cancelled: {}", url);
                Err(EmtError::Cancelled)
            }
            result = tokio::time::timeout(self.timeout, self.inner.execute(request)) => {
                match result {
                    Ok(reply) => reply,
                    Err(_) => {
                        tracing::error!("Request timed out after {:?}: {}", self.timeout, url);
                        Err(EmtError::Timeout)
                    }
                }
            }
        }
    }
}
