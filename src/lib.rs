//! East Money Web Trading Client Library
//!
//! 东方财富网页交易接口的 Rust 客户端库
//!
//! # 功能
//! - 验证码识别 (外部 OCR) 与 RSA 密码加密
//! - 登录与授权 token 获取
//! - 资产、持仓、委托、成交查询
//! - 下单与撤单
//!
//! 库内只通过 `tracing` 输出日志, 由调用方初始化日志订阅者。
//!
//! # 示例
//! ```no_run
//! use std::sync::Arc;
//! use emt_trade::{ClientConfig, Instrument, Market, SessionClient, Side};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ocr = |_image: &[u8]| String::from("1234");
//!     let client = SessionClient::with_recognizer(ClientConfig::from_env()?, Arc::new(ocr))?;
//!
//!     let resp = client.login("540000000000", "password", 30).await?;
//!     if !resp.is_ok() {
//!         eprintln!("login rejected: {}", resp.message);
//!         return Ok(());
//!     }
//!
//!     // 下单
//!     let ins = Instrument::new("000001", Market::Sze);
//!     client.insert_order(&ins, Side::Buy, 11.31, 100).await?;
//!
//!     for order in client.query_orders().await? {
//!         if order.is_alive() {
//!             order.cancel().await;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod captcha;
pub mod client;
pub mod config;
pub mod crypto;
pub mod decode;
pub mod error;
pub mod order;
pub mod protocol;
pub mod types;

pub use api::{HttpReply, HttpRequest, Method, ReqwestTransport, Transport};
pub use captcha::{CaptchaAnswer, CaptchaRecognizer, CaptchaSolver};
pub use client::{SessionClient, SessionState};
pub use config::ClientConfig;
pub use crypto::CredentialEncryptor;
pub use error::{EmtError, Result};
pub use order::{OrderCanceller, OrderInfo, OrderStatus, SessionHandle};
pub use protocol::Endpoint;
pub use types::*;
