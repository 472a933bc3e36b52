//! 响应解码
//!
//! 站点把所有数值都以字符串形式返回, 空字符串视为 0。

use crate::error::{EmtError, Result};
use crate::order::{OrderInfo, OrderStatus, SessionHandle};
use crate::protocol::{
    BUY_MARKER, STATUS_ACCEPTED_LABELS, STATUS_FULL_TRADED_LABELS, STATUS_PART_TRADED_LABELS,
    STATUS_SUBMITTED_LABELS,
};
use crate::types::{Account, Asset, Position, Response, Side};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 外层响应
#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "Status", deserialize_with = "lenient_i64")]
    status: i64,
    #[serde(rename = "Errcode", default, deserialize_with = "lenient_i64_opt")]
    error_code: Option<i64>,
    #[serde(rename = "Data", default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(rename = "Zzc", deserialize_with = "lenient_f64")]
    total_asset: f64,
    #[serde(rename = "Zxsz", deserialize_with = "lenient_f64")]
    market_value: f64,
    #[serde(rename = "Kyzj", deserialize_with = "lenient_f64")]
    available_funds: f64,
    #[serde(rename = "Ljyk", deserialize_with = "lenient_f64")]
    position_pnl: f64,
    #[serde(rename = "Zjye", deserialize_with = "lenient_f64")]
    balance: f64,
    #[serde(rename = "Kqzj", deserialize_with = "lenient_f64")]
    withdrawable_funds: f64,
    #[serde(rename = "Dryk", deserialize_with = "lenient_f64")]
    intraday_pnl: f64,
    #[serde(rename = "Djzj", deserialize_with = "lenient_f64")]
    frozen_funds: f64,
    positions: Vec<RawPosition>,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    #[serde(rename = "Zqdm")]
    symbol_code: String,
    #[serde(rename = "Zqmc")]
    symbol_name: String,
    #[serde(rename = "Zqsl", deserialize_with = "lenient_i64")]
    hold_qty: i64,
    #[serde(rename = "Kysl", deserialize_with = "lenient_i64")]
    free_qty: i64,
    #[serde(rename = "Djsl", deserialize_with = "lenient_i64")]
    frozen_qty: i64,
    #[serde(rename = "Cbjg", deserialize_with = "lenient_f64")]
    cost_price: f64,
    #[serde(rename = "Zxjg", deserialize_with = "lenient_f64")]
    last_price: f64,
    #[serde(rename = "Ykbl", deserialize_with = "lenient_f64")]
    float_ratio: f64,
    #[serde(rename = "Ljyk", deserialize_with = "lenient_f64")]
    float_pnl: f64,
    #[serde(rename = "Zxsz", deserialize_with = "lenient_f64")]
    last_market_value: f64,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    #[serde(rename = "Zqdm")]
    symbol_code: String,
    #[serde(rename = "Wtbh", deserialize_with = "lenient_i64")]
    order_id: i64,
    #[serde(rename = "Wtsl", deserialize_with = "lenient_i64")]
    insert_qty: i64,
    #[serde(rename = "Cdsl", deserialize_with = "lenient_i64")]
    canceled_qty: i64,
    #[serde(rename = "Wtjg", deserialize_with = "lenient_f64")]
    insert_price: f64,
    #[serde(rename = "Cjje", deserialize_with = "lenient_f64")]
    trade_price: f64,
    #[serde(rename = "Wtzt")]
    status: String,
    #[serde(rename = "Mmlb")]
    side: String,
    #[serde(rename = "Bpsj", default)]
    quotation_time: String,
    #[serde(rename = "Wtrq", default)]
    insert_date: String,
    #[serde(rename = "Wtsj", default)]
    insert_clock: String,
}

/// 下单回执
#[derive(Debug, Deserialize)]
struct RawInsertAck {
    #[serde(rename = "Wtbh", deserialize_with = "lenient_i64")]
    order_id: i64,
}

/// 解码外层响应, JSON `null` 返回 `None`
///
/// `Status` 字段必需, 缺失时返回错误; `Message` 与 `Errcode` 缺失时为空/0
pub fn decode_response(body: &[u8]) -> Result<Option<Response>> {
    let value: Value = serde_json::from_slice(body)?;
    decode_response_value(value)
}

pub fn decode_response_value(value: Value) -> Result<Option<Response>> {
    if value.is_null() {
        return Ok(None);
    }
    let raw: RawResponse = serde_json::from_value(value)?;
    Ok(Some(Response {
        message: raw.message.unwrap_or_default(),
        status: raw.status,
        error_code: raw.error_code.unwrap_or(0),
        data: raw.data,
    }))
}

/// 解码资产与持仓, 只保留持仓数量大于 0 的持仓
pub fn decode_account(row: &Value) -> Result<Account> {
    let raw = RawAccount::deserialize(row)?;
    let asset = Asset {
        total_asset: raw.total_asset,
        market_value: raw.market_value,
        available_funds: raw.available_funds,
        position_pnl: raw.position_pnl,
        balance: raw.balance,
        withdrawable_funds: raw.withdrawable_funds,
        intraday_pnl: raw.intraday_pnl,
        frozen_funds: raw.frozen_funds,
    };
    let positions = raw
        .positions
        .into_iter()
        .map(|p| Position {
            symbol_code: p.symbol_code.trim().to_string(),
            symbol_name: p.symbol_name.trim().to_string(),
            hold_qty: p.hold_qty,
            free_qty: p.free_qty,
            frozen_qty: p.frozen_qty,
            cost_price: p.cost_price,
            last_price: p.last_price,
            float_ratio: p.float_ratio,
            float_pnl: p.float_pnl,
            last_market_value: p.last_market_value,
        })
        .collect();
    Ok(Account::new(asset, positions))
}

/// 解码一条委托, 返回的委托未绑定会话
pub fn decode_order(row: &Value) -> Result<OrderInfo> {
    let raw = RawOrder::deserialize(row)?;
    let insert_time = parse_insert_time(&raw.insert_date, &raw.insert_clock)?;
    let quotation_time = parse_clock(&raw.quotation_time)?;

    Ok(OrderInfo {
        symbol_code: raw.symbol_code.trim().to_string(),
        order_id: raw.order_id,
        insert_qty: raw.insert_qty,
        canceled_qty: raw.canceled_qty,
        insert_price: raw.insert_price,
        trade_price: raw.trade_price,
        status: parse_status(&raw.status),
        side: parse_side(&raw.side),
        quotation_time,
        insert_time,
        session: SessionHandle::detached(),
    })
}

/// 从下单回执中取委托编号
pub fn decode_insert_ack(row: &Value) -> Result<i64> {
    Ok(RawInsertAck::deserialize(row)?.order_id)
}

/// 委托状态文本 -> 状态, 未知文本返回 `Unknown`
pub fn parse_status(text: &str) -> OrderStatus {
    let text = text.trim();
    if STATUS_SUBMITTED_LABELS.contains(&text) {
        OrderStatus::InsertSubmitted
    } else if STATUS_ACCEPTED_LABELS.contains(&text) {
        OrderStatus::InsertAccepted
    } else if STATUS_PART_TRADED_LABELS.contains(&text) {
        OrderStatus::PartTraded
    } else if STATUS_FULL_TRADED_LABELS.contains(&text) {
        OrderStatus::FullTraded
    } else {
        tracing::warn!("Unmapped order status text: {:?}", text);
        OrderStatus::Unknown
    }
}

/// 只有买入标记解码为买入, 其余一律为卖出
pub fn parse_side(code: &str) -> Side {
    if code.trim() == BUY_MARKER {
        Side::Buy
    } else {
        Side::Sell
    }
}

/// 解析数值字符串, 空字符串为 0
pub fn parse_f64(text: &str) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    text.parse::<f64>()
        .map_err(|_| EmtError::Protocol(format!("invalid float: {:?}", text)))
}

/// 解析整数字符串, 空字符串为 0
pub fn parse_i64(text: &str) -> Result<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse::<i64>()
        .map_err(|_| EmtError::Protocol(format!("invalid integer: {:?}", text)))
}

/// `HHMMSS`, 位数不足时左侧补 0 (例如 `93005` 为 09:30:05)
fn parse_clock(text: &str) -> Result<Option<NaiveTime>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(&format!("{:0>6}", text), "%H%M%S")
        .map(Some)
        .map_err(|e| EmtError::Protocol(format!("invalid time {:?}: {}", text, e)))
}

fn parse_insert_time(date: &str, clock: &str) -> Result<Option<NaiveDateTime>> {
    let (date, clock) = (date.trim(), clock.trim());
    if date.is_empty() {
        return Ok(None);
    }
    let stamp = format!("{}{:0>6}", date, clock);
    NaiveDateTime::parse_from_str(&stamp, "%Y%m%d%H%M%S")
        .map(Some)
        .map_err(|e| EmtError::Protocol(format!("invalid insert time {:?}: {}", stamp, e)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    match NumOrText::deserialize(deserializer)? {
        NumOrText::Int(v) => Ok(v as f64),
        NumOrText::Float(v) => Ok(v),
        NumOrText::Text(s) => parse_f64(&s).map_err(serde::de::Error::custom),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    match NumOrText::deserialize(deserializer)? {
        NumOrText::Int(v) => Ok(v),
        NumOrText::Float(v) if v.fract() == 0.0 => Ok(v as i64),
        NumOrText::Float(v) => Err(serde::de::Error::custom(format!("expected integer, got {}", v))),
        NumOrText::Text(s) => parse_i64(&s).map_err(serde::de::Error::custom),
    }
}

fn lenient_i64_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    match Option::<NumOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrText::Int(v)) => Ok(Some(v)),
        Some(NumOrText::Float(v)) => Ok(Some(v as i64)),
        Some(NumOrText::Text(s)) => parse_i64(&s).map(Some).map_err(serde::de::Error::custom),
    }
}
