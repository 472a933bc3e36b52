//! 数据类型定义

use crate::error::{EmtError, Result};
use crate::protocol::{BUY_MARKER, SELL_MARKER};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 接口响应外层
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// 提示信息, 为空表示无错误
    pub message: String,
    /// 状态码, 0 表示成功
    pub status: i64,
    /// 错误码
    pub error_code: i64,
    /// 数据内容
    pub data: Value,
}

impl Response {
    /// 业务是否成功
    pub fn is_ok(&self) -> bool {
        self.message.is_empty() && self.status == 0
    }

    /// 数据行 (data 不是数组时为空)
    pub fn rows(&self) -> &[Value] {
        self.data.as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    /// 第一行数据
    pub fn first_row(&self) -> Option<&Value> {
        self.rows().first()
    }
}

/// 资金信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Asset {
    /// 总资产
    pub total_asset: f64,
    /// 总市值
    pub market_value: f64,
    /// 可用资金
    pub available_funds: f64,
    /// 持仓盈亏
    pub position_pnl: f64,
    /// 资金余额
    pub balance: f64,
    /// 可取资金
    pub withdrawable_funds: f64,
    /// 当日盈亏
    pub intraday_pnl: f64,
    /// 冻结资金
    pub frozen_funds: f64,
}

/// 持仓
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    /// 证券代码
    pub symbol_code: String,
    /// 证券名称
    pub symbol_name: String,
    /// 持仓数量
    pub hold_qty: i64,
    /// 可用数量
    pub free_qty: i64,
    /// 冻结数量
    pub frozen_qty: i64,
    /// 成本价
    pub cost_price: f64,
    /// 最新价
    pub last_price: f64,
    /// 盈亏比例
    pub float_ratio: f64,
    /// 浮动盈亏
    pub float_pnl: f64,
    /// 最新市值
    pub last_market_value: f64,
}

/// 账户快照, 每次查询整体替换
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub asset: Asset,
    /// 只包含持仓数量大于 0 的持仓
    pub positions: Vec<Position>,
}

impl Account {
    pub fn new(asset: Asset, positions: Vec<Position>) -> Self {
        let positions = positions.into_iter().filter(|p| p.hold_qty > 0).collect();
        Self { asset, positions }
    }

    pub fn position(&self, symbol_code: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol_code == symbol_code)
    }
}

/// 交易市场
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    /// 深交所
    Sze,
    /// 上交所
    Sse,
}

impl Market {
    /// 下单接口中的市场代码
    pub fn venue_code(&self) -> &'static str {
        match self {
            Market::Sse => "HA",
            Market::Sze => "SA",
        }
    }
}

/// 证券标识
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instrument {
    pub symbol_code: String,
    pub market: Market,
}

impl Instrument {
    pub fn new(symbol_code: &str, market: Market) -> Self {
        Self {
            symbol_code: symbol_code.trim().to_string(),
            market,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.market {
            Market::Sse => "SH",
            Market::Sze => "SZ",
        };
        write!(f, "{}.{}", self.symbol_code, suffix)
    }
}

/// 买卖方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// 接口中的单字母代码
    pub fn code(&self) -> &'static str {
        match self {
            Side::Buy => BUY_MARKER,
            Side::Sell => SELL_MARKER,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl FromStr for Side {
    type Err = EmtError;

    /// 只接受 B/S 或 buy/sell (不区分大小写)
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "b" | "buy" => Ok(Side::Buy),
            "s" | "sell" => Ok(Side::Sell),
            other => Err(EmtError::InvalidParams(format!("unknown side: {:?}", other))),
        }
    }
}
