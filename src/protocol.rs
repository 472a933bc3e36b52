//! 交易站点协议常量

use std::fmt;
use std::str::FromStr;

/// 交易站点基础 URL
pub const BASE_URL: &str = "https://jywg.18.cn";

/// 服务器当前的 RSA 公钥 (PKCS#1 v1.5 填充), 没有刷新机制
pub const PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDHdsyxT66pDG4p73yope7jxA92
c0AT4qIJ/xtbBcHkFPK77upnsfDTJiVEuQDH+MiMeb+XhCLNKZGp0yaUU6GlxZdp
+nLW8b7Kmijr3iepaDhcbVTsYBWchaWUXauj9Lrhz58/6AE/NF0aMolxIGpsi+ST
2hSHPu3GSXMdhPCkWQIDAQAB
-----END PUBLIC KEY-----";

/// 浏览器标识
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// 最近一次验证码图片的默认保存路径
pub const CAPTCHA_IMAGE_PATH: &str = ".jywg_code.jpg";

/// 验证码图片
pub const CAPTCHA_PATH: &str = "/Login/YZM";

/// 授权 token 所在页面
pub const TOKEN_PAGE_PATH: &str = "/Trade/Buy";

/// 登录页 Referer
pub const LOGIN_REFERER_PATH: &str = "/Login?el=1&clear=&returl=%2fTrade%2fBuy";

/// 页面中授权 token 前缀 (token 紧随其后, 以双引号结束)
pub const TOKEN_MARKER: &str = r#"id="em_validatekey" type="hidden" value=""#;

/// 授权 token 查询参数名
pub const TOKEN_PARAM: &str = "validatekey";

/// 登录响应中客户名称字段
pub const CUSTOMER_NAME_KEY: &str = "khmc";

/// 买卖类别中表示买入的标记
pub const BUY_MARKER: &str = "B";

/// 卖出标记
pub const SELL_MARKER: &str = "S";

/// 默认查询条数
pub const DEFAULT_QUERY_COUNT: u32 = 100;

/// 单次查询条数上限
pub const MAX_QUERY_COUNT: u32 = 1000;

/// 需要授权 token 的接口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// 登录
    Login,
    /// 资产与持仓
    QueryAssetAndPosition,
    /// 当日委托
    QueryOrders,
    /// 当日成交
    QueryTrades,
    /// 历史委托
    QueryHistoryOrders,
    /// 历史成交
    QueryHistoryTrades,
    /// 资金流水
    QueryFundsFlow,
    /// 持仓列表
    QueryPositions,
    /// 下单
    InsertOrder,
    /// 撤单
    CancelOrder,
}

impl Endpoint {
    pub const ALL: [Endpoint; 10] = [
        Endpoint::Login,
        Endpoint::QueryAssetAndPosition,
        Endpoint::QueryOrders,
        Endpoint::QueryTrades,
        Endpoint::QueryHistoryOrders,
        Endpoint::QueryHistoryTrades,
        Endpoint::QueryFundsFlow,
        Endpoint::QueryPositions,
        Endpoint::InsertOrder,
        Endpoint::CancelOrder,
    ];

    /// 接口路径
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Login => "/Login/Authentication",
            Endpoint::QueryAssetAndPosition => "/Com/queryAssetAndPositionV1",
            Endpoint::QueryOrders => "/Search/GetOrdersData",
            Endpoint::QueryTrades => "/Search/GetDealData",
            Endpoint::QueryHistoryOrders => "/Search/GetHisOrdersData",
            Endpoint::QueryHistoryTrades => "/Search/GetHisDealData",
            Endpoint::QueryFundsFlow => "/Search/GetFundsFlow",
            Endpoint::QueryPositions => "/Search/GetStockList",
            Endpoint::InsertOrder => "/Trade/SubmitTradeV2",
            Endpoint::CancelOrder => "/Trade/RevokeOrders",
        }
    }

    /// 逻辑标签
    pub fn tag(&self) -> &'static str {
        match self {
            Endpoint::Login => "login",
            Endpoint::QueryAssetAndPosition => "query_asset_and_pos",
            Endpoint::QueryOrders => "query_orders",
            Endpoint::QueryTrades => "query_trades",
            Endpoint::QueryHistoryOrders => "query_his_orders",
            Endpoint::QueryHistoryTrades => "query_his_trades",
            Endpoint::QueryFundsFlow => "query_funds_flow",
            Endpoint::QueryPositions => "query_positions",
            Endpoint::InsertOrder => "insert_order",
            Endpoint::CancelOrder => "cancel_order",
        }
    }

    /// 从逻辑标签查找接口
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.tag() == tag)
    }

    /// 带授权 token 的完整 URL
    pub fn url(&self, base_url: &str, token: &str) -> String {
        format!("{}{}?{}={}", base_url, self.path(), TOKEN_PARAM, token)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Endpoint {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or(())
    }
}

/// 委托状态文本 -> 状态, 包含站点原文与对应英文
///
/// 站点从未返回过已撤/废单对应的文本, 这两种状态目前不会出现
pub const STATUS_SUBMITTED_LABELS: [&str; 6] = ["未报", "已报", "待报", "unfiled", "filed", "pending"];
pub const STATUS_ACCEPTED_LABELS: [&str; 2] = ["已受理", "accepted"];
pub const STATUS_PART_TRADED_LABELS: [&str; 2] = ["部成", "partially filled"];
pub const STATUS_FULL_TRADED_LABELS: [&str; 2] = ["已成", "fully filled"];
