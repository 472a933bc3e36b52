//! 委托生命周期

use crate::types::Side;
use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use std::fmt;
use std::sync::{Arc, Weak};

/// 委托状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    #[default]
    Unknown,
    InsertSubmitted,
    InsertAccepted,
    FullTraded,
    PartTraded,
    Canceled,
    Rejected,
}

impl OrderStatus {
    /// 是否仍可撤单
    pub fn is_alive(&self) -> bool {
        matches!(
            self,
            OrderStatus::InsertSubmitted | OrderStatus::InsertAccepted | OrderStatus::PartTraded
        )
    }
}

/// 撤单能力, 由会话实现
#[async_trait]
pub trait OrderCanceller: Send + Sync {
    /// 会话是否仍持有授权 token
    fn is_session_alive(&self) -> bool;

    /// 按撤单代码撤单
    async fn cancel_order(&self, code: &str) -> bool;
}

/// 指向发出委托的会话的弱引用
#[derive(Clone, Default)]
pub struct SessionHandle(Option<Weak<dyn OrderCanceller>>);

impl SessionHandle {
    pub fn new(session: Weak<dyn OrderCanceller>) -> Self {
        Self(Some(session))
    }

    pub fn from_arc<C: OrderCanceller + 'static>(session: &Arc<C>) -> Self {
        let session: Arc<dyn OrderCanceller> = session.clone();
        Self(Some(Arc::downgrade(&session)))
    }

    /// 不绑定会话
    pub fn detached() -> Self {
        Self(None)
    }

    /// 会话仍存活时返回强引用
    pub fn upgrade(&self) -> Option<Arc<dyn OrderCanceller>> {
        self.0.as_ref()?.upgrade()
    }

    pub fn is_bound(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(weak) if weak.strong_count() > 0 => f.write_str("SessionHandle(bound)"),
            Some(_) => f.write_str("SessionHandle(dropped)"),
            None => f.write_str("SessionHandle(detached)"),
        }
    }
}

/// 委托信息
///
/// 下单后本地生成的委托状态固定为 `InsertSubmitted`, 真实状态需要再次查询委托获得
#[derive(Debug, Clone)]
pub struct OrderInfo {
    /// 证券代码
    pub symbol_code: String,
    /// 委托编号
    pub order_id: i64,
    /// 委托数量
    pub insert_qty: i64,
    /// 撤单数量
    pub canceled_qty: i64,
    /// 委托价格
    pub insert_price: f64,
    /// 成交价格 (本地生成的委托为 NaN)
    pub trade_price: f64,
    pub status: OrderStatus,
    pub side: Side,
    /// 报盘时间
    pub quotation_time: Option<NaiveTime>,
    /// 委托时间
    pub insert_time: Option<NaiveDateTime>,
    pub session: SessionHandle,
}

impl OrderInfo {
    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    /// 撤单代码: `<委托日期 YYYYMMDD>_<委托编号>`
    pub fn cancel_code(&self) -> Option<String> {
        let insert_time = self.insert_time?;
        Some(format!("{}_{}", insert_time.format("%Y%m%d"), self.order_id))
    }

    pub fn bind(mut self, session: SessionHandle) -> Self {
        self.session = session;
        self
    }

    /// 撤单
    ///
    /// 委托已结束时直接返回 false, 不发出请求
    pub async fn cancel(&self) -> bool {
        if !self.is_alive() {
            tracing::debug!("Order {} is not alive ({:?}), skip cancel", self.order_id, self.status);
            return false;
        }
        let Some(code) = self.cancel_code() else {
            tracing::warn!("Order {} has no insert time, cannot build cancel code", self.order_id);
            return false;
        };
        let Some(session) = self.session.upgrade() else {
            tracing::warn!("Order {} is not bound to a live session ({:?})", self.order_id, self.session);
            return false;
        };
        if !session.is_session_alive() {
            tracing::warn!("Session of order {} has no authorization token", self.order_id);
            return false;
        }
        session.cancel_order(&code).await
    }
}

impl fmt::Display for OrderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}@{} {:?} {}x{:.3}",
            self.symbol_code,
            self.side.name(),
            self.order_id,
            self.status,
            self.insert_qty,
            self.insert_price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSession {
        alive: bool,
        calls: AtomicUsize,
        codes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OrderCanceller for RecordingSession {
        fn is_session_alive(&self) -> bool {
            self.alive
        }

        async fn cancel_order(&self, code: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.codes.lock().unwrap().push(code.to_string());
            true
        }
    }

    fn order(status: OrderStatus) -> OrderInfo {
        OrderInfo {
            symbol_code: "000001".to_string(),
            order_id: 12345,
            insert_qty: 100,
            canceled_qty: 0,
            insert_price: 11.31,
            trade_price: f64::NAN,
            status,
            side: Side::Buy,
            quotation_time: None,
            insert_time: NaiveDate::from_ymd_opt(2024, 5, 1).and_then(|d| d.and_hms_opt(9, 30, 5)),
            session: SessionHandle::detached(),
        }
    }

    #[test]
    fn test_is_alive() {
        for status in [
            OrderStatus::InsertSubmitted,
            OrderStatus::InsertAccepted,
            OrderStatus::PartTraded,
        ] {
            assert!(order(status).is_alive(), "{:?}", status);
        }
        for status in [
            OrderStatus::FullTraded,
            OrderStatus::Canceled,
            OrderStatus::Rejected,
            OrderStatus::Unknown,
        ] {
            assert!(!order(status).is_alive(), "{:?}", status);
        }
    }

    #[test]
    fn test_cancel_code() {
        assert_eq!(order(OrderStatus::InsertAccepted).cancel_code().unwrap(), "20240501_12345");

        let mut no_time = order(OrderStatus::InsertAccepted);
        no_time.insert_time = None;
        assert!(no_time.cancel_code().is_none());
    }

    #[tokio::test]
    async fn test_cancel_dead_order_skips_network() {
        let session = Arc::new(RecordingSession { alive: true, ..Default::default() });
        for status in [OrderStatus::FullTraded, OrderStatus::Canceled, OrderStatus::Rejected, OrderStatus::Unknown] {
            let o = order(status).bind(SessionHandle::from_arc(&session));
            assert!(!o.cancel().await);
        }
        assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_routes_through_session() {
        let session = Arc::new(RecordingSession { alive: true, ..Default::default() });
        let o = order(OrderStatus::PartTraded).bind(SessionHandle::from_arc(&session));
        assert!(o.cancel().await);
        assert_eq!(session.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.codes.lock().unwrap().as_slice(), ["20240501_12345"]);
    }

    #[tokio::test]
    async fn test_cancel_with_stale_handle() {
        let session = Arc::new(RecordingSession { alive: true, ..Default::default() });
        let o = order(OrderStatus::InsertSubmitted).bind(SessionHandle::from_arc(&session));
        drop(session);
        assert!(!o.cancel().await);

        assert!(!order(OrderStatus::InsertSubmitted).cancel().await);
    }

    #[tokio::test]
    async fn test_cancel_without_token() {
        let session = Arc::new(RecordingSession::default());
        let o = order(OrderStatus::InsertAccepted).bind(SessionHandle::from_arc(&session));
        assert!(!o.cancel().await);
        assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    }
}
