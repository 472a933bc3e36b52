//! 交易会话客户端

use crate::api::{GuardedTransport, HttpReply, HttpRequest, ReqwestTransport, Transport};
use crate::captcha::{CaptchaRecognizer, CaptchaSolver};
use crate::config::ClientConfig;
use crate::crypto::CredentialEncryptor;
use crate::decode::{decode_account, decode_insert_ack, decode_order, decode_response};
use crate::error::{EmtError, Result};
use crate::order::{OrderCanceller, OrderInfo, OrderStatus, SessionHandle};
use crate::protocol::{
    Endpoint, CUSTOMER_NAME_KEY, DEFAULT_QUERY_COUNT, LOGIN_REFERER_PATH, MAX_QUERY_COUNT,
    TOKEN_MARKER, TOKEN_PAGE_PATH,
};
use crate::types::{Account, Asset, Instrument, Position, Response, Side};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio_util::sync::CancellationToken;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 未登录
    Anonymous,
    /// 登录中, 或已通过认证但还没有授权 token
    Authenticating,
    /// 已登录且持有授权 token
    Authenticated,
    /// 登录请求失败 (网络错误或响应格式错误)
    LoginFailed,
}

/// 查询条数限制在 [1, 1000], 非正数使用默认值 100
pub fn clamp_query_count(count: i64) -> u32 {
    if count <= 0 {
        DEFAULT_QUERY_COUNT
    } else if count > MAX_QUERY_COUNT as i64 {
        MAX_QUERY_COUNT
    } else {
        count as u32
    }
}

/// 从交易页面中提取授权 token
pub fn extract_token(html: &str) -> Option<String> {
    let start = html.find(TOKEN_MARKER)? + TOKEN_MARKER.len();
    let rest = &html[start..];
    let end = rest.find('"')?;
    let token = rest[..end].trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// 交易会话客户端
///
/// 一个实例对应一个登录会话。内部状态不跨 `.await` 加锁, 多个任务并发调用时需要由调用方串行化。
pub struct SessionClient {
    config: ClientConfig,
    transport: GuardedTransport,
    encryptor: CredentialEncryptor,
    captcha: CaptchaSolver,
    base_headers: Vec<(String, String)>,
    state: RwLock<SessionState>,
    /// 授权 token
    token: RwLock<Option<String>>,
    /// 最近一次资产持仓快照
    account: RwLock<Option<Account>>,
    me: Weak<SessionClient>,
}

impl SessionClient {
    /// 使用指定的传输层创建客户端
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        captcha: CaptchaSolver,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let encryptor = CredentialEncryptor::new()?;
        let base_headers = Self::build_base_headers(&config)?;
        let transport =
            GuardedTransport::new(transport, config.request_timeout, CancellationToken::new());

        Ok(Arc::new_cyclic(|me| Self {
            config,
            transport,
            encryptor,
            captcha,
            base_headers,
            state: RwLock::new(SessionState::Anonymous),
            token: RwLock::new(None),
            account: RwLock::new(None),
            me: me.clone(),
        }))
    }

    /// 使用 reqwest 传输层与指定的验证码识别引擎创建客户端
    pub fn with_recognizer(
        config: ClientConfig,
        recognizer: Arc<dyn CaptchaRecognizer>,
    ) -> Result<Arc<Self>> {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout)?);
        let captcha = CaptchaSolver::new(&config, recognizer);
        Self::new(config, transport, captcha)
    }

    fn build_base_headers(config: &ClientConfig) -> Result<Vec<(String, String)>> {
        let url = url::Url::parse(&config.base_url)
            .map_err(|e| EmtError::Config(format!("invalid base_url: {}", e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(EmtError::Config("base_url has no host".to_string())),
        };
        Ok(vec![
            ("User-Agent".to_string(), config.user_agent.clone()),
            ("Origin".to_string(), config.base_url.clone()),
            ("Host".to_string(), host),
        ])
    }

    /// 取消令牌, 取消后所有进行中和后续的请求都返回 `EmtError::Cancelled`
    pub fn cancellation_token(&self) -> CancellationToken {
        self.transport.cancellation_token().clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *guard != state {
            tracing::debug!("Session state {:?} -> {:?}", *guard, state);
            *guard = state;
        }
    }

    /// 当前授权 token
    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated && self.token().is_some()
    }

    /// 最近一次资产持仓快照
    pub fn account(&self) -> Option<Account> {
        self.account.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn replace_account(&self, account: Option<Account>) {
        *self.account.write().unwrap_or_else(PoisonError::into_inner) = account;
    }

    fn handle(&self) -> SessionHandle {
        let weak: Weak<dyn OrderCanceller> = self.me.clone();
        SessionHandle::new(weak)
    }

    /// 登录
    ///
    /// # 参数
    /// - `username`: 资金账号
    /// - `password`: 明文密码, 发送前加密
    /// - `duration`: 在线时长 (分钟)
    ///
    /// # 返回
    /// - `Ok(response)`: 服务器返回的响应, 密码错误等业务失败时 `is_ok()` 为 false
    /// - `Err`: 验证码、网络或响应格式错误, 状态变为 `LoginFailed`
    ///
    /// 服务器接受新凭证之前, 已有的 token 与账户快照保持不变;
    /// 登录失败时已认证的会话继续可用
    pub async fn login(&self, username: &str, password: &str, duration: u32) -> Result<Response> {
        let previous = self.state();
        self.set_state(SessionState::Authenticating);

        match self.authenticate(username.trim(), password.trim(), duration, previous).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                tracing::error!("User [{}] login failed: {}", username, e);
                self.settle_unaccepted(previous, SessionState::LoginFailed);
                Err(e)
            }
        }
    }

    /// 新凭证未被接受: 仍持有 token 时恢复原状态, 否则进入 `fallback`
    fn settle_unaccepted(&self, previous: SessionState, fallback: SessionState) {
        if self.token().is_some() {
            self.set_state(previous);
        } else {
            self.set_state(fallback);
        }
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        duration: u32,
        previous: SessionState,
    ) -> Result<Response> {
        let answer = self.captcha.solve(&self.transport, &self.base_headers).await?;

        let form = vec![
            ("userId".to_string(), username.to_string()),
            ("password".to_string(), self.encryptor.encrypt(password)?),
            ("randNumber".to_string(), answer.correlation),
            ("identifyCode".to_string(), answer.code),
            ("duration".to_string(), duration.to_string()),
            ("authCode".to_string(), String::new()),
            ("type".to_string(), "Z".to_string()),
            ("secInfo".to_string(), String::new()),
        ];
        let request = HttpRequest::post_form(Endpoint::Login.url(&self.config.base_url, ""), form)
            .headers(&self.base_headers)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", format!("{}{}", self.config.base_url, LOGIN_REFERER_PATH))
            .header("Content-Type", "application/x-www-form-urlencoded");

        let reply = self.transport.execute(request).await?;
        if !reply.is_success() {
            return Err(EmtError::transport(reply.status, &reply.body));
        }
        let resp = decode_response(&reply.body)?
            .ok_or_else(|| EmtError::Protocol("login response is null".to_string()))?;

        // 登录判定忽略 Message 首尾空白
        if resp.status != 0 || !resp.message.trim().is_empty() {
            tracing::warn!(
                "User [{}] login rejected: status={}, errcode={}, message={}",
                username,
                resp.status,
                resp.error_code,
                resp.message
            );
            self.settle_unaccepted(previous, SessionState::Anonymous);
            return Ok(resp);
        }

        let customer = resp
            .first_row()
            .and_then(|row| row.get(CUSTOMER_NAME_KEY))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if customer.is_empty() {
            tracing::warn!("User [{}] login response has no customer name", username);
            self.settle_unaccepted(previous, SessionState::Anonymous);
            return Ok(resp);
        }
        tracing::info!("Login success for {}({})", customer, username);

        // 新凭证已被接受, 旧会话作废
        self.set_token(None);
        self.replace_account(None);

        match self.fetch_authorization_token().await {
            Ok(true) => {
                if let Err(e) = self.query_asset_and_position().await {
                    tracing::warn!("Refresh account after login failed: {}", e);
                }
            }
            Ok(false) => tracing::warn!("Authorization token not found after login"),
            Err(e) => tracing::error!("Fetch authorization token failed: {}", e),
        }
        Ok(resp)
    }

    /// 从交易页面获取授权 token
    ///
    /// 页面中没有 token 时返回 `Ok(false)`, token 保持为空, 之后可以再次调用
    pub async fn fetch_authorization_token(&self) -> Result<bool> {
        let url = format!("{}{}", self.config.base_url, TOKEN_PAGE_PATH);
        let reply = self
            .transport
            .execute(HttpRequest::get(url).headers(&self.base_headers))
            .await?;
        if !reply.is_success() {
            tracing::error!(
                "Get authorization token failed, code={}, response={}",
                reply.status,
                reply.text()
            );
            return Err(EmtError::transport(reply.status, &reply.body));
        }

        match extract_token(&reply.text()) {
            Some(token) => {
                tracing::debug!("Got authorization token={}", token);
                self.set_token(Some(token));
                self.set_state(SessionState::Authenticated);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 通用的带授权请求
    ///
    /// `payload` 为空时使用默认查询表单 (100 条)。
    ///
    /// # Panics
    /// 没有授权 token 时 panic, 必须先登录
    pub async fn dispatch(
        &self,
        endpoint: Endpoint,
        payload: Option<Vec<(String, String)>>,
    ) -> Result<HttpReply> {
        let Some(token) = self.token() else {
            panic!("authorization token is empty, dispatch [{}] before login", endpoint);
        };
        let form = payload.unwrap_or_else(|| query_form(DEFAULT_QUERY_COUNT as i64));
        let url = endpoint.url(&self.config.base_url, &token);
        tracing::debug!("(tag={}), (data={:?}), (url={})", endpoint, form, url);

        let request = HttpRequest::post_form(url, form)
            .headers(&self.base_headers)
            .header("X-Requested-With", "XMLHttpRequest");
        let reply = self.transport.execute(request).await?;
        if !reply.is_success() {
            tracing::error!(
                "Use [{}] to query failed, code={}, response={}",
                endpoint,
                reply.status,
                reply.text()
            );
            return Err(EmtError::transport(reply.status, &reply.body));
        }
        tracing::debug!("[{}] response: {}", endpoint, reply.text());
        Ok(reply)
    }

    /// 按逻辑标签请求
    ///
    /// # Panics
    /// 标签不在接口列表中, 或没有授权 token
    pub async fn dispatch_tag(
        &self,
        tag: &str,
        payload: Option<Vec<(String, String)>>,
    ) -> Result<HttpReply> {
        let Some(endpoint) = Endpoint::from_tag(tag) else {
            panic!("{} not in endpoint list", tag);
        };
        self.dispatch(endpoint, payload).await
    }

    /// 指定查询条数的请求
    pub async fn dispatch_with_count(&self, endpoint: Endpoint, count: i64) -> Result<HttpReply> {
        self.dispatch(endpoint, Some(query_form(count))).await
    }

    async fn query_envelope(&self, endpoint: Endpoint, payload: Option<Vec<(String, String)>>) -> Result<Response> {
        let reply = self.dispatch(endpoint, payload).await?;
        match decode_response(&reply.body) {
            Ok(Some(resp)) => Ok(resp),
            Ok(None) => {
                tracing::error!("[{}] response is null", endpoint);
                Err(EmtError::Protocol(format!("{} response is null", endpoint)))
            }
            Err(e) => {
                tracing::error!("[{}] response deserialize found exception: {}", endpoint, e);
                Err(e)
            }
        }
    }

    /// 查询资产与持仓, 成功时整体替换本地快照
    pub async fn query_asset_and_position(&self) -> Result<Option<Account>> {
        let resp = self.query_envelope(Endpoint::QueryAssetAndPosition, None).await?;
        if !resp.is_ok() {
            tracing::warn!("Query asset and position rejected: {}", resp.message);
            return Ok(None);
        }
        let row = resp
            .first_row()
            .ok_or_else(|| EmtError::Protocol("asset response has no rows".to_string()))?;
        let account = decode_account(row)?;
        tracing::info!(
            "Account: total_asset={:.2}, available_funds={:.2}, positions={}",
            account.asset.total_asset,
            account.asset.available_funds,
            account.positions.len()
        );
        self.replace_account(Some(account.clone()));
        Ok(Some(account))
    }

    /// 查询资产
    pub async fn query_asset(&self) -> Result<Option<Asset>> {
        Ok(self.query_asset_and_position().await?.map(|a| a.asset))
    }

    /// 查询持仓
    pub async fn query_position(&self) -> Result<Option<Vec<Position>>> {
        Ok(self.query_asset_and_position().await?.map(|a| a.positions))
    }

    /// 查询当日委托, 返回的委托都绑定到本会话
    pub async fn query_orders(&self) -> Result<Vec<OrderInfo>> {
        let resp = self.query_envelope(Endpoint::QueryOrders, None).await?;
        if !resp.is_ok() {
            tracing::warn!("Query orders rejected: {}", resp.message);
            return Ok(Vec::new());
        }
        resp.rows()
            .iter()
            .map(|row| decode_order(row).map(|order| order.bind(self.handle())))
            .collect()
    }

    /// 查询当日成交
    pub async fn query_trades(&self) -> Result<Response> {
        self.query_envelope(Endpoint::QueryTrades, None).await
    }

    /// 查询历史委托
    pub async fn query_history_orders(&self) -> Result<Response> {
        self.query_envelope(Endpoint::QueryHistoryOrders, None).await
    }

    /// 查询历史成交
    pub async fn query_history_trades(&self) -> Result<Response> {
        self.query_envelope(Endpoint::QueryHistoryTrades, None).await
    }

    /// 查询资金流水
    pub async fn query_funds_flow(&self) -> Result<Response> {
        self.query_envelope(Endpoint::QueryFundsFlow, None).await
    }

    /// 查询持仓列表
    pub async fn query_positions(&self) -> Result<Response> {
        self.query_envelope(Endpoint::QueryPositions, None).await
    }

    /// 下单
    ///
    /// 成功时返回本地生成的委托 (状态为 `InsertSubmitted`), 真实状态需要通过 [`Self::query_orders`] 获得;
    /// 服务器拒绝或没有返回委托编号时返回 `Ok(None)`
    pub async fn insert_order(
        &self,
        instrument: &Instrument,
        side: Side,
        price: f64,
        qty: i64,
    ) -> Result<Option<OrderInfo>> {
        if qty <= 0 {
            return Err(EmtError::InvalidParams(format!("qty must be positive, got {}", qty)));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(EmtError::InvalidParams(format!("invalid price {}", price)));
        }

        let form = vec![
            ("stockCode".to_string(), instrument.symbol_code.clone()),
            ("tradeType".to_string(), side.code().to_string()),
            ("zqmc".to_string(), String::new()),
            ("market".to_string(), instrument.market.venue_code().to_string()),
            ("price".to_string(), price.to_string()),
            ("amount".to_string(), qty.to_string()),
        ];
        tracing::info!("Sending order: {} {} {} @ {}", side.name(), instrument, qty, price);

        let resp = self.query_envelope(Endpoint::InsertOrder, Some(form)).await?;
        tracing::debug!("insert_order> {:?}", resp);
        if !resp.is_ok() {
            tracing::warn!("Insert order for {} rejected: {}", instrument, resp.message);
            return Ok(None);
        }
        let Some(row) = resp.first_row() else {
            tracing::warn!("Insert order for {} returned no rows", instrument);
            return Ok(None);
        };

        let order = OrderInfo {
            symbol_code: instrument.symbol_code.clone(),
            order_id: decode_insert_ack(row)?,
            insert_qty: qty,
            canceled_qty: 0,
            insert_price: price,
            trade_price: f64::NAN,
            status: OrderStatus::InsertSubmitted,
            side,
            quotation_time: None,
            insert_time: Some(chrono::Local::now().naive_local()),
            session: self.handle(),
        };
        Ok(Some(order))
    }

    /// 撤单
    ///
    /// `code` 格式为 `<委托日期 YYYYMMDD>_<委托编号>`。
    ///
    /// 站点拒绝撤单时返回标准 JSON 响应, 撤单成功时返回非 JSON 文本,
    /// 所以能解码出响应表示失败, 解码失败表示成功。站点行为变化时需要重新确认。
    pub async fn cancel_order(&self, code: &str) -> bool {
        let code = code.trim();
        let form = vec![("revokes".to_string(), code.to_string())];
        let reply = match self.dispatch(Endpoint::CancelOrder, Some(form)).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Cancel order {} failed: {}", code, e);
                return false;
            }
        };

        match decode_response(&reply.body) {
            Ok(resp) => {
                tracing::error!("Cancel order {} fail, message={:?}", code, resp);
                false
            }
            Err(_) => {
                tracing::debug!("cancel_order> {}", reply.text());
                true
            }
        }
    }
}

#[async_trait]
impl OrderCanceller for SessionClient {
    fn is_session_alive(&self) -> bool {
        self.token().is_some()
    }

    async fn cancel_order(&self, code: &str) -> bool {
        SessionClient::cancel_order(self, code).await
    }
}

/// 默认查询表单
fn query_form(count: i64) -> Vec<(String, String)> {
    vec![
        ("qqhs".to_string(), clamp_query_count(count).to_string()),
        ("dwc".to_string(), String::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 记录所有请求并返回固定响应
    struct FixedTransport {
        status: u16,
        body: &'static str,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl FixedTransport {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpReply> {
            self.requests.lock().unwrap().push(request);
            Ok(HttpReply {
                status: self.status,
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    fn client_with(transport: Arc<FixedTransport>, token: Option<&str>) -> Arc<SessionClient> {
        let config = ClientConfig::default()
            .with_base_url("http://broker.test")
            .with_captcha_image_path(None);
        let captcha = CaptchaSolver::new(&config, Arc::new(|_: &[u8]| "1234".to_string()));
        let client = SessionClient::new(config, transport, captcha).unwrap();
        client.set_token(token.map(str::to_string));
        client
    }

    #[test]
    fn test_clamp_query_count() {
        assert_eq!(clamp_query_count(0), 100);
        assert_eq!(clamp_query_count(-5), 100);
        assert_eq!(clamp_query_count(5000), 1000);
        assert_eq!(clamp_query_count(1001), 1000);
        assert_eq!(clamp_query_count(1000), 1000);
        assert_eq!(clamp_query_count(50), 50);
        assert_eq!(clamp_query_count(1), 1);
    }

    #[test]
    fn test_extract_token() {
        let html = r#"<input id="em_validatekey" type="hidden" value=" 3a5b-77c1 " />"#;
        assert_eq!(extract_token(html).unwrap(), "3a5b-77c1");
        assert!(extract_token(r#"<input id="em_validatekey" type="hidden" value="" />"#).is_none());
        assert!(extract_token("<html>login expired</html>").is_none());
    }

    #[test]
    fn test_base_headers() {
        let transport = FixedTransport::new(200, "");
        let client = client_with(transport, None);
        assert!(client
            .base_headers
            .contains(&("Host".to_string(), "broker.test".to_string())));
        assert!(client
            .base_headers
            .contains(&("Origin".to_string(), "http://broker.test".to_string())));
        assert_eq!(client.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    #[should_panic(expected = "authorization token is empty")]
    async fn test_dispatch_without_token_panics() {
        let client = client_with(FixedTransport::new(200, "{}"), None);
        let _ = client.dispatch(Endpoint::QueryOrders, None).await;
    }

    #[tokio::test]
    #[should_panic(expected = "not in endpoint list")]
    async fn test_dispatch_unknown_tag_panics() {
        let client = client_with(FixedTransport::new(200, "{}"), Some("tok"));
        let _ = client.dispatch_tag("query_everything", None).await;
    }

    #[tokio::test]
    async fn test_dispatch_default_and_clamped_counts() {
        let transport = FixedTransport::new(200, r#"{"Status":0,"Data":[]}"#);
        let client = client_with(transport.clone(), Some("tok"));

        client.dispatch(Endpoint::QueryTrades, None).await.unwrap();
        client.dispatch_with_count(Endpoint::QueryTrades, 0).await.unwrap();
        client.dispatch_with_count(Endpoint::QueryTrades, 5000).await.unwrap();
        client.dispatch_with_count(Endpoint::QueryTrades, 50).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        let counts: Vec<_> = requests.iter().map(|r| r.form_value("qqhs").unwrap()).collect();
        assert_eq!(counts, ["100", "100", "1000", "50"]);
        assert_eq!(requests[0].url, "http://broker.test/Search/GetDealData?validatekey=tok");
        assert!(requests[0]
            .headers
            .contains(&("X-Requested-With".to_string(), "XMLHttpRequest".to_string())));
    }

    #[tokio::test]
    async fn test_dispatch_non_200() {
        let client = client_with(FixedTransport::new(500, "server error"), Some("tok"));
        let result = client.dispatch_tag("query_orders", None).await;
        assert!(matches!(result, Err(EmtError::Transport { status: 500, .. })));
    }

    // 站点的撤单响应是反的: 标准 JSON 表示失败, 非 JSON 表示成功
    #[tokio::test]
    async fn test_cancel_order_clean_envelope_means_failure() {
        let transport = FixedTransport::new(200, r#"{"Status":-1,"Message":"撤单失败"}"#);
        let client = client_with(transport.clone(), Some("tok"));
        assert!(!client.cancel_order(" 20240501_12345 ").await);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].form_value("revokes"), Some("20240501_12345"));
    }

    #[tokio::test]
    async fn test_cancel_order_non_json_means_success() {
        let client = client_with(FixedTransport::new(200, "20240501_12345: 撤单委托已提交"), Some("tok"));
        assert!(client.cancel_order("20240501_12345").await);
    }

    #[tokio::test]
    async fn test_cancel_order_transport_failure() {
        let client = client_with(FixedTransport::new(502, "bad gateway"), Some("tok"));
        assert!(!client.cancel_order("20240501_12345").await);
    }

    #[tokio::test]
    async fn test_insert_order_rejects_bad_params() {
        let transport = FixedTransport::new(200, r#"{"Status":0,"Data":[]}"#);
        let client = client_with(transport.clone(), Some("tok"));
        let ins = Instrument::new("000001", crate::types::Market::Sze);

        assert!(matches!(
            client.insert_order(&ins, Side::Buy, 11.31, 0).await,
            Err(EmtError::InvalidParams(_))
        ));
        assert!(matches!(
            client.insert_order(&ins, Side::Buy, f64::NAN, 100).await,
            Err(EmtError::InvalidParams(_))
        ));
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_session_stops_requests() {
        let transport = FixedTransport::new(200, r#"{"Status":0,"Data":[]}"#);
        let client = client_with(transport.clone(), Some("tok"));
        client.cancellation_token().cancel();

        let result = client.query_trades().await;
        assert!(matches!(result, Err(EmtError::Cancelled)));
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}
