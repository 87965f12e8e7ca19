//! 本地检测器实现
//!
//! 直接从本机发起检测：`TCP_PING` 建立TCP连接后立即关闭，其余方法发送HTTP请求

use crate::config::{split_host_port, MonitorTarget};
use crate::error::{AppError, ProbeError};
use crate::probe::deadline::Deadline;
use crate::probe::result::ProbeResult;
use crate::probe::validator::validate_response;
use crate::probe::Prober;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, PRAGMA, USER_AGENT};
use reqwest::{Client, Method};
use std::future::Future;
use std::str::FromStr;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// 本地检测器
#[derive(Debug, Clone)]
pub struct LocalProber {
    /// HTTP客户端
    client: Client,
    /// 请求未携带User-Agent时注入的默认值
    user_agent: String,
}

impl LocalProber {
    /// 创建本地检测器，使用默认User-Agent
    pub fn new() -> Result<Self, AppError> {
        Self::with_user_agent(default_user_agent())
    }

    /// 创建本地检测器
    ///
    /// # 参数
    /// * `user_agent` - 请求未携带User-Agent时注入的值
    pub fn with_user_agent(user_agent: impl Into<String>) -> Result<Self, AppError> {
        // 超时由每次检测的截止时间控制，客户端本身不设置超时
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }

    /// TCP端口检测
    async fn check_tcp(&self, target: &MonitorTarget) -> ProbeResult {
        let (host, port) = match split_host_port(&target.target) {
            Ok(address) => address,
            Err(e) => {
                warn!("{} 地址解析失败: {}", target.name, e);
                return ProbeResult::down(0, ProbeError::config(e).to_string());
            }
        };

        Self::connect_within(target, TcpStream::connect((host.as_str(), port))).await
    }

    /// 在监控超时内等待TCP连接建立，连接成功后立即关闭
    async fn connect_within<F, S>(target: &MonitorTarget, connect: F) -> ProbeResult
    where
        F: Future<Output = std::io::Result<S>>,
    {
        let deadline = Deadline::after(target.timeout_duration());

        match deadline.run(connect).await {
            Ok(Ok(stream)) => {
                let ping = deadline.elapsed().as_millis() as u64;
                drop(stream);
                info!("{} 成功连接到 {} ({}ms)", target.name, target.target, ping);
                ProbeResult::up(ping)
            }
            Ok(Err(e)) => {
                let err = ProbeError::from_io(&e);
                warn!("{} 连接 {} 出错: {}", target.name, target.target, err);
                ProbeResult::down(0, err.to_string())
            }
            Err(_) => {
                warn!("{} 连接 {} 超时", target.name, target.target);
                ProbeResult::down(target.timeout, ProbeError::Timeout(target.timeout).to_string())
            }
        }
    }

    /// 构建请求头：注入默认User-Agent，并禁用缓存
    fn build_headers(&self, target: &MonitorTarget) -> Result<HeaderMap, ProbeError> {
        let mut headers = HeaderMap::new();

        for (key, value) in &target.headers {
            let name = HeaderName::from_str(key)
                .map_err(|_| ProbeError::config(format!("无效的请求头名称: {key}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ProbeError::config(format!("请求头 {key} 的值无效")))?;
            headers.insert(name, value);
        }

        if !headers.contains_key(USER_AGENT) {
            let value = HeaderValue::from_str(&self.user_agent)
                .map_err(|_| ProbeError::config("无效的User-Agent"))?;
            headers.insert(USER_AGENT, value);
        }

        // 每次检测都必须访问实时端点，不允许中间层返回缓存
        headers
            .entry(CACHE_CONTROL)
            .or_insert(HeaderValue::from_static("no-cache, no-store"));
        headers
            .entry(PRAGMA)
            .or_insert(HeaderValue::from_static("no-cache"));

        Ok(headers)
    }

    /// 构建HTTP请求
    fn build_request(&self, target: &MonitorTarget) -> Result<reqwest::RequestBuilder, ProbeError> {
        let method = Method::from_str(&target.method.to_uppercase())
            .map_err(|_| ProbeError::config(format!("无效的HTTP方法: {}", target.method)))?;

        let mut request = self
            .client
            .request(method, &target.target)
            .headers(self.build_headers(target)?);

        if let Some(body) = &target.body {
            request = request.body(body.clone());
        }

        Ok(request)
    }

    /// HTTP端点检测
    async fn check_http(&self, target: &MonitorTarget) -> ProbeResult {
        let request = match self.build_request(target) {
            Ok(request) => request,
            Err(e) => {
                warn!("{} 请求构建失败: {}", target.name, e);
                return ProbeResult::down(0, e.to_string());
            }
        };

        let deadline = Deadline::after(target.timeout_duration());

        let response = match deadline.run(request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let err = ProbeError::from_reqwest(&e);
                warn!("{} 出错: {}", target.name, err);
                return ProbeResult::down(0, err.to_string());
            }
            Err(_) => return self.timeout_result(target),
        };

        let ping = deadline.elapsed().as_millis() as u64;
        let status_code = response.status().as_u16();
        info!("{} 响应状态码: {} ({}ms)", target.name, status_code, ping);

        // 响应体读取同样受截止时间约束
        let body_reader = || async move {
            match deadline.run(response.text()).await {
                Ok(Ok(body)) => Ok(body),
                Ok(Err(e)) => Err(ProbeError::from_reqwest(&e)),
                Err(_) => Err(ProbeError::Timeout(target.timeout)),
            }
        };

        match validate_response(target, status_code, body_reader).await {
            Ok(()) => ProbeResult::up(ping),
            Err(ProbeError::Timeout(_)) => self.timeout_result(target),
            Err(e) => {
                info!("{} 响应校验未通过: {}", target.name, e);
                ProbeResult::down(ping, e.to_string())
            }
        }
    }

    /// 创建超时结果，ping 固定为配置的超时时间
    fn timeout_result(&self, target: &MonitorTarget) -> ProbeResult {
        warn!("{} 请求超时 ({}ms)", target.name, target.timeout);
        ProbeResult::down(target.timeout, ProbeError::Timeout(target.timeout).to_string())
    }
}

#[async_trait]
impl Prober for LocalProber {
    async fn check(&self, target: &MonitorTarget) -> ProbeResult {
        debug!("本地检测 {} ({} {})", target.name, target.method, target.target);

        if target.is_tcp_ping() {
            self.check_tcp(target).await
        } else {
            self.check_http(target).await
        }
    }
}

/// 默认User-Agent
pub fn default_user_agent() -> String {
    format!("{}/{}", crate::APP_NAME, crate::VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TCP_PING;
    use mockito::Matcher;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn create_test_target(url: &str) -> MonitorTarget {
        let mut target = MonitorTarget::new("test", "Test Service", "GET", url);
        target.timeout = 2_000;
        target
    }

    /// 接受连接但从不响应的服务器
    async fn spawn_silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut connections = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                connections.push(socket);
            }
        });
        format!("http://{address}/slow")
    }

    #[tokio::test]
    async fn test_http_up() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let prober = LocalProber::new().unwrap();
        let target = create_test_target(&format!("{}/health", server.url()));
        let result = prober.check(&target).await;

        assert!(result.up);
        assert!(result.err.is_empty());
        assert!(result.location.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_injects_user_agent_and_disables_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", default_user_agent().as_str())
            .match_header("cache-control", Matcher::Regex("no-cache".to_string()))
            .match_header("pragma", "no-cache")
            .with_status(204)
            .create_async()
            .await;

        let prober = LocalProber::new().unwrap();
        let result = prober.check(&create_test_target(&server.url())).await;

        assert!(result.up, "{}", result.err);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_keeps_custom_user_agent_and_sends_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/submit")
            .match_header("user-agent", "custom-agent/2.0")
            .match_header("x-api-key", "secret")
            .match_body("ping=1")
            .with_status(201)
            .create_async()
            .await;

        let prober = LocalProber::new().unwrap();
        let mut target = create_test_target(&format!("{}/submit", server.url()));
        target.method = "post".to_string();
        target.body = Some("ping=1".to_string());
        target
            .headers
            .insert("User-Agent".to_string(), "custom-agent/2.0".to_string());
        target
            .headers
            .insert("X-Api-Key".to_string(), "secret".to_string());

        let result = prober.check(&target).await;
        assert!(result.up, "{}", result.err);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_unexpected_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/teapot")
            .with_status(200)
            .create_async()
            .await;

        let prober = LocalProber::new().unwrap();
        let mut target = create_test_target(&format!("{}/teapot", server.url()));
        target.expected_codes = Some(vec![418]);

        let result = prober.check(&target).await;
        assert!(!result.up);
        assert!(result.err.contains("418"));
        assert!(result.err.contains("200"));
    }

    #[tokio::test]
    async fn test_http_keyword_rules() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/status")
            .with_status(200)
            .with_body("Service Down")
            .create_async()
            .await;

        let prober = LocalProber::new().unwrap();
        let mut target = create_test_target(&format!("{}/status", server.url()));
        target.response_keyword = Some("OK".to_string());

        let result = prober.check(&target).await;
        assert!(!result.up);
        assert_eq!(result.err, "HTTP响应未包含配置的关键词");

        target.response_keyword = None;
        target.response_forbidden_keyword = Some("Down".to_string());
        let result = prober.check(&target).await;
        assert!(!result.up);
        assert_eq!(result.err, "HTTP响应包含配置的禁止关键词");
    }

    #[tokio::test]
    async fn test_http_timeout_pins_ping() {
        let url = spawn_silent_server().await;
        let prober = LocalProber::new().unwrap();
        let mut target = create_test_target(&url);
        target.timeout = 300;

        let started = std::time::Instant::now();
        let result = prober.check(&target).await;

        assert!(!result.up);
        assert_eq!(result.ping, 300);
        assert_eq!(result.err, "超时 (300ms)");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_http_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let prober = LocalProber::new().unwrap();
        let result = prober
            .check(&create_test_target(&format!("http://{address}/")))
            .await;

        assert!(!result.up);
        assert_eq!(result.ping, 0);
        assert!(result.err.starts_with("ConnectError: "), "{}", result.err);
    }

    #[tokio::test]
    async fn test_http_invalid_method() {
        let prober = LocalProber::new().unwrap();
        let mut target = create_test_target("http://127.0.0.1:1/");
        target.method = "BAD METHOD".to_string();

        let result = prober.check(&target).await;
        assert!(!result.up);
        assert!(result.err.contains("无效的HTTP方法"));
    }

    #[tokio::test]
    async fn test_tcp_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let prober = LocalProber::new().unwrap();
        let target = MonitorTarget::new("tcp", "TCP", TCP_PING, address.to_string());
        let result = prober.check(&target).await;

        assert!(result.up, "{}", result.err);
        assert!(result.err.is_empty());
        assert!(result.ping < target.timeout);
    }

    #[tokio::test]
    async fn test_tcp_refused_reports_zero_ping() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let prober = LocalProber::new().unwrap();
        let target = MonitorTarget::new("tcp", "TCP", TCP_PING, address.to_string());
        let result = prober.check(&target).await;

        assert!(!result.up);
        assert_eq!(result.ping, 0);
        assert!(result.err.starts_with("ConnectionRefused: "), "{}", result.err);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tcp_connect_timeout() {
        let mut target = MonitorTarget::new("tcp", "TCP", TCP_PING, "127.0.0.1:9");
        target.timeout = 300;

        let started = tokio::time::Instant::now();
        let result = LocalProber::connect_within(
            &target,
            std::future::pending::<std::io::Result<TcpStream>>(),
        )
        .await;

        assert!(!result.up);
        assert_eq!(result.ping, 300);
        assert_eq!(result.err, "超时 (300ms)");
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_tcp_malformed_address() {
        let prober = LocalProber::new().unwrap();
        let target = MonitorTarget::new("tcp", "TCP", TCP_PING, "no-port-here");
        let result = prober.check(&target).await;

        assert!(!result.up);
        assert_eq!(result.ping, 0);
        assert!(result.err.contains("缺少端口"));
    }
}
