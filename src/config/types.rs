//! 配置数据结构定义
//!
//! 定义监控目标、Globalping设置等配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;

/// TCP端口检测使用的方法标记
pub const TCP_PING: &str = "TCP_PING";

/// 本地检测支持的HTTP方法
pub const HTTP_METHODS: [&str; 7] = ["GET", "HEAD", "OPTIONS", "POST", "PUT", "PATCH", "DELETE"];

/// 主配置结构，包含全局配置、Globalping设置和监控目标列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// Globalping远程检测设置
    #[serde(default)]
    pub globalping: GlobalpingConfig,
    /// 监控目标列表
    pub monitors: Vec<MonitorTarget>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 最大并发检测数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_checks: usize,
    /// 覆盖默认注入的User-Agent
    pub user_agent: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_concurrent_checks: default_max_concurrent(),
            user_agent: None,
        }
    }
}

/// Globalping API 设置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalpingConfig {
    /// API基础地址
    #[serde(default = "default_globalping_base_url")]
    pub base_url: String,
    /// 单次API请求超时（毫秒）
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 轮询间隔（毫秒）
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 轮询总预算在监控超时基础上额外增加的时间（毫秒）
    #[serde(default = "default_poll_grace_ms")]
    pub poll_grace_ms: u64,
}

impl Default for GlobalpingConfig {
    fn default() -> Self {
        Self {
            base_url: default_globalping_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_grace_ms: default_poll_grace_ms(),
        }
    }
}

impl GlobalpingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_grace(&self) -> Duration {
        Duration::from_millis(self.poll_grace_ms)
    }
}

/// 监控目标配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorTarget {
    /// 唯一标识
    pub id: String,
    /// 显示名称
    pub name: String,
    /// HTTP方法，或 `TCP_PING`
    #[serde(default = "default_method")]
    pub method: String,
    /// HTTP模式为URL，TCP模式为 `host:port`
    pub target: String,
    /// 超时时间（毫秒）
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// 期望的状态码列表，未配置时接受任意2xx
    pub expected_codes: Option<Vec<u16>>,
    /// 响应体必须包含的关键词
    pub response_keyword: Option<String>,
    /// 响应体禁止包含的关键词
    pub response_forbidden_keyword: Option<String>,
    /// 附加请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 请求体
    pub body: Option<String>,
    /// 远程检测代理，如 `globalping://TOKEN?magic=Berlin`
    pub check_proxy: Option<String>,
    /// 状态页链接（仅展示用）
    pub status_page_link: Option<String>,
    /// 提示信息（仅展示用）
    pub tooltip: Option<String>,
    /// 是否隐藏延迟图表（仅展示用）
    #[serde(default)]
    pub hide_latency_chart: bool,
}

impl MonitorTarget {
    /// 创建使用默认值的监控目标
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        method: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            method: method.into(),
            target: target.into(),
            timeout: default_timeout(),
            expected_codes: None,
            response_keyword: None,
            response_forbidden_keyword: None,
            headers: HashMap::new(),
            body: None,
            check_proxy: None,
            status_page_link: None,
            tooltip: None,
            hide_latency_chart: false,
        }
    }

    /// 是否为TCP端口检测
    pub fn is_tcp_ping(&self) -> bool {
        self.method == TCP_PING
    }

    /// 是否配置了关键词规则
    pub fn has_keyword_rules(&self) -> bool {
        self.required_keyword().is_some() || self.forbidden_keyword().is_some()
    }

    /// 响应必须包含的关键词，空字符串视为未配置
    pub fn required_keyword(&self) -> Option<&str> {
        self.response_keyword.as_deref().filter(|k| !k.is_empty())
    }

    /// 响应禁止包含的关键词，空字符串视为未配置
    pub fn forbidden_keyword(&self) -> Option<&str> {
        self.response_forbidden_keyword
            .as_deref()
            .filter(|k| !k.is_empty())
    }

    /// 超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_concurrent() -> usize {
    10
}
fn default_method() -> String {
    "GET".to_string()
}
fn default_timeout() -> u64 {
    10_000
}
fn default_globalping_base_url() -> String {
    "https://api.globalping.io".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_poll_grace_ms() -> u64 {
    2_000
}

/// 将 `host:port` 拆分为主机和端口，IPv6地址需使用方括号
pub fn split_host_port(address: &str) -> Result<(String, u16), String> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| format!("地址 {address} 缺少端口，格式应为 host:port"))?;

    let host = match host.strip_prefix('[') {
        Some(inner) => inner
            .strip_suffix(']')
            .ok_or_else(|| format!("地址 {address} 的IPv6主机缺少右方括号"))?,
        None if host.contains(':') => {
            return Err(format!("地址 {address} 的IPv6主机需要使用方括号"));
        }
        None => host,
    };

    if host.is_empty() {
        return Err(format!("地址 {address} 缺少主机名"));
    }

    let port = port
        .parse::<u16>()
        .map_err(|_| format!("地址 {address} 的端口 {port} 无效"))?;

    Ok((host.to_string(), port))
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证日志级别
    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    if config.global.max_concurrent_checks == 0 {
        return Err("最大并发检测数不能为0".to_string());
    }

    // 验证Globalping设置
    let globalping = &config.globalping;
    if !globalping.base_url.starts_with("http://") && !globalping.base_url.starts_with("https://")
    {
        return Err(format!("Globalping API地址无效: {}", globalping.base_url));
    }
    if globalping.request_timeout_ms == 0 {
        return Err("Globalping请求超时时间不能为0".to_string());
    }
    if globalping.poll_interval_ms == 0 {
        return Err("Globalping轮询间隔不能为0".to_string());
    }

    // 验证监控目标
    if config.monitors.is_empty() {
        return Err("至少需要配置一个监控目标".to_string());
    }

    let mut seen_ids = HashSet::new();
    for monitor in &config.monitors {
        validate_monitor(monitor)?;

        if !seen_ids.insert(monitor.id.as_str()) {
            return Err(format!("监控目标ID {} 重复", monitor.id));
        }
    }

    Ok(())
}

fn validate_monitor(monitor: &MonitorTarget) -> Result<(), String> {
    if monitor.id.trim().is_empty() {
        return Err("监控目标ID不能为空".to_string());
    }

    if monitor.name.trim().is_empty() {
        return Err(format!("监控目标 {} 的名称不能为空", monitor.id));
    }

    if monitor.timeout == 0 {
        return Err(format!("监控目标 {} 的超时时间不能为0", monitor.id));
    }

    if monitor.is_tcp_ping() {
        split_host_port(&monitor.target)
            .map_err(|e| format!("监控目标 {} 的地址无效: {}", monitor.id, e))?;
        return Ok(());
    }

    let method = monitor.method.to_uppercase();
    if !HTTP_METHODS.contains(&method.as_str()) {
        return Err(format!(
            "监控目标 {} 的HTTP方法 {} 无效，支持的方法: {:?} 或 {}",
            monitor.id, monitor.method, HTTP_METHODS, TCP_PING
        ));
    }

    if !monitor.target.starts_with("http://") && !monitor.target.starts_with("https://") {
        return Err(format!("监控目标 {} 的URL格式无效", monitor.id));
    }

    if let Some(codes) = &monitor.expected_codes {
        if codes.is_empty() {
            return Err(format!("监控目标 {} 的期望状态码列表不能为空", monitor.id));
        }
        for &code in codes {
            if !(100..=599).contains(&code) {
                return Err(format!("监控目标 {} 的状态码 {} 无效", monitor.id, code));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        let mut monitor = MonitorTarget::new("api", "API", "GET", "https://example.com/health");
        monitor.expected_codes = Some(vec![200]);

        Config {
            global: GlobalConfig::default(),
            globalping: GlobalpingConfig::default(),
            monitors: vec![
                monitor,
                MonitorTarget::new("db", "Database", TCP_PING, "db.internal:5432"),
            ],
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = create_test_config();

        let serialized = toml::to_string(&config).expect("序列化失败");
        assert!(!serialized.is_empty());

        let deserialized: Config = toml::from_str(&serialized).expect("反序列化失败");
        assert_eq!(config.monitors, deserialized.monitors);
        assert_eq!(config.globalping, deserialized.globalping);
    }

    #[test]
    fn test_monitor_defaults() {
        let monitor: MonitorTarget = toml::from_str(
            r#"
id = "home"
name = "Home"
target = "https://example.com"
"#,
        )
        .unwrap();

        assert_eq!(monitor.method, "GET");
        assert_eq!(monitor.timeout, 10_000);
        assert!(monitor.expected_codes.is_none());
        assert!(monitor.headers.is_empty());
        assert!(!monitor.hide_latency_chart);
        assert!(!monitor.is_tcp_ping());
        assert!(!monitor.has_keyword_rules());
    }

    #[test]
    fn test_globalping_defaults() {
        let settings = GlobalpingConfig::default();
        assert_eq!(settings.base_url, "https://api.globalping.io");
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.poll_grace(), Duration::from_secs(2));
    }

    #[test]
    fn test_config_validation() {
        let config = create_test_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_validation_empty_monitors() {
        let mut config = create_test_config();
        config.monitors.clear();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("至少需要配置一个监控目标"));
    }

    #[test]
    fn test_config_validation_duplicate_id() {
        let mut config = create_test_config();
        config.monitors[1].id = "api".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("重复"));
    }

    #[test]
    fn test_config_validation_invalid_url() {
        let mut config = create_test_config();
        config.monitors[0].target = "example.com".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("URL格式无效"));
    }

    #[test]
    fn test_config_validation_invalid_method() {
        let mut config = create_test_config();
        config.monitors[0].method = "TRACE".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("HTTP方法"));
    }

    #[test]
    fn test_config_validation_invalid_status_code() {
        let mut config = create_test_config();
        config.monitors[0].expected_codes = Some(vec![999]);

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("状态码"));
    }

    #[test]
    fn test_config_validation_tcp_address() {
        let mut config = create_test_config();
        config.monitors[1].target = "db.internal".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("缺少端口"));
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = create_test_config();
        config.monitors[0].timeout = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("超时时间不能为0"));
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("example.com:443").unwrap(),
            ("example.com".to_string(), 443)
        );
        assert_eq!(
            split_host_port("[::1]:8080").unwrap(),
            ("::1".to_string(), 8080)
        );
        assert!(split_host_port("example.com").is_err());
        assert!(split_host_port(":80").is_err());
        assert!(split_host_port("example.com:http").is_err());
        assert!(split_host_port("example.com:70000").is_err());
        assert!(split_host_port("::1:80").is_err());
    }
}
