//! Uptime Probe - 可用性监控探测引擎
//!
//! 根据声明式的监控目标配置判断端点当前是否可达且健康，支持：
//! - 本地HTTP/HTTPS检测与TCP端口检测
//! - 通过Globalping从全球探测节点委托检测
//! - 状态码与响应关键词校验
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;

// 重新导出主要类型
pub use config::{Config, MonitorTarget};
pub use error::{AppError, ProbeError};
pub use probe::{LocalProber, ProbeDispatcher, ProbeResult, Prober, RemoteProbeClient};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
