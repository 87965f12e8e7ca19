//! 配置管理模块
//!
//! 提供配置文件解析、验证以及检测代理URI解析功能

pub mod loader;
pub mod proxy;
pub mod types;

// 重新导出主要类型
pub use loader::{get_default_config_path, ConfigLoader, TomlConfigLoader};
pub use proxy::CheckProxy;
pub use types::{
    split_host_port, validate_config, Config, GlobalConfig, GlobalpingConfig, MonitorTarget,
    TCP_PING,
};
