//! 探测结果数据结构
//!
//! 本地检测与远程检测最终都归一为 [`ProbeResult`]

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 远程交互在得到探测节点位置之前失败时使用的位置标记
pub const ERROR_LOCATION: &str = "ERROR";

/// 单次探测结果
///
/// 不变式：`up` 为真当且仅当 `err` 为空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 延迟（毫秒），超时时为配置的超时时间
    pub ping: u64,
    /// 是否可用
    pub up: bool,
    /// 错误信息，可用时为空
    pub err: String,
    /// 远程探测节点位置 `国家/城市`，本地检测时为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ProbeResult {
    /// 创建可用结果
    pub fn up(ping: u64) -> Self {
        Self {
            ping,
            up: true,
            err: String::new(),
            location: None,
        }
    }

    /// 创建不可用结果
    ///
    /// 错误信息为空时使用占位文本，保证 `up == false` 时 `err` 非空
    pub fn down(ping: u64, err: impl Into<String>) -> Self {
        let mut err = err.into();
        if err.is_empty() {
            err = "未知错误".to_string();
        }

        Self {
            ping,
            up: false,
            err,
            location: None,
        }
    }

    /// 设置远程探测节点位置
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// 延迟
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.ping)
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.up {
            write!(f, "正常 ({}ms)", self.ping)?;
        } else {
            write!(f, "异常 ({}ms): {}", self.ping, self.err)?;
        }
        if let Some(location) = &self.location {
            write!(f, " @ {location}")?;
        }
        Ok(())
    }
}

/// 将毫秒数（可能为小数）四舍五入为非负整数
pub(crate) fn round_millis(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}
