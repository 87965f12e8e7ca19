//! 探测执行模块
//!
//! 提供本地检测、Globalping远程检测、响应校验以及二者之间的分发

pub mod deadline;
pub mod dispatcher;
pub mod globalping;
pub mod local;
pub mod result;
pub mod validator;

use crate::config::MonitorTarget;
use async_trait::async_trait;

// 重新导出主要类型
pub use deadline::Deadline;
pub use dispatcher::ProbeDispatcher;
pub use globalping::{GlobalpingApi, MeasurementApi, RemoteProbeClient};
pub use local::LocalProber;
pub use result::{ProbeResult, ERROR_LOCATION};
pub use validator::validate_response;

/// 检测器trait
///
/// 一次调用只执行一次检测，所有失败都体现在返回的 [`ProbeResult`] 中，不会向调用方抛出错误
#[async_trait]
pub trait Prober: Send + Sync {
    /// 执行检测
    ///
    /// # 参数
    /// * `target` - 监控目标配置
    ///
    /// # 返回
    /// * `ProbeResult` - 检测结果
    async fn check(&self, target: &MonitorTarget) -> ProbeResult;
}
