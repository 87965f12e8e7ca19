//! 检测分发器
//!
//! 根据是否配置了 `check_proxy` 选择本地检测或Globalping远程检测

use crate::config::{Config, MonitorTarget};
use crate::error::AppError;
use crate::probe::globalping::RemoteProbeClient;
use crate::probe::local::LocalProber;
use crate::probe::result::ProbeResult;
use crate::probe::Prober;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::info;

/// 检测分发器
#[derive(Clone)]
pub struct ProbeDispatcher {
    local: LocalProber,
    remote: RemoteProbeClient,
}

impl ProbeDispatcher {
    /// 由已有检测器组装分发器
    pub fn new(local: LocalProber, remote: RemoteProbeClient) -> Self {
        Self { local, remote }
    }

    /// 根据配置创建分发器
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let local = match &config.global.user_agent {
            Some(user_agent) => LocalProber::with_user_agent(user_agent.clone())?,
            None => LocalProber::new()?,
        };
        let remote = RemoteProbeClient::new(&config.globalping)?;

        Ok(Self::new(local, remote))
    }

    /// 并发检测多个目标，结果顺序与输入一致
    ///
    /// # 参数
    /// * `targets` - 监控目标列表
    /// * `max_concurrent` - 最大并发数
    pub async fn check_all(
        &self,
        targets: &[MonitorTarget],
        max_concurrent: usize,
    ) -> Vec<ProbeResult> {
        let checks: Vec<_> = targets.iter().map(|target| self.check(target)).collect();

        stream::iter(checks)
            .buffered(max_concurrent.max(1))
            .collect()
            .await
    }
}

#[async_trait]
impl Prober for ProbeDispatcher {
    async fn check(&self, target: &MonitorTarget) -> ProbeResult {
        let result = if target.check_proxy.is_some() {
            self.remote.check(target).await
        } else {
            self.local.check(target).await
        };

        info!("{} 检测完成: {}", target.name, result);
        result
    }
}
