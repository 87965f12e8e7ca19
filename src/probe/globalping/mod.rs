//! Globalping远程检测
//!
//! 委托Globalping从远程探测节点执行检测：
//! 构建测量请求 -> 提交 -> 按固定间隔轮询 -> 解析结果（完成/失败/超时）

pub mod api;
pub mod request;
pub mod response;

pub use api::{GlobalpingApi, MeasurementApi};
pub use request::MeasurementRequest;
pub use response::{MeasurementResponse, MeasurementStatus};

use crate::config::{CheckProxy, GlobalpingConfig, MonitorTarget};
use crate::error::{AppError, ProbeError};
use crate::probe::deadline::Deadline;
use crate::probe::result::{ProbeResult, ERROR_LOCATION};
use crate::probe::validator::validate_response;
use crate::probe::Prober;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 远程检测错误信息前缀
pub const PROVIDER_TAG: &str = "Globalping错误: ";

/// Globalping远程检测客户端
#[derive(Clone)]
pub struct RemoteProbeClient {
    /// 测量API
    api: Arc<dyn MeasurementApi>,
    /// 单次API调用超时
    request_timeout: Duration,
    /// 轮询间隔
    poll_interval: Duration,
    /// 总预算在监控超时基础上额外增加的时间
    poll_grace: Duration,
}

impl RemoteProbeClient {
    /// 使用Globalping HTTP API创建客户端
    pub fn new(settings: &GlobalpingConfig) -> Result<Self, AppError> {
        let api = GlobalpingApi::new(settings)?;
        Ok(Self::with_api(Arc::new(api), settings))
    }

    /// 使用自定义的测量API实现创建客户端
    pub fn with_api(api: Arc<dyn MeasurementApi>, settings: &GlobalpingConfig) -> Self {
        Self {
            api,
            request_timeout: settings.request_timeout(),
            poll_interval: settings.poll_interval(),
            poll_grace: settings.poll_grace(),
        }
    }

    /// 执行一次远程检测，任何错误都以 `Err` 返回，由 [`Prober::check`] 统一转换
    async fn run(&self, target: &MonitorTarget) -> Result<ProbeResult, ProbeError> {
        let deadline = Deadline::after(target.timeout_duration() + self.poll_grace);

        let proxy_uri = target
            .check_proxy
            .as_deref()
            .ok_or_else(|| ProbeError::config("Globalping检测代理配置为空"))?;
        let proxy = CheckProxy::parse(proxy_uri)?;
        let request = MeasurementRequest::build(target, &proxy)?;

        let id = deadline
            .run(
                self.api
                    .create_measurement(&proxy.token, &request, self.request_timeout),
            )
            .await
            .map_err(|_| ProbeError::PollTimeout(deadline.budget_ms()))??;
        info!(
            "{} 检测任务创建成功，任务ID: {}，耗时: {}ms",
            target.name,
            id,
            deadline.elapsed().as_millis()
        );

        let measurement = self.poll(&id, &deadline).await?;
        let entry = measurement.finished_result()?;
        let location = entry.location();

        let result = match &request {
            MeasurementRequest::Ping(_) => ProbeResult::up(entry.ping_avg_ms()?),
            MeasurementRequest::Http(http) => {
                let outcome = entry.http_outcome()?;
                let body = outcome.raw_body;

                let mut verdict =
                    validate_response(target, outcome.status_code, || async move { Ok(body) })
                        .await;
                if let Err(e) = &verdict {
                    info!("{} 响应校验未通过: {}", target.name, e);
                }

                // HTTPS证书不受信任时覆盖内容校验结果
                if http.measurement_options.protocol == "https" {
                    let tls = outcome
                        .tls
                        .ok_or_else(|| ProbeError::protocol("测量结果缺少TLS信息"))?;
                    if !tls.authorized {
                        let reason = tls.error.unwrap_or_default();
                        info!("{} TLS证书不受信任: {}", target.name, reason);
                        verdict = Err(ProbeError::Trust(reason));
                    }
                }

                match verdict {
                    Ok(()) => ProbeResult::up(outcome.total_ms),
                    Err(e) => ProbeResult::down(outcome.total_ms, e.to_string()),
                }
            }
        };

        Ok(result.with_location(location))
    }

    /// 轮询测量状态直到不再是 `in-progress`
    ///
    /// 每次查询受单次调用超时限制，整个阶段受 `deadline` 限制；到期时取消进行中的调用
    async fn poll(&self, id: &str, deadline: &Deadline) -> Result<MeasurementResponse, ProbeError> {
        let poll_timeout = || ProbeError::PollTimeout(deadline.budget_ms());
        let mut polls = 0u32;

        loop {
            if deadline.is_expired() {
                return Err(poll_timeout());
            }

            let measurement = deadline
                .run(self.api.get_measurement(id, self.request_timeout))
                .await
                .map_err(|_| poll_timeout())??;
            polls += 1;

            if !measurement.is_in_progress() {
                info!(
                    "检测任务 {} 已完成，状态: {}，轮询 {} 次，耗时: {}ms",
                    id,
                    measurement.status,
                    polls,
                    deadline.elapsed().as_millis()
                );
                debug!("检测任务 {} 响应: {:?}", id, measurement);
                return Ok(measurement);
            }

            deadline
                .run(tokio::time::sleep(self.poll_interval))
                .await
                .map_err(|_| poll_timeout())?;
        }
    }
}

#[async_trait]
impl Prober for RemoteProbeClient {
    async fn check(&self, target: &MonitorTarget) -> ProbeResult {
        debug!("Globalping检测 {} ({} {})", target.name, target.method, target.target);

        match self.run(target).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Globalping检测 {} 出错: {}", target.name, e);
                let ping = if e.is_timeout() { target.timeout } else { 0 };
                ProbeResult::down(ping, format!("{PROVIDER_TAG}{e}")).with_location(ERROR_LOCATION)
            }
        }
    }
}
