//! Globalping API 客户端
//!
//! [`MeasurementApi`] 抽象了“创建测量、查询测量”两个调用，便于在轮询逻辑中替换实现

use crate::config::GlobalpingConfig;
use crate::error::{AppError, ProbeError};
use crate::probe::globalping::request::MeasurementRequest;
use crate::probe::globalping::response::{
    CreateMeasurementResponse, ErrorResponse, MeasurementResponse,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// 测量API接口
#[async_trait]
pub trait MeasurementApi: Send + Sync {
    /// 创建测量任务
    ///
    /// # 参数
    /// * `token` - Bearer令牌
    /// * `request` - 测量请求
    /// * `timeout` - 本次调用的超时时间
    ///
    /// # 返回
    /// * `Result<String, ProbeError>` - 测量任务ID
    async fn create_measurement(
        &self,
        token: &str,
        request: &MeasurementRequest,
        timeout: Duration,
    ) -> Result<String, ProbeError>;

    /// 查询测量任务状态
    ///
    /// # 参数
    /// * `id` - 测量任务ID
    /// * `timeout` - 本次调用的超时时间
    async fn get_measurement(
        &self,
        id: &str,
        timeout: Duration,
    ) -> Result<MeasurementResponse, ProbeError>;
}

/// 基于reqwest的Globalping API实现
#[derive(Debug, Clone)]
pub struct GlobalpingApi {
    client: Client,
    base_url: String,
}

impl GlobalpingApi {
    /// 创建API客户端
    pub fn new(settings: &GlobalpingConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn measurements_url(&self) -> String {
        format!("{}/v1/measurements", self.base_url)
    }
}

#[async_trait]
impl MeasurementApi for GlobalpingApi {
    async fn create_measurement(
        &self,
        token: &str,
        request: &MeasurementRequest,
        timeout: Duration,
    ) -> Result<String, ProbeError> {
        debug!(
            "请求Global Ping API，请求体: {}",
            serde_json::to_string(request).unwrap_or_default()
        );

        let response = self
            .client
            .post(self.measurements_url())
            .bearer_auth(token)
            .json(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProbeError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::from_reqwest(&e))?;

        if status != StatusCode::ACCEPTED {
            return Err(provider_error(status, &body));
        }

        let created: CreateMeasurementResponse = serde_json::from_str(&body)
            .map_err(|e| ProbeError::protocol(format!("无法解析测量创建响应: {e}")))?;

        Ok(created.id)
    }

    async fn get_measurement(
        &self,
        id: &str,
        timeout: Duration,
    ) -> Result<MeasurementResponse, ProbeError> {
        let response = self
            .client
            .get(format!("{}/{}", self.measurements_url(), id))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProbeError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::from_reqwest(&e))?;

        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProbeError::protocol(format!("无法解析测量结果响应: {e}")))
    }
}

/// 将非预期状态码的响应转换为协议错误，优先使用服务端给出的错误信息
fn provider_error(status: StatusCode, body: &str) -> ProbeError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(response) => ProbeError::protocol(response.error.message),
        Err(_) => ProbeError::protocol(format!("API返回非预期状态码: {status}")),
    }
}
