//! Globalping API 响应结构
//!
//! 在解析边界上把响应映射为强类型记录，缺少必需字段时返回协议错误

use crate::error::ProbeError;
use crate::probe::result::round_millis;
use crate::probe::validator::truncate_chars;
use serde::Deserialize;
use std::fmt;

/// 错误信息中原始输出的最大长度（字符）
const RAW_OUTPUT_LIMIT: usize = 64;

/// 测量状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementStatus {
    InProgress,
    Finished,
    Failed,
    Offline,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for MeasurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MeasurementStatus::InProgress => "in-progress",
            MeasurementStatus::Finished => "finished",
            MeasurementStatus::Failed => "failed",
            MeasurementStatus::Offline => "offline",
            MeasurementStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// `POST /v1/measurements` 成功响应
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeasurementResponse {
    pub id: String,
}

/// API错误响应
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// `GET /v1/measurements/{id}` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementResponse {
    pub id: String,
    pub status: MeasurementStatus,
    #[serde(default)]
    pub results: Vec<ResultEntry>,
}

/// 单个探测节点的结果
#[derive(Debug, Clone, Deserialize)]
pub struct ResultEntry {
    pub probe: ProbeLocation,
    pub result: RawResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeLocation {
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    pub status: MeasurementStatus,
    #[serde(default)]
    pub raw_output: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub raw_body: Option<String>,
    #[serde(default)]
    pub timings: Option<HttpTimings>,
    #[serde(default)]
    pub stats: Option<PingStats>,
    #[serde(default)]
    pub tls: Option<TlsInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpTimings {
    #[serde(default)]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingStats {
    #[serde(default)]
    pub avg: Option<f64>,
}

/// TLS证书信息
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TlsInfo {
    pub authorized: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// 已完成测量中HTTP检测的关键数据
#[derive(Debug, Clone, PartialEq)]
pub struct HttpOutcome {
    pub total_ms: u64,
    pub status_code: u16,
    pub raw_body: String,
    pub tls: Option<TlsInfo>,
}

impl MeasurementResponse {
    /// 测量是否仍在进行
    pub fn is_in_progress(&self) -> bool {
        self.status == MeasurementStatus::InProgress
    }

    /// 取出第一个结果，并要求测量及该结果都已成功完成
    pub fn finished_result(&self) -> Result<&ResultEntry, ProbeError> {
        let first = self
            .results
            .first()
            .ok_or_else(|| ProbeError::protocol(format!("测量 {} 没有任何结果", self.id)))?;

        if self.status != MeasurementStatus::Finished
            || first.result.status != MeasurementStatus::Finished
        {
            let raw_output = first.result.raw_output.as_deref().unwrap_or_default();
            return Err(ProbeError::protocol(format!(
                "状态 [{}|{}]: {}",
                self.status,
                first.result.status,
                truncate_chars(raw_output, RAW_OUTPUT_LIMIT)
            )));
        }

        Ok(first)
    }
}

impl ResultEntry {
    /// 探测节点位置 `国家/城市`
    pub fn location(&self) -> String {
        format!(
            "{}/{}",
            self.probe.country,
            self.probe.city.as_deref().unwrap_or_default()
        )
    }

    /// TCP Ping 平均延迟（四舍五入）
    pub fn ping_avg_ms(&self) -> Result<u64, ProbeError> {
        self.result
            .stats
            .as_ref()
            .and_then(|stats| stats.avg)
            .map(round_millis)
            .ok_or_else(|| ProbeError::protocol("测量结果缺少 stats.avg"))
    }

    /// HTTP检测结果
    pub fn http_outcome(&self) -> Result<HttpOutcome, ProbeError> {
        let result = &self.result;

        let total_ms = result
            .timings
            .as_ref()
            .and_then(|timings| timings.total)
            .map(round_millis)
            .ok_or_else(|| ProbeError::protocol("测量结果缺少 timings.total"))?;

        let status_code = result
            .status_code
            .ok_or_else(|| ProbeError::protocol("测量结果缺少 statusCode"))?;

        Ok(HttpOutcome {
            total_ms,
            status_code,
            raw_body: result.raw_body.clone().unwrap_or_default(),
            tls: result.tls.clone(),
        })
    }
}
