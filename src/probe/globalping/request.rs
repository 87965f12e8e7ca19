//! Globalping测量请求
//!
//! 按检测模式构建不同形状的请求体，序列化后作为 `POST /v1/measurements` 的请求体

use crate::config::{split_host_port, CheckProxy, MonitorTarget};
use crate::error::ProbeError;
use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;

/// 远程HTTP检测允许的方法
pub const REMOTE_HTTP_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];

/// 测量请求，`type` 字段区分TCP Ping与HTTP检测
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MeasurementRequest {
    /// TCP Ping
    Ping(PingMeasurement),
    /// HTTP检测
    Http(HttpMeasurement),
}

/// 探测位置过滤条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationFilter {
    pub magic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingMeasurement {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<LocationFilter>>,
    pub measurement_options: PingOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingOptions {
    pub port: u16,
    pub packets: u32,
    pub protocol: String,
    pub ip_version: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMeasurement {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<LocationFilter>>,
    pub measurement_options: HttpOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOptions {
    pub request: HttpRequestOptions,
    pub port: u16,
    pub protocol: String,
    pub ip_version: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpRequestOptions {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl MeasurementRequest {
    /// 根据监控目标与代理配置构建测量请求
    ///
    /// 所有配置错误都在发起任何网络请求之前返回
    pub fn build(target: &MonitorTarget, proxy: &CheckProxy) -> Result<Self, ProbeError> {
        let locations = proxy.magic.as_ref().map(|magic| {
            vec![LocationFilter {
                magic: magic.clone(),
            }]
        });

        if target.is_tcp_ping() {
            let (host, port) = split_host_port(&target.target).map_err(ProbeError::config)?;

            return Ok(MeasurementRequest::Ping(PingMeasurement {
                target: host,
                locations,
                measurement_options: PingOptions {
                    port,
                    packets: 1,
                    protocol: "tcp".to_string(),
                    ip_version: proxy.ip_version,
                },
            }));
        }

        let url = Url::parse(&target.target)
            .map_err(|e| ProbeError::config(format!("监控目标URL无效: {e}")))?;

        if target.body.as_deref().is_some_and(|body| !body.is_empty()) {
            return Err(ProbeError::config("暂不支持自定义请求体"));
        }

        let method = target.method.to_uppercase();
        if !REMOTE_HTTP_METHODS.contains(&method.as_str()) {
            return Err(ProbeError::config("仅支持GET、HEAD、OPTIONS请求方法"));
        }

        let protocol = url.scheme().to_string();
        if protocol != "http" && protocol != "https" {
            return Err(ProbeError::config(format!(
                "仅支持http与https协议，实际收到: {protocol}"
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| ProbeError::config("监控目标URL缺少主机名"))?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
            .to_string();

        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProbeError::config("监控目标URL缺少端口"))?;

        Ok(MeasurementRequest::Http(HttpMeasurement {
            target: host,
            locations,
            measurement_options: HttpOptions {
                request: HttpRequestOptions {
                    method,
                    path: url.path().to_string(),
                    query: url.query().map(|query| format!("?{query}")),
                    headers: target
                        .headers
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                },
                port,
                protocol,
                ip_version: proxy.ip_version,
            },
        }))
    }

    /// 是否为HTTP检测
    pub fn is_http(&self) -> bool {
        matches!(self, MeasurementRequest::Http(_))
    }
}
