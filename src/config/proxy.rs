//! 远程检测代理配置解析
//!
//! `check_proxy` 字段使用 `globalping://<token>?magic=<位置>&ipVersion=<4|6>` 格式

use crate::error::ProbeError;
use reqwest::Url;

/// Globalping代理使用的URI协议
pub const GLOBALPING_SCHEME: &str = "globalping";

/// 解析后的Globalping代理配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckProxy {
    /// API访问令牌
    pub token: String,
    /// 探测位置选择器
    pub magic: Option<String>,
    /// IP协议版本
    pub ip_version: u8,
}

impl CheckProxy {
    /// 解析代理URI
    ///
    /// # 参数
    /// * `uri` - `check_proxy` 原始配置
    ///
    /// # 返回
    /// * `Result<Self, ProbeError>` - 协议错误、缺少令牌或 `ipVersion` 非法时返回配置错误
    pub fn parse(uri: &str) -> Result<Self, ProbeError> {
        let url = Url::parse(uri)
            .map_err(|e| ProbeError::config(format!("检测代理URI无效: {e}")))?;

        if url.scheme() != GLOBALPING_SCHEME {
            return Err(ProbeError::config(format!(
                "Globalping检测代理协议错误，实际收到: {}:",
                url.scheme()
            )));
        }

        let token = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ProbeError::config("Globalping检测代理缺少访问令牌"))?
            .to_string();

        let mut magic = None;
        let mut ip_version = 4;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "magic" => magic = Some(value.into_owned()),
                "ipVersion" => {
                    ip_version = match value.as_ref() {
                        "" | "4" => 4,
                        "6" => 6,
                        other => {
                            return Err(ProbeError::config(format!(
                                "ipVersion 仅支持 4 或 6，实际收到: {other}"
                            )))
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            token,
            magic,
            ip_version,
        })
    }
}
