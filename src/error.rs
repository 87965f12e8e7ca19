//! 错误处理模块
//!
//! 定义应用程序的统一错误类型，以及探测过程中各组件使用的分类错误

use std::error::Error as StdError;
use thiserror::Error;

/// Uptime Probe 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP客户端初始化错误
    #[error("HTTP客户端错误: {0}")]
    Client(#[from] reqwest::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 单次探测中可能出现的错误
///
/// 所有变体最终都会在产生它的组件边界上被转换为 [`ProbeResult`](crate::probe::ProbeResult)，
/// 不会传播给调用方。
#[derive(Error, Debug)]
pub enum ProbeError {
    /// 监控目标或代理配置不合法，本次检测直接终止
    #[error("{0}")]
    Configuration(String),

    /// 连接被拒绝、重置、DNS解析失败等传输层错误
    #[error("{name}: {message}")]
    Transport { name: String, message: String },

    /// 本地检测超过了配置的超时时间
    #[error("超时 ({0}ms)")]
    Timeout(u64),

    /// 远程测量结果轮询超过总预算
    #[error("API轮询超时 ({0}ms)")]
    PollTimeout(u64),

    /// 远程服务返回了非预期的响应
    #[error("{0}")]
    Protocol(String),

    /// 响应校验未通过
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// HTTPS证书不受信任（仅远程检测可感知）
    #[error("TLS证书不受信任: {0}")]
    Trust(String),
}

impl ProbeError {
    /// 构造配置错误
    pub fn config(message: impl Into<String>) -> Self {
        ProbeError::Configuration(message.into())
    }

    /// 构造协议错误
    pub fn protocol(message: impl Into<String>) -> Self {
        ProbeError::Protocol(message.into())
    }

    /// 是否属于超时类错误（本地超时、轮询超时或请求级超时）
    pub fn is_timeout(&self) -> bool {
        match self {
            ProbeError::Timeout(_) | ProbeError::PollTimeout(_) => true,
            ProbeError::Transport { name, .. } => name == TIMEOUT_ERROR_NAME,
            _ => false,
        }
    }

    /// 将IO错误转换为传输错误，保留错误种类名称
    pub fn from_io(error: &std::io::Error) -> Self {
        ProbeError::Transport {
            name: format!("{:?}", error.kind()),
            message: error.to_string(),
        }
    }

    /// 将reqwest错误转换为传输错误
    ///
    /// 名称取自错误的分类，消息附带最底层的错误原因，便于排查
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        let name = if error.is_timeout() {
            TIMEOUT_ERROR_NAME
        } else if error.is_connect() {
            "ConnectError"
        } else if error.is_redirect() {
            "RedirectError"
        } else if error.is_body() {
            "BodyError"
        } else if error.is_decode() {
            "DecodeError"
        } else if error.is_builder() {
            "BuilderError"
        } else if error.is_request() {
            "RequestError"
        } else {
            "HttpError"
        };

        let mut message = error.to_string();
        if let Some(root) = root_cause(error) {
            let root = root.to_string();
            if !message.contains(&root) {
                message = format!("{message} ({root})");
            }
        }

        ProbeError::Transport {
            name: name.to_string(),
            message,
        }
    }
}

/// 请求级超时使用的错误名称
const TIMEOUT_ERROR_NAME: &str = "TimeoutError";

/// 获取错误链最底层的原因
fn root_cause<'a>(error: &'a (dyn StdError + 'static)) -> Option<&'a (dyn StdError + 'static)> {
    let mut current = error.source()?;
    while let Some(next) = current.source() {
        current = next;
    }
    Some(current)
}

/// HTTP响应校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 状态码不在预期范围内
    #[error("预期状态码: {}, 实际收到: {actual}", describe_expected(.expected))]
    UnexpectedStatus {
        expected: Option<Vec<u16>>,
        actual: u16,
    },

    /// 响应体未包含必需关键词
    #[error("HTTP响应未包含配置的关键词")]
    MissingKeyword,

    /// 响应体包含禁止关键词
    #[error("HTTP响应包含配置的禁止关键词")]
    ForbiddenKeyword,
}

fn describe_expected(expected: &Option<Vec<u16>>) -> String {
    match expected {
        Some(codes) => format!("{codes:?}"),
        None => "2xx 系列".to_string(),
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
