//! HTTP响应校验
//!
//! 本地检测与远程检测共用同一套校验策略：先校验状态码，再按需读取响应体校验关键词

use crate::config::MonitorTarget;
use crate::error::{ProbeError, ValidationError};
use std::future::Future;
use tracing::info;

/// 日志中响应体片段的最大长度（字符）
const BODY_LOG_LIMIT: usize = 100;

/// 校验HTTP响应
///
/// # 参数
/// * `target` - 监控目标配置
/// * `status_code` - 响应状态码
/// * `body_reader` - 响应体读取函数，仅在配置了关键词规则时调用且最多调用一次
///
/// # 返回
/// * `Result<(), ProbeError>` - 校验失败时为 [`ProbeError::Validation`]，读取响应体失败时为读取函数返回的错误
pub async fn validate_response<F, Fut>(
    target: &MonitorTarget,
    status_code: u16,
    body_reader: F,
) -> Result<(), ProbeError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, ProbeError>>,
{
    check_status_code(target, status_code)?;

    if !target.has_keyword_rules() {
        return Ok(());
    }

    let body = body_reader().await?;
    check_keywords(target, &body)?;

    Ok(())
}

/// 校验状态码：配置了期望状态码时必须命中，否则必须为2xx
pub fn check_status_code(target: &MonitorTarget, status_code: u16) -> Result<(), ValidationError> {
    let accepted = match &target.expected_codes {
        Some(codes) => codes.contains(&status_code),
        None => (200..=299).contains(&status_code),
    };

    if accepted {
        Ok(())
    } else {
        Err(ValidationError::UnexpectedStatus {
            expected: target.expected_codes.clone(),
            actual: status_code,
        })
    }
}

/// 校验响应体关键词（包含/禁止包含）
pub fn check_keywords(target: &MonitorTarget, body: &str) -> Result<(), ValidationError> {
    if let Some(keyword) = target.required_keyword() {
        if !body.contains(keyword) {
            info!(
                "{} 预期包含关键词 {}，但响应中未找到（内容截断至{}字符）: {}",
                target.name,
                keyword,
                BODY_LOG_LIMIT,
                truncate_chars(body, BODY_LOG_LIMIT)
            );
            return Err(ValidationError::MissingKeyword);
        }
    }

    if let Some(keyword) = target.forbidden_keyword() {
        if body.contains(keyword) {
            info!(
                "{} 检测到禁止关键词 {}（内容截断至{}字符）: {}",
                target.name,
                keyword,
                BODY_LOG_LIMIT,
                truncate_chars(body, BODY_LOG_LIMIT)
            );
            return Err(ValidationError::ForbiddenKeyword);
        }
    }

    Ok(())
}

/// 按字符数截断字符串
pub(crate) fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
