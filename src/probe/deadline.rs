//! 截止时间预算
//!
//! 每次探测在开始时创建一个 [`Deadline`]，之后所有可能挂起的调用都以它为界

use std::future::Future;
use std::time::Duration;
use tokio::time::{error::Elapsed, timeout_at, Instant};

/// 一次探测的截止时间
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started_at: Instant,
    expires_at: Instant,
    budget: Duration,
}

impl Deadline {
    /// 从当前时刻起，给定预算后到期
    pub fn after(budget: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            started_at,
            expires_at: started_at + budget,
            budget,
        }
    }

    /// 总预算
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// 总预算（毫秒）
    pub fn budget_ms(&self) -> u64 {
        self.budget.as_millis() as u64
    }

    /// 已经过的时间
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 剩余时间，到期后为零
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// 是否已到期
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// 在截止时间内运行future，到期则放弃并返回 `Elapsed`
    pub async fn run<F>(&self, future: F) -> Result<F::Output, Elapsed>
    where
        F: Future,
    {
        timeout_at(self.expires_at, future).await
    }
}
