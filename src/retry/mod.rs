//! 重试模块
//!
//! [`Retry`] 包装负载均衡器，失败后重新选择端点再次调用，
//! 受最大尝试次数和整体截止时间约束。[`RetryPolicy`] 决定错误是否可重试以及两次尝试之间的退避。

pub mod exponential;
pub mod fixed;
pub mod invoker;

pub use exponential::ExponentialBackoffPolicy;
pub use fixed::FixedRetryPolicy;
pub use invoker::{Retry, RetryCallback};

use std::time::Duration;

use crate::error::FlareError;

/// 重试策略 trait
pub trait RetryPolicy: Send + Sync {
    /// 第 `attempt` 次尝试（从 1 开始）失败后是否继续
    fn should_retry(&self, _attempt: usize, error: &FlareError) -> bool {
        error.is_transient()
    }

    /// 第 `attempt` 次尝试失败后的等待时间
    fn backoff_duration(&self, attempt: usize) -> Duration;
}

/// 立即重试，不等待
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateRetryPolicy;

impl RetryPolicy for ImmediateRetryPolicy {
    fn backoff_duration(&self, _attempt: usize) -> Duration {
        Duration::ZERO
    }
}
