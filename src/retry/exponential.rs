use super::RetryPolicy;
use std::time::Duration;

/// 指数退避重试策略
///
/// 第 n 次失败后等待 `base_delay * 2^(n-1)`，不超过 `max_delay`。
#[derive(Debug, Clone)]
pub struct ExponentialBackoffPolicy {
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }
}

impl RetryPolicy for ExponentialBackoffPolicy {
    fn backoff_duration(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(10) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}
