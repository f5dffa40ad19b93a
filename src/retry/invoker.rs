use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ImmediateRetryPolicy, RetryPolicy};
use crate::balancer::Balancer;
use crate::endpoint::{CallContext, Endpoint};
use crate::error::{FlareError, Result, RetryLimit};

/// 重试回调：参数为已尝试次数和本次失败，返回 `false` 时停止重试并原样返回该错误
pub type RetryCallback = Arc<dyn Fn(usize, &FlareError) -> bool + Send + Sync>;

/// 重试调用器
///
/// 对外仍是一个端点。每次调用独立计算截止时间（调用开始时间 + `timeout`）
/// 和尝试次数，不同调用之间没有共享的重试状态。
///
/// - 每次尝试从负载均衡器重新选择端点；负载均衡器失败也计为一次尝试
/// - 每次尝试的上下文受剩余时间约束，截止时间到达时正在进行的尝试被取消
/// - 截止时间已过时不再发起新的尝试，即使还有剩余次数
/// - 不可重试的错误（如存储契约错误）立即原样返回
pub struct Retry<B> {
    max_attempts: usize,
    timeout: Duration,
    balancer: B,
    policy: Arc<dyn RetryPolicy>,
    callback: Option<RetryCallback>,
}

impl<B> Retry<B> {
    /// `max_attempts` 至少为 1
    pub fn new(max_attempts: usize, timeout: Duration, balancer: B) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
            balancer,
            policy: Arc::new(ImmediateRetryPolicy),
            callback: None,
        }
    }

    /// 设置重试策略（可重试判断和退避）
    pub fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// 设置重试回调
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, &FlareError) -> bool + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn keep_trying(&self, attempt: usize, err: &FlareError) -> bool {
        self.policy.should_retry(attempt, err)
            && self
                .callback
                .as_ref()
                .map(|callback| callback(attempt, err))
                .unwrap_or(true)
    }
}

#[async_trait]
impl<Req, Resp, B> Endpoint<Req, Resp> for Retry<B>
where
    B: Balancer<Req, Resp>,
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: CallContext, req: Req) -> Result<Resp> {
        let ctx = ctx.child_with_timeout(self.timeout);
        let mut attempts = 0usize;
        let mut last: Option<FlareError> = None;

        loop {
            if ctx.is_cancelled() {
                return Err(FlareError::cancelled());
            }
            if ctx.is_expired() {
                return Err(FlareError::exhausted(RetryLimit::Deadline, attempts, last));
            }
            if attempts >= self.max_attempts {
                return Err(FlareError::exhausted(RetryLimit::Attempts, attempts, last));
            }

            attempts += 1;
            let result = match self.balancer.endpoint() {
                Ok(endpoint) => ctx.run(endpoint.call(ctx.clone(), req.clone())).await,
                Err(e) => Err(e),
            };

            let err = match result {
                Ok(resp) => {
                    if attempts > 1 {
                        debug!(attempt = attempts, "call succeeded after retry");
                    }
                    return Ok(resp);
                }
                Err(e) => e,
            };

            if ctx.is_cancelled() {
                return Err(FlareError::cancelled());
            }
            if !self.keep_trying(attempts, &err) {
                debug!(attempt = attempts, error = %err, "call failed with terminal error");
                return Err(err);
            }
            warn!(
                attempt = attempts,
                max_attempts = self.max_attempts,
                error = %err,
                "⚠️ Call attempt failed"
            );
            last = Some(err);

            if attempts < self.max_attempts {
                let backoff = self.policy.backoff_duration(attempts);
                if !backoff.is_zero() {
                    let waited = ctx
                        .run(async {
                            tokio::time::sleep(backoff).await;
                            Ok(())
                        })
                        .await;
                    if let Err(e) = waited {
                        if e.is_cancelled() {
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}
