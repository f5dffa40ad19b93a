//! 调用上下文
//!
//! 携带取消信号和截止时间，在调用链中逐层向下传递。

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{FlareError, Result};

/// 调用上下文
///
/// 子上下文继承父上下文的取消信号，截止时间取父子中较早者。
/// 取消子上下文不会影响父上下文。
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// 创建没有截止时间的根上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带超时的根上下文
    ///
    /// 超时大到无法表示为时间点（如 `Duration::MAX`）时视为没有截止时间。
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// 使用外部取消信号创建根上下文
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// 派生子上下文
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// 派生带截止时间的子上下文
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// 派生截止时间为当前时间加 `timeout` 的子上下文
    ///
    /// 超时无法表示为时间点时沿用父上下文的截止时间。
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.child_with_deadline(deadline),
            None => self.child(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 距离截止时间的剩余时间，已过期时为零
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// 在上下文约束下执行 future
    ///
    /// 取消或到达截止时间时，future 被丢弃并返回对应错误。
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FlareError::cancelled()),
            _ = sleep_until(self.deadline) => {
                Err(FlareError::deadline_exceeded("context deadline exceeded"))
            }
            result = fut => result,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
