use std::time::Duration;

use async_trait::async_trait;
use tower::Layer;

use crate::endpoint::{CallContext, Endpoint};
use crate::error::Result;

/// 超时中间件层
#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<E> Layer<E> for TimeoutLayer {
    type Service = Timeout<E>;

    fn layer(&self, inner: E) -> Self::Service {
        Timeout {
            inner,
            timeout: self.timeout,
        }
    }
}

/// 为每次调用附加截止时间的端点
///
/// 截止时间不会晚于调用方上下文中已有的截止时间；超时后内部调用被取消。
#[derive(Debug, Clone)]
pub struct Timeout<E> {
    inner: E,
    timeout: Duration,
}

#[async_trait]
impl<Req, Resp, E> Endpoint<Req, Resp> for Timeout<E>
where
    E: Endpoint<Req, Resp>,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: CallContext, req: Req) -> Result<Resp> {
        let ctx = ctx.child_with_timeout(self.timeout);
        ctx.run(self.inner.call(ctx.clone(), req)).await
    }
}
