use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tower::Layer;
use tracing::{debug, warn};

use crate::endpoint::{CallContext, Endpoint};
use crate::error::Result;

/// 端点日志中间件层
///
/// 每次调用记录一条日志，不改变调用结果。
#[derive(Debug, Clone)]
pub struct EndpointLoggingLayer {
    name: Arc<str>,
}

impl EndpointLoggingLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
        }
    }
}

impl<E> Layer<E> for EndpointLoggingLayer {
    type Service = LoggingEndpoint<E>;

    fn layer(&self, inner: E) -> Self::Service {
        LoggingEndpoint {
            inner,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingEndpoint<E> {
    inner: E,
    name: Arc<str>,
}

#[async_trait]
impl<Req, Resp, E> Endpoint<Req, Resp> for LoggingEndpoint<E>
where
    E: Endpoint<Req, Resp>,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: CallContext, req: Req) -> Result<Resp> {
        let begin = Instant::now();
        let result = self.inner.call(ctx, req).await;
        let took_ms = begin.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(endpoint = %self.name, took_ms, "endpoint call succeeded"),
            Err(e) => warn!(endpoint = %self.name, took_ms, error = %e, "endpoint call failed"),
        }
        result
    }
}
