//! 档案服务装饰器
//!
//! 日志和指标装饰器只观察调用（方法名、耗时、是否失败），不改变结果，
//! 可以任意顺序嵌套：
//!
//! ```rust
//! use std::sync::Arc;
//! use tower::Layer;
//! use flare_profilesvc::metrics::RequestMetrics;
//! use flare_profilesvc::service::{InMemoryProfileService, InstrumentingLayer, LoggingLayer};
//!
//! # fn example() -> flare_profilesvc::Result<()> {
//! let metrics = RequestMetrics::new("api", "profilesvc")?;
//! let service = InMemoryProfileService::new();
//! let service = LoggingLayer.layer(service);
//! let service = Arc::new(InstrumentingLayer::new(metrics).layer(service));
//! # let _ = service;
//! # Ok(())
//! # }
//! ```

use std::time::Instant;

use async_trait::async_trait;
use tower::Layer;
use tracing::{info, warn};

use super::profile::Profile;
use super::store::ProfileService;
use crate::endpoint::CallContext;
use crate::error::Result;
use crate::metrics::RequestMetrics;

/// 日志装饰器层
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer;

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService { inner }
    }
}

/// 每次调用输出一条日志：成功为 info，失败为 warn
#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
}

fn log_call<T>(method: &str, id: &str, begin: Instant, result: &Result<T>) {
    let took_ms = begin.elapsed().as_millis() as u64;
    match result {
        Ok(_) => info!(method, id, took_ms, "profile call"),
        Err(e) => warn!(method, id, took_ms, err = %e, "profile call failed"),
    }
}

#[async_trait]
impl<S: ProfileService> ProfileService for LoggingService<S> {
    async fn post_profile(&self, ctx: &CallContext, profile: Profile) -> Result<()> {
        let begin = Instant::now();
        let id = profile.id.clone();
        let result = self.inner.post_profile(ctx, profile).await;
        log_call("post_profile", &id, begin, &result);
        result
    }

    async fn get_profile(&self, ctx: &CallContext, id: &str) -> Result<Profile> {
        let begin = Instant::now();
        let result = self.inner.get_profile(ctx, id).await;
        log_call("get_profile", id, begin, &result);
        result
    }

    async fn put_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()> {
        let begin = Instant::now();
        let result = self.inner.put_profile(ctx, id, profile).await;
        log_call("put_profile", id, begin, &result);
        result
    }

    async fn delete_profile(&self, ctx: &CallContext, id: &str) -> Result<()> {
        let begin = Instant::now();
        let result = self.inner.delete_profile(ctx, id).await;
        log_call("delete_profile", id, begin, &result);
        result
    }
}

/// 指标装饰器层
#[derive(Clone)]
pub struct InstrumentingLayer {
    metrics: RequestMetrics,
}

impl InstrumentingLayer {
    pub fn new(metrics: RequestMetrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for InstrumentingLayer {
    type Service = InstrumentingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentingService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

/// 每次调用记录请求数和耗时
#[derive(Clone)]
pub struct InstrumentingService<S> {
    inner: S,
    metrics: RequestMetrics,
}

impl<S> InstrumentingService<S> {
    fn record<T>(&self, method: &str, begin: Instant, result: &Result<T>) {
        self.metrics
            .observe(method, result.is_err(), begin.elapsed());
    }
}

#[async_trait]
impl<S: ProfileService> ProfileService for InstrumentingService<S> {
    async fn post_profile(&self, ctx: &CallContext, profile: Profile) -> Result<()> {
        let begin = Instant::now();
        let result = self.inner.post_profile(ctx, profile).await;
        self.record("post_profile", begin, &result);
        result
    }

    async fn get_profile(&self, ctx: &CallContext, id: &str) -> Result<Profile> {
        let begin = Instant::now();
        let result = self.inner.get_profile(ctx, id).await;
        self.record("get_profile", begin, &result);
        result
    }

    async fn put_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()> {
        let begin = Instant::now();
        let result = self.inner.put_profile(ctx, id, profile).await;
        self.record("put_profile", begin, &result);
        result
    }

    async fn delete_profile(&self, ctx: &CallContext, id: &str) -> Result<()> {
        let begin = Instant::now();
        let result = self.inner.delete_profile(ctx, id).await;
        self.record("delete_profile", begin, &result);
        result
    }
}
