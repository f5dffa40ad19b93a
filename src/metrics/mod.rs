//! 指标收集模块
//!
//! 请求计数和请求耗时两个 Prometheus 指标，按 `method` 和 `error` 标签区分。

use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::{ErrorCode, InfraResultExt, Result};

/// 请求指标
#[derive(Clone)]
pub struct RequestMetrics {
    request_count: IntCounterVec,
    request_latency: HistogramVec,
}

impl RequestMetrics {
    /// 创建指标，名称为 `{namespace}_{subsystem}_request_count` 和
    /// `{namespace}_{subsystem}_request_latency_seconds`
    pub fn new(namespace: &str, subsystem: &str) -> Result<Self> {
        let request_count = IntCounterVec::new(
            Opts::new("request_count", "Number of requests received.")
                .namespace(namespace)
                .subsystem(subsystem),
            &["method", "error"],
        )
        .into_flare(ErrorCode::InternalError, "invalid request_count metric")?;

        let request_latency = HistogramVec::new(
            HistogramOpts::new(
                "request_latency_seconds",
                "Total duration of requests in seconds.",
            )
            .namespace(namespace)
            .subsystem(subsystem),
            &["method", "error"],
        )
        .into_flare(ErrorCode::InternalError, "invalid request_latency metric")?;

        Ok(Self {
            request_count,
            request_latency,
        })
    }

    /// 注册到调用方提供的 Registry
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry
            .register(Box::new(self.request_count.clone()))
            .into_flare(ErrorCode::InternalError, "failed to register request_count")?;
        registry
            .register(Box::new(self.request_latency.clone()))
            .into_flare(ErrorCode::InternalError, "failed to register request_latency")?;
        Ok(())
    }

    /// 记录一次请求
    pub fn observe(&self, method: &str, failed: bool, elapsed: Duration) {
        let error = if failed { "true" } else { "false" };
        self.request_count
            .with_label_values(&[method, error])
            .inc();
        self.request_latency
            .with_label_values(&[method, error])
            .observe(elapsed.as_secs_f64());
    }

    /// 某个方法和结果组合的请求数
    pub fn count(&self, method: &str, failed: bool) -> u64 {
        let error = if failed { "true" } else { "false" };
        self.request_count.with_label_values(&[method, error]).get()
    }

    /// 某个方法和结果组合的耗时样本数
    pub fn latency_samples(&self, method: &str, failed: bool) -> u64 {
        let error = if failed { "true" } else { "false" };
        self.request_latency
            .with_label_values(&[method, error])
            .get_sample_count()
    }
}

/// 以 Prometheus 文本格式输出 Registry 中的全部指标
pub fn render(registry: &Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .into_flare(ErrorCode::SerializationError, "failed to encode metrics")?;
    String::from_utf8(buffer).into_flare(ErrorCode::SerializationError, "metrics are not utf-8")
}
