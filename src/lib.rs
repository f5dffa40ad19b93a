//! Flare Profile Service
//!
//! 动态服务调用层（服务发现、端点集合、负载均衡、重试）以及基于它的 CRUD 档案服务。
//!
//! 调用链：Instancer → Endpointer → Balancer → Retry → 调用方。

pub mod balancer;
pub mod client;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod retry;
pub mod service;
pub mod telemetry;
pub mod transport;
pub(crate) mod utils;

// Re-exports
pub use balancer::{Balancer, Random, RoundRobin};
pub use client::ProfileClient;
pub use config::{BackoffKind, ClientConfig, Config, LogConfig, ServerConfig, ServiceConfig};
pub use discovery::{
    BackendType, DiscoveryBackend, DiscoveryConfig, DiscoveryFactory, EndpointSet, EndpointSource,
    Endpointer, EndpointerOptions, Factory, InstanceEvent, Instancer, InstancerOptions,
    LoadBalanceStrategy, MemoryBackend, ServiceInstance,
};
pub use endpoint::{BoxEndpoint, CallContext, Endpoint};
pub use error::{ErrorBuilder, ErrorCategory, ErrorCode, FlareError, Result, RetryLimit};
pub use retry::{ExponentialBackoffPolicy, FixedRetryPolicy, Retry, RetryPolicy};
pub use service::{InMemoryProfileService, Profile, ProfileRequest, ProfileResponse, ProfileService};
