//! 负载均衡模块
//!
//! 负载均衡器从端点集合快照中为每次调用选择一个端点。
//! 集合为空时立即返回 `no endpoints available`，不会阻塞等待。

pub mod random;
pub mod round_robin;

pub use random::Random;
pub use round_robin::RoundRobin;

use std::sync::Arc;

use crate::discovery::{EndpointSource, LoadBalanceStrategy};
use crate::endpoint::BoxEndpoint;
use crate::error::Result;

/// 负载均衡器 trait，可被多个调用方并发使用
pub trait Balancer<Req, Resp>: Send + Sync {
    fn endpoint(&self) -> Result<BoxEndpoint<Req, Resp>>;
}

impl<Req, Resp, B> Balancer<Req, Resp> for Arc<B>
where
    B: Balancer<Req, Resp> + ?Sized,
{
    fn endpoint(&self) -> Result<BoxEndpoint<Req, Resp>> {
        (**self).endpoint()
    }
}

/// 按策略构建负载均衡器
pub fn build<Req, Resp, S>(strategy: LoadBalanceStrategy, source: S) -> Arc<dyn Balancer<Req, Resp>>
where
    Req: 'static,
    Resp: 'static,
    S: EndpointSource<Req, Resp> + 'static,
{
    match strategy {
        LoadBalanceStrategy::RoundRobin => Arc::new(RoundRobin::new(source)),
        LoadBalanceStrategy::Random => Arc::new(Random::new(source)),
    }
}
