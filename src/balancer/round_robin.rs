use std::sync::atomic::{AtomicUsize, Ordering};

use super::Balancer;
use crate::discovery::EndpointSource;
use crate::endpoint::BoxEndpoint;
use crate::error::{FlareError, Result};

/// 轮询负载均衡器
///
/// 每次调用游标原子地前进一次，按快照顺序依次返回端点。
/// 集合大小变化时游标对新的大小取模，不保证跨越变化的公平性。
pub struct RoundRobin<S> {
    source: S,
    cursor: AtomicUsize,
}

impl<S> RoundRobin<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl<Req, Resp, S> Balancer<Req, Resp> for RoundRobin<S>
where
    S: EndpointSource<Req, Resp>,
{
    fn endpoint(&self) -> Result<BoxEndpoint<Req, Resp>> {
        let set = self.source.snapshot();
        if set.is_empty() {
            return Err(FlareError::no_endpoints());
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        set.get(index % set.len())
            .cloned()
            .ok_or_else(FlareError::no_endpoints)
    }
}
