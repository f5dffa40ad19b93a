use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Balancer;
use crate::discovery::EndpointSource;
use crate::endpoint::BoxEndpoint;
use crate::error::{FlareError, Result};
use crate::utils::lock;

/// 随机负载均衡器，均匀地选择端点
pub struct Random<S> {
    source: S,
    rng: Mutex<StdRng>,
}

impl<S> Random<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// 使用固定种子，选择序列可复现
    pub fn with_seed(source: S, seed: u64) -> Self {
        Self {
            source,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<Req, Resp, S> Balancer<Req, Resp> for Random<S>
where
    S: EndpointSource<Req, Resp>,
{
    fn endpoint(&self) -> Result<BoxEndpoint<Req, Resp>> {
        let set = self.source.snapshot();
        if set.is_empty() {
            return Err(FlareError::no_endpoints());
        }
        let index = lock(&self.rng).gen_range(0..set.len());
        set.get(index).cloned().ok_or_else(FlareError::no_endpoints)
    }
}
