//! 档案服务客户端
//!
//! 只需要逻辑服务名对应的 Instancer 和一个端点工厂：
//! Instancer → Endpointer → 负载均衡器 → 重试，对外实现 [`ProfileService`]。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::balancer::{self, Balancer};
use crate::config::{BackoffKind, ClientConfig};
use crate::discovery::{Endpointer, EndpointerOptions, Factory, Instancer};
use crate::endpoint::{CallContext, Endpoint};
use crate::error::{FlareError, Result};
use crate::retry::{ExponentialBackoffPolicy, FixedRetryPolicy, ImmediateRetryPolicy, Retry};
use crate::service::{Profile, ProfileRequest, ProfileResponse, ProfileService};

/// 具备服务发现、负载均衡和重试能力的档案服务客户端
pub struct ProfileClient {
    endpointer: Arc<Endpointer<ProfileRequest, ProfileResponse>>,
    retry: Retry<Arc<dyn Balancer<ProfileRequest, ProfileResponse>>>,
}

impl ProfileClient {
    /// 需要在 tokio 运行时中调用
    pub fn new(
        instancer: Arc<Instancer>,
        factory: Arc<dyn Factory<ProfileRequest, ProfileResponse>>,
        config: &ClientConfig,
    ) -> Self {
        let endpointer = Arc::new(Endpointer::new(
            instancer,
            factory,
            EndpointerOptions {
                invalidate_on_error: config.invalidate_on_error_secs.map(Duration::from_secs),
            },
        ));
        let balancer = balancer::build(config.load_balance, endpointer.clone());
        let retry = Retry::new(config.max_attempts, config.timeout(), balancer);
        let retry = match config.backoff {
            BackoffKind::None => retry.with_policy(ImmediateRetryPolicy),
            BackoffKind::Fixed => retry.with_policy(FixedRetryPolicy::new(config.backoff_base())),
            BackoffKind::Exponential => retry.with_policy(ExponentialBackoffPolicy::new(
                config.backoff_base(),
                config.backoff_max(),
            )),
        };
        Self { endpointer, retry }
    }

    /// 当前可用的实例地址
    pub fn instances(&self) -> Vec<String> {
        self.endpointer
            .endpoints()
            .instances()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// 释放所有端点资源
    pub fn close(&self) {
        self.endpointer.close();
    }

    async fn invoke(&self, ctx: &CallContext, req: ProfileRequest) -> Result<ProfileResponse> {
        self.retry.call(ctx.child(), req).await
    }
}

fn unexpected(method: &str, resp: ProfileResponse) -> FlareError {
    FlareError::internal(format!("unexpected response to {}: {:?}", method, resp))
}

#[async_trait]
impl ProfileService for ProfileClient {
    async fn post_profile(&self, ctx: &CallContext, profile: Profile) -> Result<()> {
        match self.invoke(ctx, ProfileRequest::Post { profile }).await? {
            ProfileResponse::Posted => Ok(()),
            other => Err(unexpected("post_profile", other)),
        }
    }

    async fn get_profile(&self, ctx: &CallContext, id: &str) -> Result<Profile> {
        let req = ProfileRequest::Get { id: id.to_string() };
        match self.invoke(ctx, req).await? {
            ProfileResponse::Profile(profile) => Ok(profile),
            other => Err(unexpected("get_profile", other)),
        }
    }

    async fn put_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()> {
        let req = ProfileRequest::Put {
            id: id.to_string(),
            profile,
        };
        match self.invoke(ctx, req).await? {
            ProfileResponse::Put => Ok(()),
            other => Err(unexpected("put_profile", other)),
        }
    }

    async fn delete_profile(&self, ctx: &CallContext, id: &str) -> Result<()> {
        let req = ProfileRequest::Delete { id: id.to_string() };
        match self.invoke(ctx, req).await? {
            ProfileResponse::Deleted => Ok(()),
            other => Err(unexpected("delete_profile", other)),
        }
    }
}
