//! 服务端端点
//!
//! 把 [`ProfileService`] 的四个方法表达为同一个端点，
//! 请求和响应以枚举区分方法，便于在端点层统一做负载均衡和重试。

use std::sync::Arc;

use async_trait::async_trait;

use super::profile::Profile;
use super::store::ProfileService;
use crate::endpoint::{CallContext, Endpoint};
use crate::error::Result;

/// 档案请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRequest {
    Post { profile: Profile },
    Get { id: String },
    Put { id: String, profile: Profile },
    Delete { id: String },
}

impl ProfileRequest {
    /// 方法名，用于日志和指标
    pub fn method(&self) -> &'static str {
        match self {
            ProfileRequest::Post { .. } => "post_profile",
            ProfileRequest::Get { .. } => "get_profile",
            ProfileRequest::Put { .. } => "put_profile",
            ProfileRequest::Delete { .. } => "delete_profile",
        }
    }
}

/// 档案响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileResponse {
    Posted,
    Profile(Profile),
    Put,
    Deleted,
}

/// 服务端端点
pub struct ServerEndpoint<S: ?Sized> {
    service: Arc<S>,
}

/// 把档案服务包装为端点
pub fn make_server_endpoint<S>(service: Arc<S>) -> ServerEndpoint<S>
where
    S: ProfileService + ?Sized,
{
    ServerEndpoint { service }
}

#[async_trait]
impl<S> Endpoint<ProfileRequest, ProfileResponse> for ServerEndpoint<S>
where
    S: ProfileService + ?Sized,
{
    async fn call(&self, ctx: CallContext, req: ProfileRequest) -> Result<ProfileResponse> {
        match req {
            ProfileRequest::Post { profile } => {
                self.service.post_profile(&ctx, profile).await?;
                Ok(ProfileResponse::Posted)
            }
            ProfileRequest::Get { id } => {
                let profile = self.service.get_profile(&ctx, &id).await?;
                Ok(ProfileResponse::Profile(profile))
            }
            ProfileRequest::Put { id, profile } => {
                self.service.put_profile(&ctx, &id, profile).await?;
                Ok(ProfileResponse::Put)
            }
            ProfileRequest::Delete { id } => {
                self.service.delete_profile(&ctx, &id).await?;
                Ok(ProfileResponse::Deleted)
            }
        }
    }
}
