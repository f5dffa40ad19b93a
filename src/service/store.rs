use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::profile::Profile;
use crate::endpoint::CallContext;
use crate::error::{FlareError, Result};

/// 档案服务契约
///
/// - 创建：ID 已存在时返回 already exists
/// - 读取、删除：ID 不存在时返回 not found
/// - 更新：路径 ID 与档案 ID 不一致时返回 inconsistent IDs，否则创建或覆盖
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn post_profile(&self, ctx: &CallContext, profile: Profile) -> Result<()>;
    async fn get_profile(&self, ctx: &CallContext, id: &str) -> Result<Profile>;
    async fn put_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()>;
    async fn delete_profile(&self, ctx: &CallContext, id: &str) -> Result<()>;
}

#[async_trait]
impl<T> ProfileService for Arc<T>
where
    T: ProfileService + ?Sized,
{
    async fn post_profile(&self, ctx: &CallContext, profile: Profile) -> Result<()> {
        (**self).post_profile(ctx, profile).await
    }

    async fn get_profile(&self, ctx: &CallContext, id: &str) -> Result<Profile> {
        (**self).get_profile(ctx, id).await
    }

    async fn put_profile(&self, ctx: &CallContext, id: &str, profile: Profile) -> Result<()> {
        (**self).put_profile(ctx, id, profile).await
    }

    async fn delete_profile(&self, ctx: &CallContext, id: &str) -> Result<()> {
        (**self).delete_profile(ctx, id).await
    }
}

/// 内存档案存储，读写锁保护：写互斥，读并发
#[derive(Debug, Default)]
pub struct InMemoryProfileService {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl InMemoryProfileService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileService for InMemoryProfileService {
    async fn post_profile(&self, _ctx: &CallContext, profile: Profile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(FlareError::already_exists(profile.id));
        }
        profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn get_profile(&self, _ctx: &CallContext, id: &str) -> Result<Profile> {
        self.profiles
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| FlareError::not_found(id))
    }

    async fn put_profile(&self, _ctx: &CallContext, id: &str, profile: Profile) -> Result<()> {
        if id != profile.id {
            return Err(FlareError::inconsistent_ids(id, profile.id));
        }
        self.profiles.write().await.insert(id.to_string(), profile);
        Ok(())
    }

    async fn delete_profile(&self, _ctx: &CallContext, id: &str) -> Result<()> {
        self.profiles
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FlareError::not_found(id))
    }
}
