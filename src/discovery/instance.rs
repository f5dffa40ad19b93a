//! 服务实例定义

use serde::{Deserialize, Serialize};

/// 注册中心中的服务实例
///
/// 调用层只关心 `address`，标签和健康状态用于实例过滤。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInstance {
    /// 逻辑服务名
    pub service_name: String,

    /// 实例 ID（唯一标识）
    pub instance_id: String,

    /// 实例地址（`host:port` 或完整 URL）
    pub address: String,

    /// 标签
    #[serde(default)]
    pub tags: Vec<String>,

    /// 是否健康
    #[serde(default = "default_healthy")]
    pub healthy: bool,
}

fn default_healthy() -> bool {
    true
}

impl ServiceInstance {
    pub fn new(
        service_name: impl Into<String>,
        instance_id: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            instance_id: instance_id.into(),
            address: address.into(),
            tags: Vec::new(),
            healthy: true,
        }
    }

    /// 添加标签
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// 设置健康状态
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// 是否包含全部要求的标签
    pub fn matches_tags(&self, required: &[String]) -> bool {
        required.iter().all(|tag| self.tags.contains(tag))
    }
}
