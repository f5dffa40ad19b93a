//! 服务发现工厂
//!
//! 根据配置构建注册中心后端和 Instancer。

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::discovery::backend::{ConsulBackend, DiscoveryBackend, DnsBackend, MemoryBackend};
use crate::discovery::config::{BackendType, DiscoveryConfig};
use crate::discovery::instancer::{Instancer, InstancerOptions};
use crate::error::Result;

/// 服务发现工厂
pub struct DiscoveryFactory;

impl DiscoveryFactory {
    /// 从配置创建注册中心后端
    ///
    /// `static` 后端是预先填入 `addresses` 的内存注册中心。
    pub fn create_backend(config: &DiscoveryConfig) -> Result<Arc<dyn DiscoveryBackend>> {
        let backend: Arc<dyn DiscoveryBackend> = match config.backend {
            BackendType::Static => {
                let backend = MemoryBackend::new();
                backend.set_addresses(&config.service_name, config.addresses.iter().cloned());
                Arc::new(backend)
            }
            BackendType::Dns => Arc::new(DnsBackend::from_config(config)?),
            BackendType::Consul => Arc::new(ConsulBackend::from_config(config)),
        };
        info!(
            backend = ?config.backend,
            service = %config.service_name,
            "✅ Discovery backend created"
        );
        Ok(backend)
    }

    /// 从配置创建并启动 Instancer
    pub async fn create_instancer(config: &DiscoveryConfig) -> Result<Instancer> {
        let backend = Self::create_backend(config)?;
        Ok(Instancer::start(
            backend,
            config.service_name.clone(),
            config.tags.clone(),
            InstancerOptions {
                retry_interval: Duration::from_secs(config.retry_interval_secs.max(1)),
            },
        )
        .await)
    }
}
