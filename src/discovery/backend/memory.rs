//! 进程内注册中心
//!
//! 用于静态地址配置和测试，所有修改都会通知正在监听的 Instancer。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::{notification_channel, notify, DiscoveryBackend};
use crate::discovery::instance::ServiceInstance;
use crate::error::Result;
use crate::utils::lock;

#[derive(Default)]
struct Registry {
    services: HashMap<String, Vec<ServiceInstance>>,
    watchers: HashMap<String, Vec<mpsc::Sender<()>>>,
}

impl Registry {
    fn notify_watchers(&mut self, service_name: &str) {
        if let Some(watchers) = self.watchers.get_mut(service_name) {
            watchers.retain(notify);
        }
    }
}

/// 内存注册中心后端
///
/// 克隆出的句柄共享同一份注册表。
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Registry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册实例；相同 `instance_id` 的实例会被替换
    pub fn register(&self, instance: ServiceInstance) {
        let mut registry = lock(&self.inner);
        let service_name = instance.service_name.clone();
        debug!(service = %service_name, instance = %instance.instance_id, "registering instance");
        let instances = registry.services.entry(service_name.clone()).or_default();
        instances.retain(|existing| existing.instance_id != instance.instance_id);
        instances.push(instance);
        registry.notify_watchers(&service_name);
    }

    /// 注销实例，返回是否存在该实例
    pub fn deregister(&self, service_name: &str, instance_id: &str) -> bool {
        let mut registry = lock(&self.inner);
        let removed = match registry.services.get_mut(service_name) {
            Some(instances) => {
                let before = instances.len();
                instances.retain(|existing| existing.instance_id != instance_id);
                instances.len() != before
            }
            None => false,
        };
        if removed {
            debug!(service = %service_name, instance = %instance_id, "deregistered instance");
            registry.notify_watchers(service_name);
        }
        removed
    }

    /// 整体替换某个服务的实例列表
    pub fn set_instances(&self, service_name: &str, instances: Vec<ServiceInstance>) {
        let mut registry = lock(&self.inner);
        registry.services.insert(service_name.to_string(), instances);
        registry.notify_watchers(service_name);
    }

    /// 以地址列表整体替换实例，实例 ID 取地址本身
    pub fn set_addresses<I, S>(&self, service_name: &str, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let instances = addresses
            .into_iter()
            .map(|address| {
                let address = address.into();
                ServiceInstance::new(service_name, address.clone(), address)
            })
            .collect();
        self.set_instances(service_name, instances);
    }
}

#[async_trait]
impl DiscoveryBackend for MemoryBackend {
    async fn discover(&self, service_name: &str, _tags: &[String]) -> Result<Vec<ServiceInstance>> {
        let registry = lock(&self.inner);
        Ok(registry
            .services
            .get(service_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn watch(&self, service_name: &str) -> Result<mpsc::Receiver<()>> {
        let (tx, rx) = notification_channel();
        lock(&self.inner)
            .watchers
            .entry(service_name.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
