//! DNS 服务发现后端

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{notification_channel, notify, DiscoveryBackend};
use crate::discovery::config::DiscoveryConfig;
use crate::discovery::instance::ServiceInstance;
use crate::error::{FlareError, Result};

/// DNS 服务发现后端
///
/// 将配置的 `host:port` 名称解析为实例地址。DNS 没有推送机制，
/// 因此 watch 以固定间隔重新解析，结果变化时发出通知。
#[derive(Debug, Clone)]
pub struct DnsBackend {
    names: Vec<String>,
    refresh_interval: Duration,
}

impl DnsBackend {
    pub fn new(names: Vec<String>, refresh_interval: Duration) -> Self {
        Self {
            names,
            refresh_interval,
        }
    }

    /// 从配置创建，解析 `addresses` 中的名称
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        if config.addresses.is_empty() {
            return Err(FlareError::configuration(
                "dns discovery requires at least one address",
            ));
        }
        Ok(Self::new(
            config.addresses.clone(),
            Duration::from_secs(config.refresh_interval_secs.max(1)),
        ))
    }

    async fn resolve(&self, service_name: &str) -> Result<BTreeSet<String>> {
        let mut resolved = BTreeSet::new();
        for name in &self.names {
            let addrs = tokio::net::lookup_host(name.as_str())
                .await
                .map_err(|e| FlareError::registry_lookup(service_name, format!("{}: {}", name, e)))?;
            resolved.extend(addrs.map(|addr| addr.to_string()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl DiscoveryBackend for DnsBackend {
    async fn discover(&self, service_name: &str, _tags: &[String]) -> Result<Vec<ServiceInstance>> {
        let resolved = self.resolve(service_name).await?;
        Ok(resolved
            .into_iter()
            .map(|address| ServiceInstance::new(service_name, address.clone(), address))
            .collect())
    }

    async fn watch(&self, service_name: &str) -> Result<mpsc::Receiver<()>> {
        let (tx, rx) = notification_channel();
        let backend = self.clone();
        let service_name = service_name.to_string();

        tokio::spawn(async move {
            let mut last = backend.resolve(&service_name).await.ok();
            let mut interval = tokio::time::interval(backend.refresh_interval);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = interval.tick() => {}
                }
                match backend.resolve(&service_name).await {
                    Ok(current) => {
                        if last.as_ref() != Some(&current) {
                            debug!(service = %service_name, count = current.len(), "dns records changed");
                            last = Some(current);
                            if !notify(&tx) {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(service = %service_name, error = %e, "dns refresh failed");
                        last = None;
                        if !notify(&tx) {
                            break;
                        }
                    }
                }
            }
            debug!(service = %service_name, "dns watch stopped");
        });

        Ok(rx)
    }
}
