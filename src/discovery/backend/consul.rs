//! Consul 服务发现后端

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{notification_channel, notify, DiscoveryBackend};
use crate::discovery::config::DiscoveryConfig;
use crate::discovery::instance::ServiceInstance;
use crate::error::{FlareError, Result};

const DEFAULT_CONSUL_URL: &str = "http://localhost:8500";
const BLOCKING_WAIT: &str = "30s";

#[derive(Debug, Deserialize)]
struct HealthEntry {
    #[serde(rename = "Node")]
    node: NodeEntry,
    #[serde(rename = "Service")]
    service: ServiceEntry,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    #[serde(rename = "Address", default)]
    address: String,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Service", default)]
    service: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port", default)]
    port: u16,
    #[serde(rename = "Tags", default)]
    tags: Option<Vec<String>>,
}

impl HealthEntry {
    fn into_instance(self) -> ServiceInstance {
        // 服务未声明地址时使用节点地址
        let host = if self.service.address.is_empty() {
            self.node.address
        } else {
            self.service.address
        };
        let address = format!("{}:{}", host, self.service.port);
        let instance_id = if self.service.id.is_empty() {
            address.clone()
        } else {
            self.service.id
        };
        ServiceInstance {
            service_name: self.service.service,
            instance_id,
            address,
            tags: self.service.tags.unwrap_or_default(),
            healthy: true,
        }
    }
}

/// Consul 服务发现后端
///
/// 查询 `/v1/health/service/{name}?passing`，只返回通过健康检查的实例。
/// watch 使用 Consul 阻塞查询（`index` + `wait`）。
#[derive(Debug, Clone)]
pub struct ConsulBackend {
    http_client: HttpClient,
    consul_url: String,
    retry_interval: Duration,
}

impl ConsulBackend {
    pub fn new(consul_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            consul_url: consul_url.into().trim_end_matches('/').to_string(),
            retry_interval: Duration::from_secs(1),
        }
    }

    /// 从配置创建，使用 `endpoints` 中的第一个地址
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        let url = config
            .endpoints
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONSUL_URL.to_string());
        let mut backend = Self::new(url);
        backend.retry_interval = Duration::from_secs(config.retry_interval_secs.max(1));
        backend
    }

    /// 执行一次健康查询，返回实例和 Consul 索引
    async fn query(
        &self,
        service_name: &str,
        tag: Option<&str>,
        index: Option<u64>,
    ) -> Result<(Vec<ServiceInstance>, Option<u64>)> {
        let url = format!("{}/v1/health/service/{}", self.consul_url, service_name);
        let mut query: Vec<(&str, String)> = vec![("passing", "true".to_string())];
        if let Some(tag) = tag {
            query.push(("tag", tag.to_string()));
        }
        if let Some(index) = index {
            query.push(("index", index.to_string()));
            query.push(("wait", BLOCKING_WAIT.to_string()));
        }

        let resp = self
            .http_client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| FlareError::registry_lookup(service_name, e))?;

        if !resp.status().is_success() {
            return Err(FlareError::registry_lookup(
                service_name,
                format!("consul returned {}", resp.status()),
            ));
        }

        let consul_index = resp
            .headers()
            .get("X-Consul-Index")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let entries: Vec<HealthEntry> = resp
            .json()
            .await
            .map_err(|e| FlareError::registry_lookup(service_name, e))?;

        Ok((
            entries.into_iter().map(HealthEntry::into_instance).collect(),
            consul_index,
        ))
    }
}

#[async_trait]
impl DiscoveryBackend for ConsulBackend {
    async fn discover(&self, service_name: &str, tags: &[String]) -> Result<Vec<ServiceInstance>> {
        // Consul 只支持按一个标签过滤，其余标签在本地过滤
        let (instances, _) = self
            .query(service_name, tags.first().map(String::as_str), None)
            .await?;
        Ok(instances
            .into_iter()
            .filter(|instance| instance.matches_tags(tags))
            .collect())
    }

    async fn watch(&self, service_name: &str) -> Result<mpsc::Receiver<()>> {
        let (tx, rx) = notification_channel();
        let backend = self.clone();
        let service_name = service_name.to_string();

        tokio::spawn(async move {
            let mut index = 0u64;
            loop {
                let result = tokio::select! {
                    _ = tx.closed() => break,
                    result = backend.query(&service_name, None, Some(index)) => result,
                };
                match result {
                    Ok((_, Some(new_index))) if new_index != index => {
                        // 索引回退时重置，避免阻塞查询永久挂起
                        index = if new_index < index { 0 } else { new_index };
                        debug!(service = %service_name, index, "consul index changed");
                        if !notify(&tx) {
                            break;
                        }
                    }
                    Ok((_, Some(_))) => {}
                    Ok((_, None)) => {
                        // 没有索引头时无法阻塞查询，按重试间隔轮询
                        tokio::select! {
                            _ = tx.closed() => break,
                            _ = tokio::time::sleep(backend.retry_interval) => {}
                        }
                        if !notify(&tx) {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(service = %service_name, error = %e, "consul watch failed");
                        if !notify(&tx) {
                            break;
                        }
                        tokio::select! {
                            _ = tx.closed() => break,
                            _ = tokio::time::sleep(backend.retry_interval) => {}
                        }
                    }
                }
            }
            debug!(service = %service_name, "consul watch stopped");
        });

        Ok(rx)
    }
}
