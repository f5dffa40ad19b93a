//! 服务发现配置

use serde::{Deserialize, Serialize};

/// 服务发现配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// 后端类型：static, dns, consul
    #[serde(default)]
    pub backend: BackendType,

    /// 要发现的逻辑服务名
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// 实例必须携带的标签
    #[serde(default)]
    pub tags: Vec<String>,

    /// 注册中心地址（如 Consul URL）
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// 静态实例地址，或 DNS 后端要解析的名称
    #[serde(default)]
    pub addresses: Vec<String>,

    /// 轮询刷新间隔（秒）
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// 注册中心出错后的重试间隔（秒）
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

fn default_service_name() -> String {
    "profilesvc".to_string()
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_retry_interval() -> u64 {
    1
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            service_name: default_service_name(),
            tags: Vec::new(),
            endpoints: Vec::new(),
            addresses: Vec::new(),
            refresh_interval_secs: default_refresh_interval(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

/// 后端类型
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// 静态地址列表
    #[default]
    Static,
    Dns,
    Consul,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" | "memory" => Ok(BackendType::Static),
            "dns" => Ok(BackendType::Dns),
            "consul" => Ok(BackendType::Consul),
            _ => Err(format!("Unknown backend type: {}", s)),
        }
    }
}

/// 负载均衡策略
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    /// 轮询
    #[default]
    RoundRobin,
    /// 随机
    Random,
}

impl std::str::FromStr for LoadBalanceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" => Ok(LoadBalanceStrategy::RoundRobin),
            "random" => Ok(LoadBalanceStrategy::Random),
            _ => Err(format!("Unknown load balance strategy: {}", s)),
        }
    }
}
