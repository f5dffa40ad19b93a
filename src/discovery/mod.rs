//! 服务发现模块
//!
//! 注册中心后端（内存、DNS、Consul）提供实例查询和变更通知；
//! [`Instancer`] 发布实例集合，[`Endpointer`] 把实例集合转换为端点集合。

pub mod backend;
pub mod config;
pub mod endpointer;
pub mod factory;
pub mod instance;
pub mod instancer;

pub use backend::{ConsulBackend, DiscoveryBackend, DnsBackend, MemoryBackend};
pub use config::{BackendType, DiscoveryConfig, LoadBalanceStrategy};
pub use endpointer::{
    factory_fn, EndpointSet, EndpointSource, Endpointer, EndpointerOptions, Factory, FactoryFn,
    FixedEndpoints, Release,
};
pub use factory::DiscoveryFactory;
pub use instance::ServiceInstance;
pub use instancer::{InstanceEvent, Instancer, InstancerOptions, Subscription};
