//! 注册中心后端抽象和实现

pub mod consul;
pub mod dns;
pub mod memory;

pub use consul::ConsulBackend;
pub use dns::DnsBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::discovery::instance::ServiceInstance;
use crate::error::Result;

/// 注册中心后端 trait
///
/// 后端只需提供两件事：按服务名查询实例，以及变更通知。
/// 变更通知不携带数据，收到后由 Instancer 重新做一次完整查询。
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// 查询服务实例
    ///
    /// `tags` 是后端可以用来预过滤的标签，Instancer 会在本地再过滤一次。
    async fn discover(&self, service_name: &str, tags: &[String]) -> Result<Vec<ServiceInstance>>;

    /// 监听服务变化
    ///
    /// 通道关闭表示后端不再推送通知，Instancer 将退化为定期轮询。
    async fn watch(&self, service_name: &str) -> Result<mpsc::Receiver<()>>;
}

/// 合并通知：通道中已有未读通知时丢弃新的通知
pub(crate) fn notify(tx: &mpsc::Sender<()>) -> bool {
    match tx.try_send(()) {
        Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
        Err(mpsc::error::TrySendError::Closed(())) => false,
    }
}

/// 变更通知通道，容量为 1
pub(crate) fn notification_channel() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    mpsc::channel(1)
}
