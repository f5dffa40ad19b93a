//! Instancer：发布某个逻辑服务当前存活的实例集合
//!
//! 每个订阅者持有一个 `watch` 通道，只保留最新的实例集合。
//! 慢订阅者只会错过中间状态，不会阻塞注册中心更新或其它订阅者。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::backend::DiscoveryBackend;
use crate::discovery::instance::ServiceInstance;
use crate::error::FlareError;
use crate::utils::lock;

/// 实例集合事件
///
/// `instances` 总是完整的实例集合（排序、去重）。查询失败时 `error` 有值，
/// `instances` 保留最后一次成功查询的结果。
#[derive(Debug, Clone, Default)]
pub struct InstanceEvent {
    pub instances: Vec<String>,
    pub error: Option<FlareError>,
}

/// Instancer 选项
#[derive(Debug, Clone)]
pub struct InstancerOptions {
    /// 查询失败或没有 watch 时的重试间隔
    pub retry_interval: Duration,
}

impl Default for InstancerOptions {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(1),
        }
    }
}

/// 订阅句柄
pub struct Subscription {
    id: Uuid,
    rx: watch::Receiver<InstanceEvent>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 当前最新事件
    pub fn current(&self) -> InstanceEvent {
        self.rx.borrow().clone()
    }

    /// 等待下一次事件；Instancer 停止或取消订阅后返回 `None`
    pub async fn changed(&mut self) -> Option<InstanceEvent> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// 转换为事件流，只产生订阅之后的事件
    pub fn into_stream(self) -> WatchStream<InstanceEvent> {
        WatchStream::from_changes(self.rx)
    }
}

struct Shared {
    service_name: String,
    tags: Vec<String>,
    state: Mutex<InstanceEvent>,
    subscribers: Mutex<HashMap<Uuid, watch::Sender<InstanceEvent>>>,
}

impl Shared {
    /// 更新状态并推送给所有订阅者
    ///
    /// 推送时持有状态锁，保证新订阅者拿到的初始集合和后续事件之间没有遗漏。
    fn publish(&self, event: InstanceEvent) {
        let mut state = lock(&self.state);
        *state = event;
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|id, tx| {
            let alive = tx.send(state.clone()).is_ok();
            if !alive {
                debug!(service = %self.service_name, subscriber = %id, "dropping closed subscriber");
            }
            alive
        });
    }

    async fn refresh(&self, backend: &dyn DiscoveryBackend) {
        match backend.discover(&self.service_name, &self.tags).await {
            Ok(instances) => {
                let instances = normalize(instances, &self.tags);
                let unchanged = {
                    let state = lock(&self.state);
                    state.error.is_none() && state.instances == instances
                };
                if unchanged {
                    return;
                }
                info!(
                    service = %self.service_name,
                    count = instances.len(),
                    "🔄 Instance set updated"
                );
                self.publish(InstanceEvent {
                    instances,
                    error: None,
                });
            }
            Err(e) => {
                warn!(service = %self.service_name, error = %e, "⚠️ Registry lookup failed, keeping last known instances");
                let instances = lock(&self.state).instances.clone();
                self.publish(InstanceEvent {
                    instances,
                    error: Some(e),
                });
            }
        }
    }
}

/// 只保留健康且标签匹配的实例地址，排序去重
fn normalize(instances: Vec<ServiceInstance>, tags: &[String]) -> Vec<String> {
    let mut addresses: Vec<String> = instances
        .into_iter()
        .filter(|instance| instance.healthy && instance.matches_tags(tags))
        .map(|instance| instance.address)
        .collect();
    addresses.sort();
    addresses.dedup();
    addresses
}

/// Instancer
///
/// 每个逻辑服务名创建一个，运行到 [`Instancer::stop`] 或被丢弃为止。
pub struct Instancer {
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Instancer {
    /// 启动 Instancer
    ///
    /// 先建立变更监听，再做初始查询，避免两者之间的变更丢失。
    /// 初始查询失败不会返回错误：实例集合为空，错误通过事件暴露，后台继续重试。
    pub async fn start(
        backend: Arc<dyn DiscoveryBackend>,
        service_name: impl Into<String>,
        tags: Vec<String>,
        options: InstancerOptions,
    ) -> Self {
        let shared = Arc::new(Shared {
            service_name: service_name.into(),
            tags,
            state: Mutex::new(InstanceEvent::default()),
            subscribers: Mutex::new(HashMap::new()),
        });

        let notifications = open_watch(backend.as_ref(), &shared.service_name).await;
        shared.refresh(backend.as_ref()).await;

        let cancel = CancellationToken::new();
        tokio::spawn(watch_loop(
            backend,
            shared.clone(),
            notifications,
            options.retry_interval,
            cancel.clone(),
        ));

        Self { shared, cancel }
    }

    pub fn service_name(&self) -> &str {
        &self.shared.service_name
    }

    /// 订阅：返回当前实例集合和后续事件的订阅句柄
    pub fn subscribe(&self) -> (InstanceEvent, Subscription) {
        let state = lock(&self.shared.state);
        let current = state.clone();
        let (tx, rx) = watch::channel(current.clone());
        let id = Uuid::new_v4();
        if !self.cancel.is_cancelled() {
            lock(&self.shared.subscribers).insert(id, tx);
        }
        (current, Subscription { id, rx })
    }

    /// 取消订阅，之后该订阅句柄不再收到事件
    pub fn unsubscribe(&self, id: Uuid) {
        lock(&self.shared.subscribers).remove(&id);
    }

    /// 当前状态
    pub fn state(&self) -> InstanceEvent {
        lock(&self.shared.state).clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.subscribers).len()
    }

    /// 停止监听注册中心并关闭所有订阅
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        lock(&self.shared.subscribers).clear();
        info!(service = %self.shared.service_name, "🛑 Instancer stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Instancer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn open_watch(backend: &dyn DiscoveryBackend, service_name: &str) -> Option<mpsc::Receiver<()>> {
    match backend.watch(service_name).await {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!(service = %service_name, error = %e, "⚠️ Registry watch failed, falling back to polling");
            None
        }
    }
}

async fn next_notification(rx: &mut Option<mpsc::Receiver<()>>) -> Option<()> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn watch_loop(
    backend: Arc<dyn DiscoveryBackend>,
    shared: Arc<Shared>,
    mut notifications: Option<mpsc::Receiver<()>>,
    retry_interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        let failing = lock(&shared.state).error.is_some();
        let polling = failing || notifications.is_none();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            notification = next_notification(&mut notifications) => {
                if notification.is_none() {
                    debug!(service = %shared.service_name, "registry watch closed");
                    notifications = None;
                    continue;
                }
            }
            _ = tokio::time::sleep(retry_interval), if polling => {
                if notifications.is_none() {
                    notifications = open_watch(backend.as_ref(), &shared.service_name).await;
                }
            }
        }

        shared.refresh(backend.as_ref()).await;
    }
    debug!(service = %shared.service_name, "instancer watch loop exited");
}
