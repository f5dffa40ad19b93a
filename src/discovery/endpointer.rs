//! Endpointer：把实例集合转换为端点集合
//!
//! 订阅 Instancer，对每个新出现的实例调用 [`Factory`] 构建端点，
//! 对消失的实例释放其资源。端点集合整体替换发布，读者拿到的总是完整快照。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::instancer::{InstanceEvent, Instancer, Subscription};
use crate::endpoint::BoxEndpoint;
use crate::error::Result;
use crate::utils::{lock, read, write};

/// 实例资源的释放函数，恰好调用一次
pub type Release = Box<dyn FnOnce() + Send>;

/// 端点工厂：实例地址 → 绑定到该地址的端点和可释放资源
pub trait Factory<Req, Resp>: Send + Sync {
    fn make(&self, instance: &str) -> Result<(BoxEndpoint<Req, Resp>, Option<Release>)>;
}

/// 由闭包构成的工厂，见 [`factory_fn`]
pub struct FactoryFn<F> {
    f: F,
}

/// 用闭包创建工厂
pub fn factory_fn<Req, Resp, F>(f: F) -> FactoryFn<F>
where
    F: Fn(&str) -> Result<(BoxEndpoint<Req, Resp>, Option<Release>)> + Send + Sync,
{
    FactoryFn { f }
}

impl<Req, Resp, F> Factory<Req, Resp> for FactoryFn<F>
where
    F: Fn(&str) -> Result<(BoxEndpoint<Req, Resp>, Option<Release>)> + Send + Sync,
{
    fn make(&self, instance: &str) -> Result<(BoxEndpoint<Req, Resp>, Option<Release>)> {
        (self.f)(instance)
    }
}

/// 有序的端点集合快照
///
/// 顺序即轮询顺序；同一实例最多出现一次。
pub struct EndpointSet<Req, Resp> {
    entries: Vec<(String, BoxEndpoint<Req, Resp>)>,
}

impl<Req, Resp> EndpointSet<Req, Resp> {
    pub fn new(entries: Vec<(String, BoxEndpoint<Req, Resp>)>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BoxEndpoint<Req, Resp>> {
        self.entries.get(index).map(|(_, endpoint)| endpoint)
    }

    pub fn instances(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|(instance, _)| instance.as_str())
            .collect()
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &BoxEndpoint<Req, Resp>> {
        self.entries.iter().map(|(_, endpoint)| endpoint)
    }
}

/// 端点集合的来源，负载均衡器从这里读取快照
pub trait EndpointSource<Req, Resp>: Send + Sync {
    fn snapshot(&self) -> Arc<EndpointSet<Req, Resp>>;
}

impl<Req, Resp, T> EndpointSource<Req, Resp> for Arc<T>
where
    T: EndpointSource<Req, Resp> + ?Sized,
{
    fn snapshot(&self) -> Arc<EndpointSet<Req, Resp>> {
        (**self).snapshot()
    }
}

/// 固定的端点集合
pub struct FixedEndpoints<Req, Resp> {
    set: Arc<EndpointSet<Req, Resp>>,
}

impl<Req, Resp> FixedEndpoints<Req, Resp> {
    /// 以下标命名实例（`fixed-0`, `fixed-1`, ...）
    pub fn new(endpoints: Vec<BoxEndpoint<Req, Resp>>) -> Self {
        let entries = endpoints
            .into_iter()
            .enumerate()
            .map(|(i, endpoint)| (format!("fixed-{}", i), endpoint))
            .collect();
        Self {
            set: Arc::new(EndpointSet::new(entries)),
        }
    }
}

impl<Req, Resp> EndpointSource<Req, Resp> for FixedEndpoints<Req, Resp> {
    fn snapshot(&self) -> Arc<EndpointSet<Req, Resp>> {
        self.set.clone()
    }
}

/// Endpointer 选项
#[derive(Debug, Clone, Default)]
pub struct EndpointerOptions {
    /// 注册中心持续出错超过该时长后清空端点集合；`None` 表示一直保留
    pub invalidate_on_error: Option<Duration>,
}

struct Cached<Req, Resp> {
    endpoint: BoxEndpoint<Req, Resp>,
    release: Option<Release>,
}

struct Cache<Req, Resp> {
    entries: HashMap<String, Cached<Req, Resp>>,
    error_since: Option<Instant>,
    closed: bool,
}

struct Inner<Req, Resp> {
    service_name: String,
    factory: Arc<dyn Factory<Req, Resp>>,
    options: EndpointerOptions,
    cache: Mutex<Cache<Req, Resp>>,
    snapshot: RwLock<Arc<EndpointSet<Req, Resp>>>,
}

impl<Req, Resp> Inner<Req, Resp> {
    /// 应用一次实例集合事件
    ///
    /// 出错事件同样携带最后一次成功查询的实例集合，照常据此更新端点；
    /// 只有启用了 `invalidate_on_error` 且错误持续超时后才清空。
    fn update(&self, event: &InstanceEvent) {
        let mut released = Vec::new();
        {
            let mut cache = lock(&self.cache);
            if cache.closed {
                return;
            }

            match &event.error {
                Some(err) if self.invalidation_due(&mut cache) => {
                    if !cache.entries.is_empty() {
                        warn!(
                            service = %self.service_name,
                            error = %err,
                            "⚠️ Registry errors persisted, invalidating endpoints"
                        );
                        released.extend(
                            cache.entries.drain().filter_map(|(_, cached)| cached.release),
                        );
                        self.publish(EndpointSet::empty());
                    }
                }
                Some(_) => self.reconcile(&mut cache, &event.instances, &mut released),
                None => {
                    cache.error_since = None;
                    self.reconcile(&mut cache, &event.instances, &mut released);
                }
            }
        }

        // 新快照发布之后再释放旧资源
        for release in released {
            release();
        }
    }

    /// 记录错误开始时间，返回是否已到清空端点的时间
    fn invalidation_due(&self, cache: &mut Cache<Req, Resp>) -> bool {
        let Some(timeout) = self.options.invalidate_on_error else {
            return false;
        };
        let now = Instant::now();
        let since = *cache.error_since.get_or_insert(now);
        now.duration_since(since) >= timeout
    }

    /// 让缓存与实例集合一致，有变化时发布新快照
    fn reconcile(
        &self,
        cache: &mut Cache<Req, Resp>,
        instances: &[String],
        released: &mut Vec<Release>,
    ) {
        let mut changed = false;

        let live: HashSet<&str> = instances.iter().map(String::as_str).collect();
        let stale: Vec<String> = cache
            .entries
            .keys()
            .filter(|instance| !live.contains(instance.as_str()))
            .cloned()
            .collect();
        for instance in stale {
            if let Some(cached) = cache.entries.remove(&instance) {
                debug!(service = %self.service_name, instance = %instance, "removing endpoint");
                released.extend(cached.release);
                changed = true;
            }
        }

        let mut entries = Vec::with_capacity(instances.len());
        for instance in instances {
            if !cache.entries.contains_key(instance) {
                match self.factory.make(instance) {
                    Ok((endpoint, release)) => {
                        debug!(service = %self.service_name, instance = %instance, "endpoint created");
                        cache
                            .entries
                            .insert(instance.clone(), Cached { endpoint, release });
                        changed = true;
                    }
                    Err(e) => {
                        warn!(
                            service = %self.service_name,
                            instance = %instance,
                            error = %e,
                            "⚠️ Failed to create endpoint, skipping instance"
                        );
                        continue;
                    }
                }
            }
            if let Some(cached) = cache.entries.get(instance) {
                if entries.iter().all(|(existing, _)| existing != instance) {
                    entries.push((instance.clone(), cached.endpoint.clone()));
                }
            }
        }

        if !changed {
            return;
        }
        info!(
            service = %self.service_name,
            endpoints = entries.len(),
            instances = instances.len(),
            "🔄 Endpoints updated"
        );
        self.publish(EndpointSet::new(entries));
    }

    fn publish(&self, set: EndpointSet<Req, Resp>) {
        *write(&self.snapshot) = Arc::new(set);
    }

    fn close(&self) {
        let released: Vec<Release> = {
            let mut cache = lock(&self.cache);
            if cache.closed {
                return;
            }
            cache.closed = true;
            self.publish(EndpointSet::empty());
            cache
                .entries
                .drain()
                .filter_map(|(_, cached)| cached.release)
                .collect()
        };
        for release in released {
            release();
        }
    }
}

/// Endpointer
///
/// 与其 Instancer 一起销毁；关闭时释放所有资源并取消订阅。
pub struct Endpointer<Req, Resp> {
    inner: Arc<Inner<Req, Resp>>,
    instancer: Arc<Instancer>,
    subscription_id: Uuid,
    cancel: CancellationToken,
}

impl<Req, Resp> Endpointer<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// 创建 Endpointer 并立即应用 Instancer 的当前实例集合
    ///
    /// 需要在 tokio 运行时中调用。
    pub fn new(
        instancer: Arc<Instancer>,
        factory: Arc<dyn Factory<Req, Resp>>,
        options: EndpointerOptions,
    ) -> Self {
        let inner = Arc::new(Inner {
            service_name: instancer.service_name().to_string(),
            factory,
            options,
            cache: Mutex::new(Cache {
                entries: HashMap::new(),
                error_since: None,
                closed: false,
            }),
            snapshot: RwLock::new(Arc::new(EndpointSet::empty())),
        });

        let (initial, subscription) = instancer.subscribe();
        inner.update(&initial);

        let subscription_id = subscription.id();
        let cancel = CancellationToken::new();
        tokio::spawn(update_loop(inner.clone(), subscription, cancel.clone()));

        Self {
            inner,
            instancer,
            subscription_id,
            cancel,
        }
    }
}

impl<Req, Resp> Endpointer<Req, Resp> {
    /// 当前端点集合快照
    pub fn endpoints(&self) -> Arc<EndpointSet<Req, Resp>> {
        read(&self.inner.snapshot).clone()
    }

    /// 释放所有资源并取消订阅，可重复调用
    pub fn close(&self) {
        self.cancel.cancel();
        self.instancer.unsubscribe(self.subscription_id);
        self.inner.close();
    }
}

impl<Req, Resp> EndpointSource<Req, Resp> for Endpointer<Req, Resp> {
    fn snapshot(&self) -> Arc<EndpointSet<Req, Resp>> {
        self.endpoints()
    }
}

impl<Req, Resp> Drop for Endpointer<Req, Resp> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn update_loop<Req, Resp>(
    inner: Arc<Inner<Req, Resp>>,
    mut subscription: Subscription,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = subscription.changed() => match event {
                Some(event) => inner.update(&event),
                None => break,
            },
        }
    }
    debug!(service = %inner.service_name, "endpointer update loop exited");
}
