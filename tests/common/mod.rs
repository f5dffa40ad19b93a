//! 集成测试公共工具
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flare_profilesvc::discovery::{factory_fn, DiscoveryBackend, Factory, MemoryBackend, Release};
use flare_profilesvc::endpoint::{endpoint_fn, BoxEndpoint, CallContext};
use flare_profilesvc::{FlareError, Result, ServiceInstance};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// 轮询等待条件成立，最多约 2 秒
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

/// 等待服务端开始接受连接，最多约 2 秒
pub async fn wait_for_server_ready(address: SocketAddr) {
    for _ in 0..200 {
        if TcpStream::connect(address).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server at {} did not become ready", address);
}

/// 可以切换为失败状态的注册中心
#[derive(Clone, Default)]
pub struct FlakyBackend {
    pub inner: MemoryBackend,
    failing: Arc<AtomicBool>,
    pub lookups: Arc<AtomicUsize>,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DiscoveryBackend for FlakyBackend {
    async fn discover(&self, service_name: &str, tags: &[String]) -> Result<Vec<ServiceInstance>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlareError::registry_lookup(service_name, "registry unavailable"));
        }
        self.inner.discover(service_name, tags).await
    }

    async fn watch(&self, service_name: &str) -> Result<mpsc::Receiver<()>> {
        self.inner.watch(service_name).await
    }
}

/// 记录工厂调用和资源释放的工厂：端点返回实例地址
pub struct RecordingFactory {
    pub made: Arc<Mutex<Vec<String>>>,
    pub released: Arc<Mutex<Vec<String>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self {
            made: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn made(&self) -> Vec<String> {
        self.made.lock().unwrap().clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }

    /// 地址以 `bad` 开头的实例构建失败
    pub fn factory(&self) -> Arc<dyn Factory<(), String>> {
        let made = self.made.clone();
        let released = self.released.clone();
        Arc::new(factory_fn(move |instance: &str| {
            if instance.starts_with("bad") {
                return Err(FlareError::instance_construction(instance, "refused"));
            }
            made.lock().unwrap().push(instance.to_string());
            let name = instance.to_string();
            let endpoint: BoxEndpoint<(), String> = Arc::new(endpoint_fn(
                move |_ctx: CallContext, _req: ()| {
                    let name = name.clone();
                    async move { Ok::<_, FlareError>(name) }
                },
            ));
            let released = released.clone();
            let instance = instance.to_string();
            let release: Release = Box::new(move || released.lock().unwrap().push(instance));
            Ok((endpoint, Some(release)))
        }))
    }
}

/// 返回固定字符串的端点
pub fn named(name: &'static str) -> BoxEndpoint<(), String> {
    Arc::new(endpoint_fn(move |_ctx: CallContext, _req: ()| async move {
        Ok::<_, FlareError>(name.to_string())
    }))
}
