//! Instancer 集成测试

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{eventually, FlakyBackend};
use flare_profilesvc::discovery::{Instancer, InstancerOptions, MemoryBackend};
use flare_profilesvc::ServiceInstance;
use tokio_stream::StreamExt;

const SERVICE: &str = "profilesvc";

fn options() -> InstancerOptions {
    InstancerOptions {
        retry_interval: Duration::from_millis(20),
    }
}

async fn start(backend: &MemoryBackend) -> Instancer {
    Instancer::start(Arc::new(backend.clone()), SERVICE, Vec::new(), options()).await
}

#[tokio::test]
async fn initial_set_is_available_on_subscribe() {
    let backend = MemoryBackend::new();
    backend.set_addresses(SERVICE, ["10.0.0.2:8080", "10.0.0.1:8080", "10.0.0.1:8080"]);

    let instancer = start(&backend).await;
    let (initial, _subscription) = instancer.subscribe();

    assert_eq!(initial.instances, vec!["10.0.0.1:8080", "10.0.0.2:8080"]);
    assert!(initial.error.is_none());
    assert_eq!(instancer.subscriber_count(), 1);
}

#[tokio::test]
async fn pushes_registry_changes() {
    let backend = MemoryBackend::new();
    backend.set_addresses(SERVICE, ["a:1"]);
    let instancer = start(&backend).await;
    let (_, mut subscription) = instancer.subscribe();

    backend.register(ServiceInstance::new(SERVICE, "b", "b:1"));
    let event = tokio::time::timeout(Duration::from_secs(2), subscription.changed())
        .await
        .expect("no event")
        .expect("subscription closed");
    assert_eq!(event.instances, vec!["a:1", "b:1"]);

    assert!(backend.deregister(SERVICE, "a:1"));
    eventually(|| subscription.current().instances == vec!["b:1".to_string()]).await;
}

#[tokio::test]
async fn lookup_failure_keeps_last_known_instances() {
    let backend = FlakyBackend::new();
    backend.inner.set_addresses(SERVICE, ["a:1", "b:1"]);
    let instancer =
        Instancer::start(Arc::new(backend.clone()), SERVICE, Vec::new(), options()).await;
    let (_, subscription) = instancer.subscribe();

    backend.set_failing(true);
    backend.inner.register(ServiceInstance::new(SERVICE, "c", "c:1"));
    eventually(|| subscription.current().error.is_some()).await;

    let event = subscription.current();
    assert_eq!(event.instances, vec!["a:1", "b:1"]);
    assert!(event.error.as_ref().is_some_and(|e| e.param("service") == Some(SERVICE)));

    // 失败期间按重试间隔持续查询
    let lookups = backend.lookups.load(Ordering::SeqCst);
    eventually(|| backend.lookups.load(Ordering::SeqCst) > lookups + 1).await;

    backend.set_failing(false);
    eventually(|| {
        let event = subscription.current();
        event.error.is_none() && event.instances.len() == 3
    })
    .await;
}

#[tokio::test]
async fn initial_lookup_failure_starts_empty() {
    let backend = FlakyBackend::new();
    backend.inner.set_addresses(SERVICE, ["a:1"]);
    backend.set_failing(true);

    let instancer =
        Instancer::start(Arc::new(backend.clone()), SERVICE, Vec::new(), options()).await;
    let state = instancer.state();
    assert!(state.instances.is_empty());
    assert!(state.error.is_some());

    backend.set_failing(false);
    eventually(|| instancer.state().instances == vec!["a:1".to_string()]).await;
}

#[tokio::test]
async fn filters_unhealthy_and_untagged_instances() {
    let backend = MemoryBackend::new();
    backend.set_instances(
        SERVICE,
        vec![
            ServiceInstance::new(SERVICE, "1", "a:1").with_tag("v2"),
            ServiceInstance::new(SERVICE, "2", "b:1").with_tag("v2").with_health(false),
            ServiceInstance::new(SERVICE, "3", "c:1").with_tag("v1"),
            ServiceInstance::new(SERVICE, "4", "d:1").with_tag("v1").with_tag("v2"),
        ],
    );

    let instancer = Instancer::start(
        Arc::new(backend.clone()),
        SERVICE,
        vec!["v2".to_string()],
        options(),
    )
    .await;

    assert_eq!(instancer.state().instances, vec!["a:1", "d:1"]);
}

#[tokio::test]
async fn unsubscribed_handle_stops_receiving() {
    let backend = MemoryBackend::new();
    backend.set_addresses(SERVICE, ["a:1"]);
    let instancer = start(&backend).await;

    let (_, mut first) = instancer.subscribe();
    let (_, second) = instancer.subscribe();
    assert_eq!(instancer.subscriber_count(), 2);

    instancer.unsubscribe(first.id());
    assert_eq!(instancer.subscriber_count(), 1);
    assert!(first.changed().await.is_none());

    backend.register(ServiceInstance::new(SERVICE, "b", "b:1"));
    eventually(|| second.current().instances.len() == 2).await;
}

#[tokio::test]
async fn stop_closes_all_subscriptions() {
    let backend = MemoryBackend::new();
    backend.set_addresses(SERVICE, ["a:1"]);
    let instancer = start(&backend).await;
    let (_, mut subscription) = instancer.subscribe();

    instancer.stop();
    assert!(instancer.is_stopped());
    assert_eq!(instancer.subscriber_count(), 0);
    assert!(subscription.changed().await.is_none());

    // 停止后的订阅只拿到当前状态
    let (current, mut late) = instancer.subscribe();
    assert_eq!(current.instances, vec!["a:1"]);
    assert!(late.changed().await.is_none());
}

#[tokio::test]
async fn slow_subscriber_sees_latest_set() {
    let backend = MemoryBackend::new();
    let instancer = start(&backend).await;
    let (_, slow) = instancer.subscribe();
    let (_, fast) = instancer.subscribe();

    for i in 1..=5 {
        let addresses: Vec<String> = (0..i).map(|n| format!("node-{}:80", n)).collect();
        backend.set_addresses(SERVICE, addresses);
        eventually(|| fast.current().instances.len() == i).await;
    }

    // 未读取的中间状态被覆盖，只剩最新集合
    let mut stream = slow.into_stream();
    let event = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("no event")
        .expect("stream ended");
    assert_eq!(event.instances.len(), 5);

    backend.register(ServiceInstance::new(SERVICE, "extra", "node-9:80"));
    let event = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("no event")
        .expect("stream ended");
    assert_eq!(event.instances.len(), 6);
}
