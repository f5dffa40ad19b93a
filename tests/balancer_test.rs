//! 负载均衡器测试

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::named;
use flare_profilesvc::balancer::{self, Balancer, Random, RoundRobin};
use flare_profilesvc::discovery::{EndpointSet, EndpointSource, FixedEndpoints};
use flare_profilesvc::endpoint::{BoxEndpoint, CallContext, Endpoint};
use flare_profilesvc::LoadBalanceStrategy;
use tokio_test::{assert_err, assert_ok};

async fn pick(balancer: &dyn Balancer<(), String>) -> String {
    let endpoint = assert_ok!(balancer.endpoint());
    assert_ok!(endpoint.call(CallContext::new(), ()).await)
}

fn fixed(names: &[&'static str]) -> FixedEndpoints<(), String> {
    FixedEndpoints::new(names.iter().map(|name| named(*name)).collect())
}

/// 可以在测试中替换集合的来源
struct Swappable {
    set: Mutex<Arc<EndpointSet<(), String>>>,
}

impl Swappable {
    fn new(names: &[&'static str]) -> Self {
        let swappable = Self {
            set: Mutex::new(Arc::new(EndpointSet::empty())),
        };
        swappable.replace(names);
        swappable
    }

    fn replace(&self, names: &[&'static str]) {
        let entries: Vec<(String, BoxEndpoint<(), String>)> = names
            .iter()
            .map(|name| (name.to_string(), named(*name)))
            .collect();
        *self.set.lock().unwrap() = Arc::new(EndpointSet::new(entries));
    }
}

impl EndpointSource<(), String> for Swappable {
    fn snapshot(&self) -> Arc<EndpointSet<(), String>> {
        self.set.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn round_robin_visits_each_endpoint_in_order() {
    let balancer = RoundRobin::new(fixed(&["a", "b", "c"]));

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(pick(&balancer).await);
    }
    assert_eq!(seen, vec!["a", "b", "c", "a"]);
}

#[tokio::test]
async fn empty_collection_reports_no_endpoints() {
    let balancer = RoundRobin::new(fixed(&[]));
    let err = assert_err!(Balancer::<(), String>::endpoint(&balancer));
    assert!(err.is_no_endpoints());

    let balancer = Random::new(fixed(&[]));
    let err = assert_err!(Balancer::<(), String>::endpoint(&balancer));
    assert!(err.is_no_endpoints());
}

#[tokio::test]
async fn cursor_wraps_modulo_current_size() {
    let source = Arc::new(Swappable::new(&["a", "b", "c"]));
    let balancer = RoundRobin::new(source.clone());

    assert_eq!(pick(&balancer).await, "a");
    assert_eq!(pick(&balancer).await, "b");

    // 游标为 2，新集合大小为 2，取模后回到第一个
    source.replace(&["x", "y"]);
    assert_eq!(pick(&balancer).await, "x");
    assert_eq!(pick(&balancer).await, "y");

    source.replace(&[]);
    assert!(assert_err!(Balancer::<(), String>::endpoint(&balancer)).is_no_endpoints());
}

#[tokio::test]
async fn concurrent_callers_share_the_cursor_fairly() {
    let balancer: Arc<dyn Balancer<(), String>> =
        balancer::build(LoadBalanceStrategy::RoundRobin, fixed(&["a", "b", "c", "d"]));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let balancer = balancer.clone();
        handles.push(tokio::spawn(async move {
            let mut picks = Vec::new();
            for _ in 0..50 {
                let endpoint = balancer.endpoint().unwrap();
                picks.push(endpoint.call(CallContext::new(), ()).await.unwrap());
            }
            picks
        }));
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for handle in futures::future::join_all(handles).await {
        for name in handle.unwrap() {
            *counts.entry(name).or_default() += 1;
        }
    }

    // 400 次调用，游标每次恰好前进一次
    assert_eq!(counts.len(), 4);
    assert!(counts.values().all(|count| *count == 100));
}

#[tokio::test]
async fn random_only_returns_members() {
    let balancer = Random::with_seed(fixed(&["a", "b", "c"]), 7);
    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..300 {
        *counts.entry(pick(&balancer).await).or_default() += 1;
    }
    assert_eq!(counts.len(), 3);
    assert!(counts.keys().all(|name| ["a", "b", "c"].contains(&name.as_str())));
}
