//! 内存档案存储测试

use std::sync::Arc;

use flare_profilesvc::service::{InMemoryProfileService, Profile, ProfileService};
use flare_profilesvc::CallContext;
use tokio_test::{assert_err, assert_ok};

fn ctx() -> CallContext {
    CallContext::new()
}

#[tokio::test]
async fn post_twice_fails_with_already_exists() {
    let store = InMemoryProfileService::new();
    assert_ok!(store.post_profile(&ctx(), Profile::new("a", "Alice")).await);

    let err = assert_err!(store.post_profile(&ctx(), Profile::new("a", "Other")).await);
    assert!(err.is_already_exists());
    assert_eq!(err.wire_message(), "already exists");

    // 第一次写入的内容保持不变
    let stored = assert_ok!(store.get_profile(&ctx(), "a").await);
    assert_eq!(stored.name, "Alice");
}

#[tokio::test]
async fn get_missing_fails_with_not_found() {
    let store = InMemoryProfileService::new();
    let err = assert_err!(store.get_profile(&ctx(), "missing").await);
    assert!(err.is_not_found());
    assert!(!err.is_transient());
}

#[tokio::test]
async fn put_with_mismatched_ids_fails() {
    let store = InMemoryProfileService::new();
    let err = assert_err!(store.put_profile(&ctx(), "a", Profile::new("b", "Bob")).await);
    assert!(err.is_inconsistent_ids());
    assert_eq!(err.param("path_id"), Some("a"));
    assert_eq!(err.param("body_id"), Some("b"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn put_upserts() {
    let store = InMemoryProfileService::new();
    assert_ok!(store.put_profile(&ctx(), "a", Profile::new("a", "Alice")).await);
    assert_ok!(
        store
            .put_profile(
                &ctx(),
                "a",
                Profile::new("a", "Alice").with_address("home", "Berlin")
            )
            .await
    );

    let stored = assert_ok!(store.get_profile(&ctx(), "a").await);
    assert_eq!(stored.addresses.len(), 1);
    assert_eq!(stored.addresses[0].location, "Berlin");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn delete_then_get_fails() {
    let store = InMemoryProfileService::new();
    assert_ok!(store.post_profile(&ctx(), Profile::new("a", "Alice")).await);
    assert_ok!(store.delete_profile(&ctx(), "a").await);

    let err = assert_err!(store.get_profile(&ctx(), "a").await);
    assert!(err.is_not_found());

    let err = assert_err!(store.delete_profile(&ctx(), "a").await);
    assert!(err.is_not_found());
}

#[tokio::test]
async fn concurrent_writers_and_readers() {
    let store = Arc::new(InMemoryProfileService::new());

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("user-{}", i);
            store
                .post_profile(&CallContext::new(), Profile::new(id.clone(), "name"))
                .await?;
            store.get_profile(&CallContext::new(), &id).await
        }));
    }

    for handle in handles {
        let profile = assert_ok!(handle.await.unwrap());
        assert_eq!(profile.name, "name");
    }
    assert_eq!(store.len().await, 32);
}

#[test]
fn profile_json_omits_empty_fields() {
    let json = serde_json::to_value(Profile::new("a", "")).unwrap();
    assert_eq!(json, serde_json::json!({ "id": "a" }));

    let parsed: Profile = serde_json::from_value(serde_json::json!({
        "id": "b",
        "name": "Bob",
        "addresses": [{ "id": "work", "location": "Paris" }]
    }))
    .unwrap();
    assert_eq!(parsed, Profile::new("b", "Bob").with_address("work", "Paris"));
}
