//! 端点、调用上下文与端点中间件测试

use std::sync::Arc;
use std::time::Duration;

use flare_profilesvc::endpoint::{boxed, endpoint_fn, BoxEndpoint, CallContext, Endpoint};
use flare_profilesvc::middleware::{EndpointLoggingLayer, TimeoutLayer};
use flare_profilesvc::service::{
    make_server_endpoint, InMemoryProfileService, Profile, ProfileRequest, ProfileResponse,
};
use flare_profilesvc::FlareError;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use tower::Layer;

fn slow(delay: Duration) -> BoxEndpoint<u32, u32> {
    boxed(endpoint_fn(move |_ctx: CallContext, n: u32| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, FlareError>(n)
    }))
}

#[tokio::test]
async fn endpoint_fn_calls_closure() {
    let double = boxed(endpoint_fn(|_ctx: CallContext, n: u32| async move {
        Ok::<_, FlareError>(n * 2)
    }));
    assert_eq!(assert_ok!(double.call(CallContext::new(), 21).await), 42);
}

#[tokio::test(start_paused = true)]
async fn child_deadline_never_extends_parent() {
    let parent = CallContext::with_timeout(Duration::from_millis(100));
    let child = parent.child_with_deadline(Instant::now() + Duration::from_secs(10));
    assert_eq!(child.deadline(), parent.deadline());

    let tighter = parent.child_with_deadline(Instant::now() + Duration::from_millis(10));
    assert!(tighter.deadline() < parent.deadline());

    tokio::time::advance(Duration::from_millis(20)).await;
    assert!(tighter.is_expired());
    assert!(!parent.is_expired());
    assert_eq!(tighter.remaining(), Some(Duration::ZERO));
}

#[tokio::test]
async fn cancelling_child_does_not_cancel_parent() {
    let parent = CallContext::new();
    let child = parent.child();
    child.cancel();
    assert!(child.is_cancelled());
    assert!(!parent.is_cancelled());

    let child = parent.child();
    parent.cancel();
    assert!(child.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn run_stops_at_deadline() {
    let ctx = CallContext::with_timeout(Duration::from_millis(50));
    let err = assert_err!(ctx.run(slow(Duration::from_secs(1)).call(ctx.clone(), 1)).await);
    assert!(err.is_deadline_exceeded());
}

#[tokio::test(start_paused = true)]
async fn run_stops_on_cancel() {
    let ctx = CallContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });
    let err = assert_err!(ctx.run(slow(Duration::from_secs(1)).call(ctx.clone(), 1)).await);
    assert!(err.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn timeout_layer_bounds_each_call() {
    let layered = TimeoutLayer::new(Duration::from_millis(100)).layer(slow(Duration::from_millis(500)));
    let err = assert_err!(layered.call(CallContext::new(), 7).await);
    assert!(err.is_deadline_exceeded());

    let fast = TimeoutLayer::new(Duration::from_millis(100)).layer(slow(Duration::from_millis(5)));
    assert_eq!(assert_ok!(fast.call(CallContext::new(), 7).await), 7);
}

#[tokio::test(start_paused = true)]
async fn unrepresentable_timeout_means_no_deadline() {
    let ctx = CallContext::with_timeout(Duration::MAX);
    assert!(ctx.deadline().is_none());
    assert!(!ctx.is_expired());

    let parent = CallContext::with_timeout(Duration::from_millis(100));
    let child = parent.child_with_timeout(Duration::MAX);
    assert_eq!(child.deadline(), parent.deadline());

    let layered = TimeoutLayer::new(Duration::MAX).layer(slow(Duration::from_secs(5)));
    assert_eq!(assert_ok!(layered.call(CallContext::new(), 9).await), 9);
}

#[tokio::test]
async fn layers_compose_and_pass_results_through() {
    let failing: BoxEndpoint<u32, u32> = boxed(endpoint_fn(|_ctx: CallContext, _n: u32| async move {
        Err::<u32, _>(FlareError::not_found("x"))
    }));
    let layered = EndpointLoggingLayer::new("failing")
        .layer(TimeoutLayer::new(Duration::from_secs(1)).layer(failing));
    let err = assert_err!(layered.call(CallContext::new(), 1).await);
    assert!(err.is_not_found());

    let ok = EndpointLoggingLayer::new("ok").layer(slow(Duration::ZERO));
    let boxed_ok: BoxEndpoint<u32, u32> = Arc::new(ok);
    assert_eq!(assert_ok!(boxed_ok.call(CallContext::new(), 3).await), 3);
}

#[tokio::test]
async fn server_endpoint_dispatches_by_request() {
    let endpoint = make_server_endpoint(Arc::new(InMemoryProfileService::new()));
    let ctx = CallContext::new();

    let posted = endpoint
        .call(
            ctx.clone(),
            ProfileRequest::Post {
                profile: Profile::new("a", "Alice"),
            },
        )
        .await;
    assert_eq!(assert_ok!(posted), ProfileResponse::Posted);

    let got = endpoint
        .call(ctx.clone(), ProfileRequest::Get { id: "a".into() })
        .await;
    assert_eq!(
        assert_ok!(got),
        ProfileResponse::Profile(Profile::new("a", "Alice"))
    );

    let put = endpoint
        .call(
            ctx.clone(),
            ProfileRequest::Put {
                id: "a".into(),
                profile: Profile::new("b", ""),
            },
        )
        .await;
    assert!(assert_err!(put).is_inconsistent_ids());

    let deleted = endpoint
        .call(ctx.clone(), ProfileRequest::Delete { id: "a".into() })
        .await;
    assert_eq!(assert_ok!(deleted), ProfileResponse::Deleted);
    assert_eq!(ProfileRequest::Delete { id: "a".into() }.method(), "delete_profile");
}
