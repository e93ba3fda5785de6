//! EnsureExists / EnsureDeleted against the in-memory provider.

mod common;

use std::sync::Arc;
use std::time::Duration;

use blb_reconciler::blb::BlbClient;
use blb_reconciler::error::BlbError;
use blb_reconciler::identity::{HintSource, IdentityResolver, ServiceIdentityHints, ServiceRef};
use blb_reconciler::lifecycle::{CancelSignal, Cancellation, LifecycleManager, LifecycleState, Released};
use blb_reconciler::placement::StaticPlacement;
use blb_reconciler::resilience::Backoff;
use blb_reconciler::transport::{Method, TransportError, CLIENT_TOKEN_PARAM};

use common::{json_body, FakeCloud};

const CLUSTER: &str = "cce-test";
const WEB_NAME: &str = "cce-test/default/web";

fn manager_with(cloud: &Arc<FakeCloud>, placement: StaticPlacement) -> LifecycleManager {
    LifecycleManager::new(
        BlbClient::new(cloud.clone()),
        Arc::new(placement),
        CLUSTER,
        "auto generated by cce",
        Backoff::new(4, Duration::from_millis(1), Duration::from_millis(4)),
    )
}

fn manager(cloud: &Arc<FakeCloud>) -> LifecycleManager {
    manager_with(cloud, StaticPlacement::new("vpc-1", "sbn-1"))
}

fn web() -> ServiceRef {
    ServiceRef::new("default", "web")
}

fn web_with(hints: ServiceIdentityHints) -> ServiceRef {
    web().with_hints(hints)
}

#[tokio::test]
async fn test_creates_load_balancer_for_new_service() {
    let cloud = FakeCloud::new();
    let manager = manager(&cloud);
    let mut service = web();

    let ensured = manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();

    assert_eq!(ensured.state, LifecycleState::Ready);
    assert!(ensured.created());
    assert_eq!(ensured.record.name, WEB_NAME);
    assert_eq!(cloud.count(Method::Post, "v1/blb"), 1);

    // both identifier hints carry the new id
    let id = ensured.record.id.clone();
    assert_eq!(service.hints.auto_assigned_id.as_deref(), Some(id.as_str()));
    assert_eq!(service.hints.explicit_load_balancer_id.as_deref(), Some(id.as_str()));
    assert!(!service.hints.reserve);

    let calls = cloud.calls();
    let create_idx = calls
        .iter()
        .position(|c| c.method == Method::Post && c.path == "v1/blb")
        .unwrap();
    let create = &calls[create_idx];
    assert!(create.query_value(CLIENT_TOKEN_PARAM).is_some());

    let body = json_body(create);
    assert_eq!(body["name"], WEB_NAME);
    assert_eq!(body["vpcId"], "vpc-1");
    assert_eq!(body["subnetId"], "sbn-1");
    assert_eq!(body["desc"], "auto generated by cce:cce-test");
    assert_eq!(body["allocateVip"], false);

    // exactly one fetch by id after creation
    let polls: Vec<_> = calls[create_idx + 1..]
        .iter()
        .filter(|c| c.query_value("blbId") == Some(id.as_str()))
        .collect();
    assert_eq!(polls.len(), 1);
    assert_eq!(calls.len(), create_idx + 2);
}

#[tokio::test]
async fn test_ensure_exists_is_idempotent() {
    let cloud = FakeCloud::new();
    let manager = manager(&cloud);
    let mut service = web();

    let first = manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();
    let second = manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();

    assert_eq!(first.record.id, second.record.id);
    assert_eq!(second.state, LifecycleState::Found);
    assert!(!second.created());
    assert_eq!(cloud.count(Method::Post, "v1/blb"), 1);
    assert_eq!(cloud.load_balancer_ids().len(), 1);
}

#[tokio::test]
async fn test_allocate_vip_hint_reaches_create_call() {
    let cloud = FakeCloud::new();
    let manager = manager(&cloud);
    let mut service = web_with(ServiceIdentityHints {
        allocate_virtual_ip: true,
        ..Default::default()
    });

    manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();

    let create = cloud
        .calls()
        .into_iter()
        .find(|c| c.method == Method::Post)
        .unwrap();
    assert_eq!(json_body(&create)["allocateVip"], true);
}

#[tokio::test]
async fn test_explicit_hint_wins_over_auto_assigned() {
    let cloud = FakeCloud::new();
    cloud.add_load_balancer("lb-explicit", "user-provided");
    cloud.add_load_balancer("lb-auto", WEB_NAME);

    let resolver = IdentityResolver::new(BlbClient::new(cloud.clone()), CLUSTER);
    let service = web_with(ServiceIdentityHints {
        explicit_load_balancer_id: Some("lb-explicit".into()),
        auto_assigned_id: Some("lb-auto".into()),
        ..Default::default()
    });

    let resolution = resolver.resolve(&service).await.unwrap().unwrap();
    assert_eq!(resolution.record.id, "lb-explicit");
    assert_eq!(resolution.source, HintSource::Explicit);
    assert_eq!(cloud.calls().len(), 1);
}

#[tokio::test]
async fn test_stale_hints_fall_through_in_order() {
    let cloud = FakeCloud::new();
    cloud.add_load_balancer("lb-named", WEB_NAME);

    let resolver = IdentityResolver::new(BlbClient::new(cloud.clone()), CLUSTER);
    let service = web_with(ServiceIdentityHints {
        explicit_load_balancer_id: Some("lb-gone-1".into()),
        legacy_reserved_id: Some("lb-gone-2".into()),
        auto_assigned_id: Some("lb-gone-3".into()),
        ..Default::default()
    });

    let resolution = resolver.resolve(&service).await.unwrap().unwrap();
    assert_eq!(resolution.record.id, "lb-named");
    assert_eq!(resolution.source, HintSource::Name);

    let lookups: Vec<_> = cloud
        .calls()
        .iter()
        .map(|c| {
            c.query_value("blbId")
                .map(|id| format!("id:{}", id))
                .or_else(|| c.query_value("name").map(|n| format!("name:{}", n)))
                .unwrap()
        })
        .collect();
    assert_eq!(
        lookups,
        vec![
            "id:lb-gone-1".to_string(),
            "id:lb-gone-2".to_string(),
            "id:lb-gone-3".to_string(),
            format!("name:{}", WEB_NAME),
        ]
    );
}

#[tokio::test]
async fn test_stale_explicit_hint_uses_auto_assigned() {
    let cloud = FakeCloud::new();
    cloud.add_load_balancer("lb-auto", "something-else");
    cloud.fail_next(
        Method::Get,
        "v1/blb",
        TransportError::Status {
            status: 404,
            code: "NoSuchObject".into(),
            message: "gone".into(),
            request_id: None,
        },
    );

    let manager = manager(&cloud);
    let mut service = web_with(ServiceIdentityHints {
        explicit_load_balancer_id: Some("lb-stale".into()),
        auto_assigned_id: Some("lb-auto".into()),
        ..Default::default()
    });

    let ensured = manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();
    assert_eq!(ensured.record.id, "lb-auto");
    assert_eq!(ensured.state, LifecycleState::Found);
    assert!(cloud.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_no_load_balancer_anywhere_is_not_an_error() {
    let cloud = FakeCloud::new();
    let resolver = IdentityResolver::new(BlbClient::new(cloud.clone()), CLUSTER);

    assert!(resolver.resolve(&web()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_legacy_hint_marks_service_reserved() {
    let cloud = FakeCloud::new();
    cloud.add_load_balancer("lb-old", "legacy");

    let manager = manager(&cloud);
    let mut service = web_with(ServiceIdentityHints {
        legacy_reserved_id: Some("lb-old".into()),
        ..Default::default()
    });

    let ensured = manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();
    assert_eq!(ensured.record.id, "lb-old");
    assert!(service.hints.reserve);
    assert_eq!(service.hints.auto_assigned_id, None);
}

#[tokio::test]
async fn test_empty_identifier_fails_without_writing_hints() {
    let cloud = FakeCloud::new();
    cloud.return_empty_id();
    let manager = manager(&cloud);
    let mut service = web();

    let err = manager
        .ensure_exists(&mut service, &CancelSignal::never())
        .await
        .unwrap_err();

    assert!(matches!(err, BlbError::InvariantViolation { operation: "CreateLoadBalancer", .. }));
    assert!(err.is_retryable());
    assert_eq!(service.hints, ServiceIdentityHints::default());
}

#[tokio::test]
async fn test_readiness_poll_waits_for_visibility() {
    let cloud = FakeCloud::new();
    cloud.hide_new_load_balancers_for(2);
    let manager = manager(&cloud);
    let mut service = web();

    let ensured = manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();
    assert_eq!(ensured.state, LifecycleState::Ready);

    let id = ensured.record.id;
    let polls = cloud
        .calls()
        .iter()
        .filter(|c| c.query_value("blbId") == Some(id.as_str()))
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn test_never_visible_is_invariant_violation() {
    let cloud = FakeCloud::new();
    cloud.hide_new_load_balancers_for(100);
    let manager = manager(&cloud);
    let mut service = web();

    let err = manager
        .ensure_exists(&mut service, &CancelSignal::never())
        .await
        .unwrap_err();

    assert!(matches!(err, BlbError::InvariantViolation { operation: "AwaitLoadBalancerReady", .. }));
    assert_eq!(service.hints.auto_assigned_id, None);
    assert_eq!(service.hints.explicit_load_balancer_id, None);

    let polls = cloud
        .calls()
        .iter()
        .filter(|c| c.method == Method::Get && c.query_value("blbId").is_some())
        .count();
    assert_eq!(polls, 4);
}

#[tokio::test]
async fn test_transient_create_failure_is_retryable() {
    let cloud = FakeCloud::new();
    cloud.fail_next(
        Method::Post,
        "v1/blb",
        TransportError::Status {
            status: 503,
            code: "ServiceUnavailable".into(),
            message: "try later".into(),
            request_id: Some("req-1".into()),
        },
    );
    let manager = manager(&cloud);
    let mut service = web();

    let err = manager
        .ensure_exists(&mut service, &CancelSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, BlbError::Transient { operation: "CreateLoadBalancer", .. }));
    assert!(err.is_retryable());
    assert_eq!(service.hints, ServiceIdentityHints::default());

    // the next pass creates it
    let ensured = manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();
    assert_eq!(ensured.state, LifecycleState::Ready);
}

#[tokio::test]
async fn test_missing_placement_fails_before_create() {
    let cloud = FakeCloud::new();
    let manager = manager_with(&cloud, StaticPlacement::new("", ""));
    let mut service = web();

    let err = manager
        .ensure_exists(&mut service, &CancelSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, BlbError::Placement(_)));
    assert!(cloud.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_cancel_before_start_sends_nothing() {
    let cloud = FakeCloud::new();
    let manager = manager(&cloud);
    let cancellation = Cancellation::new();
    cancellation.cancel();

    let mut service = web();
    let err = manager
        .ensure_exists(&mut service, &cancellation.signal())
        .await
        .unwrap_err();

    assert!(matches!(err, BlbError::Cancelled { outcome_unknown: false, .. }));
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_during_create_is_outcome_unknown() {
    let cloud = FakeCloud::new();
    cloud.delay_creation(Duration::from_secs(60));
    let manager = manager(&cloud);
    let cancellation = Cancellation::new();
    let signal = cancellation.signal();

    let mut service = web();
    let ensure = manager.ensure_exists(&mut service, &signal);
    let trigger = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancellation.cancel();
    };
    let (result, _) = tokio::join!(ensure, trigger);

    assert!(matches!(
        result,
        Err(BlbError::Cancelled { operation: "CreateLoadBalancer", outcome_unknown: true })
    ));
    assert_eq!(service.hints, ServiceIdentityHints::default());
}

#[tokio::test]
async fn test_next_pass_after_unknown_outcome_finds_by_name() {
    let cloud = FakeCloud::new();
    // a previous pass created it but never recorded the id
    cloud.add_load_balancer("lb-orphan", WEB_NAME);
    let manager = manager(&cloud);
    let mut service = web();

    let ensured = manager.ensure_exists(&mut service, &CancelSignal::never()).await.unwrap();
    assert_eq!(ensured.record.id, "lb-orphan");
    assert_eq!(ensured.state, LifecycleState::Found);
    assert_eq!(cloud.count(Method::Post, "v1/blb"), 0);
}

#[tokio::test]
async fn test_ensure_deleted_none_makes_no_calls() {
    let cloud = FakeCloud::new();
    let manager = manager(&cloud);

    manager.ensure_deleted(None, &CancelSignal::never()).await.unwrap();
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn test_ensure_deleted_is_idempotent() {
    let cloud = FakeCloud::new();
    let record = cloud.add_load_balancer("lb-1", WEB_NAME);
    let manager = manager(&cloud);

    manager.ensure_deleted(Some(&record), &CancelSignal::never()).await.unwrap();
    assert!(cloud.load_balancer_ids().is_empty());

    // already absent
    manager.ensure_deleted(Some(&record), &CancelSignal::never()).await.unwrap();
    assert_eq!(cloud.count(Method::Delete, "v1/blb/lb-1"), 2);

    let delete = cloud.mutating_calls().remove(0);
    assert!(delete.query_value(CLIENT_TOKEN_PARAM).is_some());
}

#[tokio::test]
async fn test_release_keeps_reserved_load_balancer() {
    let cloud = FakeCloud::new();
    cloud.add_load_balancer("lb-1", WEB_NAME);
    let manager = manager(&cloud);

    let mut reserved = web_with(ServiceIdentityHints {
        auto_assigned_id: Some("lb-1".into()),
        reserve: true,
        ..Default::default()
    });
    let released = manager.release(&mut reserved, &CancelSignal::never()).await.unwrap();
    assert_eq!(released, Released::Reserved("lb-1".into()));
    assert_eq!(cloud.load_balancer_ids(), vec!["lb-1".to_string()]);

    let mut service = web_with(ServiceIdentityHints {
        auto_assigned_id: Some("lb-1".into()),
        ..Default::default()
    });
    let released = manager.release(&mut service, &CancelSignal::never()).await.unwrap();
    assert_eq!(released, Released::Deleted("lb-1".into()));
    assert!(cloud.load_balancer_ids().is_empty());

    let released = manager.release(&mut service, &CancelSignal::never()).await.unwrap();
    assert_eq!(released, Released::Absent);
}

#[tokio::test]
async fn test_empty_hints_are_skipped() {
    let cloud = FakeCloud::new();
    cloud.add_load_balancer("lb-auto", "something-else");

    let resolver = IdentityResolver::new(BlbClient::new(cloud.clone()), CLUSTER);
    let service = web_with(ServiceIdentityHints {
        explicit_load_balancer_id: Some(String::new()),
        legacy_reserved_id: Some("  ".into()),
        auto_assigned_id: Some("lb-auto".into()),
        ..Default::default()
    });

    let resolution = resolver.resolve(&service).await.unwrap().unwrap();
    assert_eq!(resolution.record.id, "lb-auto");
    assert_eq!(resolution.source, HintSource::AutoAssigned);

    let calls = cloud.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query_value("blbId"), Some("lb-auto"));
}

#[tokio::test]
async fn test_unterminated_name_lookup_does_not_create() {
    let cloud = FakeCloud::new();
    cloud.repeat_pagination_marker();
    let manager = manager(&cloud);
    let mut service = web();

    let err = manager
        .ensure_exists(&mut service, &CancelSignal::never())
        .await
        .unwrap_err();

    assert!(matches!(err, BlbError::InvariantViolation { operation: "DescribeLoadBalancers", .. }));
    assert!(err.is_retryable());
    assert_eq!(cloud.count(Method::Get, "v1/blb"), 100);
    assert!(cloud.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_cancel_after_create_is_outcome_unknown() {
    let cloud = FakeCloud::new();
    let cancellation = Arc::new(Cancellation::new());
    cloud.cancel_after_mutations(1, cancellation.clone());
    let manager = manager(&cloud);
    let mut service = web();

    let err = manager
        .ensure_exists(&mut service, &cancellation.signal())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BlbError::Cancelled { operation: "AwaitLoadBalancerReady", outcome_unknown: true }
    ));
    assert_eq!(cloud.load_balancer_ids().len(), 1);
    assert_eq!(service.hints, ServiceIdentityHints::default());
}
