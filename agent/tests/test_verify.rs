//! Post-upgrade verification tests

mod common;

use std::time::Duration;

use common::{
    interfaces_status, redundancy_summary, route_summary, version_summary, MockTransport,
};

use fleetup::errors::UpgradeError;
use fleetup::telemetry::snapshot::StateSnapshot;
use fleetup::upgrade::verify::{verify_metrics, VerifyOptions};

fn options() -> VerifyOptions {
    VerifyOptions {
        max_attempts: 10,
        retry_delay: Duration::from_millis(1),
    }
}

/// Battery stubs whose non-varying commands repeat forever.
fn stub_static_battery(transport: &MockTransport) {
    transport.stub_battery(
        version_summary("4.30.2F", 1_500_000),
        route_summary(100),
        interfaces_status("connected"),
        redundancy_summary("active-full"),
    );
}

#[tokio::test]
async fn test_route_convergence_within_budget() {
    let transport = MockTransport::new();
    stub_static_battery(&transport);

    // pre capture consumes the first route summary (100 routes)
    let pre = StateSnapshot::capture(&transport).await.unwrap();

    // attempts 1-4 regress, attempt 5 converges
    for _ in 0..4 {
        transport.stub_structured("show ip route summary", route_summary(90));
    }
    transport.stub_structured("show ip route summary", route_summary(100));

    let result = verify_metrics(&transport, &pre, &options(), |_| async {})
        .await
        .unwrap();

    assert!(result.passed());
    assert_eq!(result.attempts, 5);
}

#[tokio::test]
async fn test_routes_passing_does_not_short_circuit_interfaces() {
    let transport = MockTransport::new();
    stub_static_battery(&transport);
    let pre = StateSnapshot::capture(&transport).await.unwrap();

    // routes stay fine, interfaces flap for two iterations
    transport.stub_structured("show interfaces status connected", interfaces_status("notconnect"));
    transport.stub_structured("show interfaces status connected", interfaces_status("notconnect"));
    transport.stub_structured("show interfaces status connected", interfaces_status("connected"));

    let result = verify_metrics(&transport, &pre, &options(), |_| async {})
        .await
        .unwrap();

    assert!(result.passed());
    assert_eq!(result.attempts, 3);
}

#[tokio::test]
async fn test_route_regression_exhausts_budget() {
    let transport = MockTransport::new();
    stub_static_battery(&transport);
    let pre = StateSnapshot::capture(&transport).await.unwrap();

    transport.stub_structured("show ip route summary", route_summary(90));

    let result = verify_metrics(&transport, &pre, &options(), |_| async {})
        .await
        .unwrap();

    assert!(!result.passed());
    assert_eq!(result.attempts, 10);
    assert!(!result.route_count_ok);
    assert!(matches!(
        result.failure,
        Some(UpgradeError::RouteRegression { pre: 100, post: 90 })
    ));
}

#[tokio::test]
async fn test_redundancy_mismatch_is_reported_in_order() {
    let transport = MockTransport::new();
    stub_static_battery(&transport);
    let pre = StateSnapshot::capture(&transport).await.unwrap();

    transport.stub_structured("show mlag interfaces", redundancy_summary("inactive"));

    let result = verify_metrics(&transport, &pre, &options(), |_| async {})
        .await
        .unwrap();

    assert!(!result.passed());
    assert!(result.route_count_ok);
    assert!(result.interfaces_ok);
    assert!(!result.redundancy_ok);
    assert!(matches!(
        result.failure,
        Some(UpgradeError::RedundancyStateMismatch)
    ));
}

#[tokio::test]
async fn test_route_growth_is_not_a_regression() {
    let transport = MockTransport::new();
    stub_static_battery(&transport);
    let pre = StateSnapshot::capture(&transport).await.unwrap();

    transport.stub_structured("show ip route summary", route_summary(120));

    let result = verify_metrics(&transport, &pre, &options(), |_| async {})
        .await
        .unwrap();

    assert!(result.passed());
    assert_eq!(result.attempts, 1);
}

#[tokio::test]
async fn test_every_iteration_recaptures_the_full_battery() {
    let transport = MockTransport::new();
    stub_static_battery(&transport);
    let pre = StateSnapshot::capture(&transport).await.unwrap();

    transport.stub_structured("show ip route summary", route_summary(90));
    transport.stub_structured("show ip route summary", route_summary(90));
    transport.stub_structured("show ip route summary", route_summary(100));

    let issued_before = transport
        .issued()
        .iter()
        .filter(|c| c.as_str() == "show version")
        .count();

    let result = verify_metrics(&transport, &pre, &options(), |_| async {})
        .await
        .unwrap();
    assert!(result.passed());
    assert_eq!(result.attempts, 3);

    // each of the three iterations re-ran the whole battery, including the
    // version summary that never gates verification
    let issued_after = transport
        .issued()
        .iter()
        .filter(|c| c.as_str() == "show version")
        .count();
    assert_eq!(issued_after - issued_before, 3);
}
