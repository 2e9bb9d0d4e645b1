//! Tests for reconciling one service across a batch of hosts.

use std::sync::Arc;
use std::time::Duration;

use bootsys_core::batch::{run_service_action, ServiceAction};
use bootsys_core::service::{TargetEnabled, TargetState};
use bootsys_tests::{init_test_logging, FakeFleet};
use tokio::time::Instant;

fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| h.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_all_hosts_converge() {
    init_test_logging();
    let names = ["ncn-m001", "ncn-w001", "ncn-w002"];
    let fleet = FakeFleet::new().with_service_on(&names, "kubelet", "active", "enabled");
    let action = ServiceAction::new("kubelet", TargetState::Inactive).enabled(TargetEnabled::Disabled);

    run_service_action(&Arc::new(fleet.clone()), &hosts(&names), &action)
        .await
        .unwrap();

    for host in names {
        assert_eq!(
            fleet.service_state(host, "kubelet"),
            ("inactive".to_string(), "disabled".to_string())
        );
    }
    assert_eq!(fleet.open_sessions(), 0);
}

/// Hosts run side by side: the batch takes as long as the slowest host, not
/// the sum of all of them
#[tokio::test(start_paused = true)]
async fn test_hosts_run_concurrently() {
    let names = ["ncn-w001", "ncn-w002", "ncn-w003", "ncn-w004"];
    let mut fleet = FakeFleet::new().with_service_on(&names, "containerd", "active", "enabled");
    for (secs, host) in (1..).zip(names) {
        fleet = fleet.connect_delay(host, Duration::from_secs(secs));
    }
    let action = ServiceAction::new("containerd", TargetState::Active);

    let started = Instant::now();
    run_service_action(&Arc::new(fleet), &hosts(&names), &action)
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

/// One failed host fails the batch, but only after every other host has
/// finished its own reconciliation
#[tokio::test(start_paused = true)]
async fn test_failure_reported_after_all_hosts_finish() {
    let fleet = FakeFleet::new()
        .unreachable("ncn-w001")
        .with_service("ncn-w002", "containerd", "inactive", "disabled")
        .settle_after("ncn-w002", 2);
    let action = ServiceAction::new("containerd", TargetState::Active);

    let started = Instant::now();
    let err = run_service_action(
        &Arc::new(fleet.clone()),
        &hosts(&["ncn-w001", "ncn-w002"]),
        &action,
    )
    .await
    .unwrap_err();

    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(fleet.service_state("ncn-w002", "containerd").0, "active");
    assert_eq!(
        err.to_string(),
        "Failed to ensure containerd is active on all hosts."
    );
}

#[tokio::test(start_paused = true)]
async fn test_failure_message_names_target_not_hosts() {
    let fleet = FakeFleet::new()
        .with_service("ncn-m002", "kubelet", "active", "enabled")
        .fail_command("ncn-m002", "systemctl stop kubelet");
    let action = ServiceAction::new("kubelet", TargetState::Inactive).enabled(TargetEnabled::Disabled);

    let err = run_service_action(&Arc::new(fleet), &hosts(&["ncn-m002"]), &action)
        .await
        .unwrap_err();

    let message = err.to_string();
    assert_eq!(message, "Failed to ensure kubelet is inactive and disabled on all hosts.");
    assert!(!message.contains("ncn-m002"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_host_list_succeeds() {
    let fleet = FakeFleet::new();
    let action = ServiceAction::new("kubelet", TargetState::Active);

    run_service_action(&Arc::new(fleet.clone()), &[], &action)
        .await
        .unwrap();

    assert_eq!(fleet.journal().entries().len(), 0);
}

#[tokio::test]
async fn test_zero_timing_rejected_before_any_connection() {
    let fleet = FakeFleet::new();
    let action = ServiceAction::new("kubelet", TargetState::Active).timeout(Duration::ZERO);

    let err = run_service_action(&Arc::new(fleet.clone()), &hosts(&["ncn-w001"]), &action)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Invalid waiter timing"));
    assert_eq!(fleet.connects("ncn-w001"), 0);
}
