//! Reconcile one service across many hosts in parallel.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::errors::{PlatformError, Result};
use crate::remote::RemoteConnector;
use crate::service::{describe_target, ServiceReconciler, TargetEnabled, TargetState};
use crate::waiter::Waiter;

/// Default per-host timeout for a service start/stop
pub const SERVICE_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cadence for re-checking a service's state
pub const SERVICE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A service state change to apply on every host of a batch
#[derive(Debug, Clone)]
pub struct ServiceAction {
    pub service: String,
    pub target_state: TargetState,
    pub target_enabled: Option<TargetEnabled>,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ServiceAction {
    pub fn new(service: impl Into<String>, target_state: TargetState) -> Self {
        Self {
            service: service.into(),
            target_state,
            target_enabled: None,
            timeout: SERVICE_ACTION_TIMEOUT,
            poll_interval: SERVICE_POLL_INTERVAL,
        }
    }

    pub fn enabled(mut self, target_enabled: TargetEnabled) -> Self {
        self.target_enabled = Some(target_enabled);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn failure(&self) -> PlatformError {
        PlatformError::Fatal(format!(
            "Failed to ensure {} is {} on all hosts.",
            self.service,
            describe_target(self.target_state, self.target_enabled)
        ))
    }
}

/// Apply `action` on every host and wait for all of them.
///
/// Every host is started before any is awaited, so the batch takes as long
/// as its slowest host. A failure is reported only after all hosts have
/// finished, and it names the service and target but not the hosts; those
/// are in the log.
///
/// There is no cap on simultaneous connections: one session per host is
/// opened at once. Very large fleets may want to chunk `hosts`.
pub async fn run_service_action<K: RemoteConnector>(
    connector: &Arc<K>,
    hosts: &[String],
    action: &ServiceAction,
) -> Result<()> {
    // Build (and validate) every waiter before starting any of them
    let waiters = hosts
        .iter()
        .map(|host| {
            let reconciler = ServiceReconciler::new(
                Arc::clone(connector),
                host.clone(),
                action.service.clone(),
                action.target_state,
                action.target_enabled,
            );
            Waiter::new(reconciler, action.timeout, action.poll_interval)
        })
        .collect::<Result<Vec<_>>>()?;

    let handles: Vec<_> = waiters.into_iter().map(Waiter::start_async).collect();

    let mut failed = 0usize;
    for (host, handle) in hosts.iter().zip(handles) {
        if !handle.await_completion().await {
            error!(
                "Failed to ensure {} is {} on host {}",
                action.service,
                describe_target(action.target_state, action.target_enabled),
                host
            );
            failed += 1;
        }
    }

    if failed > 0 {
        error!(
            "{} of {} hosts did not converge for service {}",
            failed,
            hosts.len(),
            action.service
        );
        return Err(action.failure());
    }

    info!(
        "Service {} is {} on {} hosts",
        action.service,
        describe_target(action.target_state, action.target_enabled),
        hosts.len()
    );
    Ok(())
}
