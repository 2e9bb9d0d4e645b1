//! Ordered, fail-fast execution of the platform start and stop steps.
//!
//! Node groups are resolved and confirmed once, then each step runs to
//! completion before the next begins. The first failing step ends the run;
//! steps that already finished are not undone.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::batch::{run_service_action, ServiceAction, SERVICE_ACTION_TIMEOUT, SERVICE_POLL_INTERVAL};
use crate::config::ServicesConfig;
use crate::drain::stop_containers_on_hosts;
use crate::errors::{PlatformError, Result};
use crate::groups::{resolve_node_groups, Confirm, Inventory, NodeGroups};
use crate::remote::RemoteConnector;
use crate::service::{TargetEnabled, TargetState};
use crate::storage::{check_health_and_freeze, StorageCluster};

pub const CONTAINER_RUNTIME: &str = "containerd";
pub const NODE_AGENT: &str = "kubelet";

/// What to do to the platform services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformAction {
    Start,
    Stop,
}

impl PlatformAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformAction::Start => "start",
            PlatformAction::Stop => "stop",
        }
    }

    /// The fixed, ordered steps of this action
    pub fn steps(&self) -> &'static [PlatformStep] {
        match self {
            PlatformAction::Start => START_STEPS,
            PlatformAction::Stop => STOP_STEPS,
        }
    }
}

impl FromStr for PlatformAction {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(PlatformAction::Start),
            "stop" => Ok(PlatformAction::Stop),
            other => Err(PlatformError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for PlatformAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    StopNodeAgent,
    StopContainerRuntime,
    FreezeStorage,
    StartContainerRuntime,
    StartNodeAgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformStep {
    pub description: &'static str,
    pub kind: StepKind,
}

// The container runtime comes up before the node agent that schedules onto
// it, and goes down only after that agent has stopped.
const START_STEPS: &[PlatformStep] = &[
    PlatformStep {
        description: "Start containerd on all Kubernetes NCNs.",
        kind: StepKind::StartContainerRuntime,
    },
    PlatformStep {
        description: "Start and enable kubelet on all Kubernetes NCNs.",
        kind: StepKind::StartNodeAgent,
    },
];

const STOP_STEPS: &[PlatformStep] = &[
    PlatformStep {
        description: "Stop and disable kubelet on all Kubernetes NCNs.",
        kind: StepKind::StopNodeAgent,
    },
    PlatformStep {
        description: "Stop containers running under containerd and stop containerd on all Kubernetes NCNs.",
        kind: StepKind::StopContainerRuntime,
    },
    PlatformStep {
        description: "Check health of Ceph cluster and freeze state.",
        kind: StepKind::FreezeStorage,
    },
];

/// Runs platform actions against a fleet and a storage cluster
pub struct PlatformSequencer<K, S> {
    connector: Arc<K>,
    storage: S,
    action_timeout: Duration,
    poll_interval: Duration,
}

impl<K: RemoteConnector, S: StorageCluster> PlatformSequencer<K, S> {
    pub fn new(connector: Arc<K>, storage: S) -> Self {
        Self {
            connector,
            storage,
            action_timeout: SERVICE_ACTION_TIMEOUT,
            poll_interval: SERVICE_POLL_INTERVAL,
        }
    }

    /// Use the per-host timeout and poll cadence from config
    pub fn with_timing(mut self, services: &ServicesConfig) -> Self {
        self.action_timeout = services.action_timeout;
        self.poll_interval = services.poll_interval;
        self
    }

    /// Confirm the node groups, then run every step of `action` in order
    pub async fn run<I, C>(&self, action: PlatformAction, inventory: &I, confirm: &C) -> Result<()>
    where
        I: Inventory + ?Sized,
        C: Confirm + ?Sized,
    {
        let groups = resolve_node_groups(inventory, confirm).inspect_err(|e| {
            error!("Not proceeding with platform {}: {}", action, e);
        })?;
        self.execute(action, &groups).await
    }

    /// Run every step of `action` in order against already confirmed groups
    pub async fn execute(&self, action: PlatformAction, groups: &NodeGroups) -> Result<()> {
        for step in action.steps() {
            info!("Executing step: {}", step.description);
            if let Err(e) = self.run_step(step.kind, groups).await {
                error!(
                    "Fatal error during platform {} step \"{}\": {}",
                    action, step.description, e
                );
                return Err(PlatformError::StepFailed {
                    step: step.description.to_string(),
                    source: Box::new(e),
                });
            }
        }
        info!("Platform {} completed on {} hosts", action, groups.kubernetes().len());
        Ok(())
    }

    pub async fn run_step(&self, kind: StepKind, groups: &NodeGroups) -> Result<()> {
        let hosts = groups.kubernetes();
        match kind {
            StepKind::StopNodeAgent => {
                let action = self
                    .service_action(NODE_AGENT, TargetState::Inactive)
                    .enabled(TargetEnabled::Disabled);
                run_service_action(&self.connector, hosts, &action).await
            }
            StepKind::StopContainerRuntime => {
                stop_containers_on_hosts(&self.connector, hosts).await;
                let action = self.service_action(CONTAINER_RUNTIME, TargetState::Inactive);
                run_service_action(&self.connector, hosts, &action).await
            }
            StepKind::FreezeStorage => check_health_and_freeze(&self.storage).await,
            StepKind::StartContainerRuntime => {
                let action = self
                    .service_action(CONTAINER_RUNTIME, TargetState::Active)
                    .enabled(TargetEnabled::Enabled);
                run_service_action(&self.connector, hosts, &action).await
            }
            StepKind::StartNodeAgent => {
                let action = self
                    .service_action(NODE_AGENT, TargetState::Active)
                    .enabled(TargetEnabled::Enabled);
                run_service_action(&self.connector, hosts, &action).await
            }
        }
    }

    fn service_action(&self, service: &str, target_state: TargetState) -> ServiceAction {
        ServiceAction::new(service, target_state)
            .timeout(self.action_timeout)
            .poll_interval(self.poll_interval)
    }
}
