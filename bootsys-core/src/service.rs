//! Drive one systemd service on one host to a target state.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::errors::PlatformError;
use crate::remote::{RemoteConnector, RemoteError, RemoteSession};
use crate::waiter::Condition;

/// Desired active/inactive state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    Active,
    Inactive,
}

impl TargetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetState::Active => "active",
            TargetState::Inactive => "inactive",
        }
    }

    /// The systemctl verb that moves a service into this state
    fn control_verb(&self) -> &'static str {
        match self {
            TargetState::Active => "start",
            TargetState::Inactive => "stop",
        }
    }
}

impl FromStr for TargetState {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TargetState::Active),
            "inactive" => Ok(TargetState::Inactive),
            other => Err(PlatformError::InvalidTargetState(other.to_string())),
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired enabled/disabled state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetEnabled {
    Enabled,
    Disabled,
}

impl TargetEnabled {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetEnabled::Enabled => "enabled",
            TargetEnabled::Disabled => "disabled",
        }
    }

    fn control_verb(&self) -> &'static str {
        match self {
            TargetEnabled::Enabled => "enable",
            TargetEnabled::Disabled => "disable",
        }
    }
}

impl FromStr for TargetEnabled {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(TargetEnabled::Enabled),
            "disabled" => Ok(TargetEnabled::Disabled),
            other => Err(PlatformError::InvalidTargetEnabled(other.to_string())),
        }
    }
}

impl fmt::Display for TargetEnabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `"<state> "` or `"<state> and <enabled> "`, shared by log lines and errors
pub(crate) fn describe_target(state: TargetState, enabled: Option<TargetEnabled>) -> String {
    match enabled {
        Some(enabled) => format!("{} and {}", state, enabled),
        None => state.to_string(),
    }
}

/// Start/stop and optionally enable/disable a service over a remote session,
/// then wait for it to reach the target state.
///
/// The enabled/disabled state is set once during the action and is not
/// re-checked while polling.
pub struct ServiceReconciler<K: RemoteConnector> {
    host: String,
    service_name: String,
    target_state: TargetState,
    target_enabled: Option<TargetEnabled>,
    connector: Arc<K>,
    session: Option<K::Session>,
}

impl<K: RemoteConnector> ServiceReconciler<K> {
    pub fn new(
        connector: Arc<K>,
        host: impl Into<String>,
        service_name: impl Into<String>,
        target_state: TargetState,
        target_enabled: Option<TargetEnabled>,
    ) -> Self {
        Self {
            host: host.into(),
            service_name: service_name.into(),
            target_state,
            target_enabled,
            connector,
            session: None,
        }
    }

    /// Build from textual targets, rejecting anything that is not one of the
    /// known values
    pub fn parse(
        connector: Arc<K>,
        host: impl Into<String>,
        service_name: impl Into<String>,
        target_state: &str,
        target_enabled: Option<&str>,
    ) -> Result<Self, PlatformError> {
        let target_state = target_state.parse()?;
        let target_enabled = target_enabled.map(str::parse).transpose()?;
        Ok(Self::new(connector, host, service_name, target_state, target_enabled))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn target_state(&self) -> TargetState {
        self.target_state
    }

    pub fn target_enabled(&self) -> Option<TargetEnabled> {
        self.target_enabled
    }

    fn session(&mut self) -> Result<&mut K::Session, RemoteError> {
        let host = &self.host;
        self.session
            .as_mut()
            .ok_or_else(|| RemoteError::connect(host, "no open session"))
    }

    /// Query a status token; `systemctl is-*` exits non-zero for the negative
    /// answer, so the exit code is ignored
    async fn query(&mut self, verb: &str) -> Result<String, RemoteError> {
        let command = format!("systemctl {} {}", verb, self.service_name);
        let session = self.session()?;
        debug!("Executing command \"{}\" on host {}", command, session.host());
        let output = session.execute(&command).await?;
        Ok(output.token().to_string())
    }

    async fn control(&mut self, verb: &str) -> Result<(), RemoteError> {
        let command = format!("systemctl {} {}", verb, self.service_name);
        self.session()?.run_checked(&command).await.map(|_| ())
    }

    async fn is_in_target_state(&mut self) -> Result<bool, RemoteError> {
        let current = self.query("is-active").await?;
        Ok(current == self.target_state.as_str())
    }

    async fn reconcile_enabled(&mut self) -> Result<(), RemoteError> {
        let Some(target_enabled) = self.target_enabled else {
            return Ok(());
        };
        let current = self.query("is-enabled").await?;
        if current == target_enabled.as_str() {
            return Ok(());
        }
        debug!(
            "Found service {} not in {} state on host {}.",
            self.service_name, target_enabled, self.host
        );
        self.control(target_enabled.control_verb()).await
    }
}

impl<K: RemoteConnector> Condition for ServiceReconciler<K> {
    fn condition_name(&self) -> String {
        format!(
            "service {} {} on {}",
            self.service_name,
            describe_target(self.target_state, self.target_enabled),
            self.host
        )
    }

    async fn pre_wait_action(&mut self) -> Result<bool, RemoteError> {
        let session = self.connector.connect(&self.host).await?;
        self.session = Some(session);

        let already_satisfied = self.is_in_target_state().await?;
        let state_result = if already_satisfied {
            Ok(())
        } else {
            debug!(
                "Found service {} not in {} state on host {}.",
                self.service_name, self.target_state, self.host
            );
            self.control(self.target_state.control_verb()).await
        };

        // Enabling/disabling is its own step and runs even if the state change failed
        let enabled_result = self.reconcile_enabled().await;

        state_result?;
        enabled_result?;
        Ok(already_satisfied)
    }

    async fn has_completed(&mut self) -> Result<bool, RemoteError> {
        self.is_in_target_state().await
    }

    async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            session.disconnect().await;
        }
    }
}

#[cfg(test)]
mod tests;
