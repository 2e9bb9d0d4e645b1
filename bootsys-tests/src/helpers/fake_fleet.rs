//! In-memory fleet of hosts running systemd services
//!
//! Understands the commands bootsys issues (`systemctl is-active|is-enabled|
//! start|stop|enable|disable <svc>` and the container stop script) and keeps
//! per-host service state, so tests can assert on exactly which commands ran
//! where and in what order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bootsys_core::drain::CONTAINER_STOP_SCRIPT;
use bootsys_core::remote::{CommandOutput, RemoteConnector, RemoteError, RemoteSession};
use tokio::time::sleep;
use tracing::debug;

/// Ordered record of everything that happened across the fleet (and anything
/// else that shares it), as `"<who>: <what>"` lines
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Index of the first entry containing `needle`
    pub fn first(&self, needle: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.contains(needle))
    }

    /// Index of the last entry containing `needle`
    pub fn last(&self, needle: &str) -> Option<usize> {
        self.entries().iter().rposition(|e| e.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.entries().iter().filter(|e| e.contains(needle)).count()
    }
}

#[derive(Debug, Clone)]
struct ServiceState {
    active: String,
    enabled: String,
    /// Active state waiting to land, and how many more `is-active` queries
    /// still see the old one
    pending: Option<(String, u32)>,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            active: "inactive".to_string(),
            enabled: "disabled".to_string(),
            pending: None,
        }
    }
}

#[derive(Default)]
struct HostState {
    services: HashMap<String, ServiceState>,
    commands: Vec<String>,
    failing_commands: Vec<String>,
    unreachable: bool,
    connect_delay: Duration,
    settle_after: u32,
    connects: u32,
    open_sessions: i32,
}

impl HostState {
    fn service(&mut self, name: &str) -> &mut ServiceState {
        self.services.entry(name.to_string()).or_default()
    }
}

#[derive(Default)]
struct FleetState {
    hosts: HashMap<String, HostState>,
}

/// A fleet of fake hosts; hosts not configured explicitly are reachable and
/// have every service inactive and disabled
#[derive(Clone, Default)]
pub struct FakeFleet {
    state: Arc<Mutex<FleetState>>,
    journal: Journal,
}

impl FakeFleet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.state.lock().unwrap()
    }

    fn with_host(self, host: &str, f: impl FnOnce(&mut HostState)) -> Self {
        f(self.lock().hosts.entry(host.to_string()).or_default());
        self
    }

    /// Set the current state of `service` on `host`
    pub fn with_service(self, host: &str, service: &str, active: &str, enabled: &str) -> Self {
        self.with_host(host, |h| {
            let svc = h.service(service);
            svc.active = active.to_string();
            svc.enabled = enabled.to_string();
        })
    }

    /// Set the same service state on several hosts
    pub fn with_service_on(
        mut self,
        hosts: &[&str],
        service: &str,
        active: &str,
        enabled: &str,
    ) -> Self {
        for host in hosts {
            self = self.with_service(host, service, active, enabled);
        }
        self
    }

    /// Connections to `host` fail
    pub fn unreachable(self, host: &str) -> Self {
        self.with_host(host, |h| h.unreachable = true)
    }

    /// Connecting to `host` takes `delay`
    pub fn connect_delay(self, host: &str, delay: Duration) -> Self {
        self.with_host(host, |h| h.connect_delay = delay)
    }

    /// `command` exits non-zero on `host`
    pub fn fail_command(self, host: &str, command: &str) -> Self {
        self.with_host(host, |h| h.failing_commands.push(command.to_string()))
    }

    /// Start/stop on `host` is only visible after `polls` further
    /// `is-active` queries
    pub fn settle_after(self, host: &str, polls: u32) -> Self {
        self.with_host(host, |h| h.settle_after = polls)
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Commands run on `host`, in order
    pub fn commands(&self, host: &str) -> Vec<String> {
        self.lock()
            .hosts
            .get(host)
            .map(|h| h.commands.clone())
            .unwrap_or_default()
    }

    /// How many times `command` ran on `host`
    pub fn command_count(&self, host: &str, command: &str) -> usize {
        self.commands(host).iter().filter(|c| *c == command).count()
    }

    /// Control commands (anything but status queries) run on `host`
    pub fn control_commands(&self, host: &str) -> Vec<String> {
        self.commands(host)
            .into_iter()
            .filter(|c| !c.contains(" is-active ") && !c.contains(" is-enabled "))
            .collect()
    }

    /// `(active, enabled)` of `service` on `host`
    pub fn service_state(&self, host: &str, service: &str) -> (String, String) {
        let mut state = self.lock();
        let svc = state.hosts.entry(host.to_string()).or_default().service(service);
        (svc.active.clone(), svc.enabled.clone())
    }

    pub fn connects(&self, host: &str) -> u32 {
        self.lock().hosts.get(host).map(|h| h.connects).unwrap_or(0)
    }

    /// Sessions opened and not yet disconnected, across all hosts
    pub fn open_sessions(&self) -> i32 {
        self.lock().hosts.values().map(|h| h.open_sessions).sum()
    }

    fn run(&self, host: &str, command: &str) -> CommandOutput {
        let mut state = self.lock();
        let h = state.hosts.entry(host.to_string()).or_default();
        h.commands.push(command.to_string());
        self.journal.record(format!("{}: {}", host, command));

        if h.failing_commands.iter().any(|c| c == command) {
            return exit(1, "", "simulated failure");
        }
        if command == CONTAINER_STOP_SCRIPT {
            return exit(0, "", "");
        }

        let parts: Vec<&str> = command.split_whitespace().collect();
        let ["systemctl", verb, service] = parts.as_slice() else {
            return exit(127, "", "command not found");
        };

        let settle_after = h.settle_after;
        let svc = h.service(service);
        match *verb {
            "is-active" => {
                if let Some((target, remaining)) = svc.pending.take() {
                    if remaining == 0 {
                        svc.active = target;
                    } else {
                        svc.pending = Some((target, remaining - 1));
                    }
                }
                let code = if svc.active == "active" { 0 } else { 3 };
                exit(code, &format!("{}\n", svc.active), "")
            }
            "is-enabled" => {
                let code = if svc.enabled == "enabled" { 0 } else { 1 };
                exit(code, &format!("{}\n", svc.enabled), "")
            }
            "start" | "stop" => {
                let target = if *verb == "start" { "active" } else { "inactive" };
                if settle_after == 0 {
                    svc.active = target.to_string();
                } else {
                    svc.pending = Some((target.to_string(), settle_after));
                }
                exit(0, "", "")
            }
            "enable" | "disable" => {
                svc.enabled = format!("{}d", verb);
                exit(0, "", "")
            }
            _ => exit(1, "", "unknown operation"),
        }
    }
}

fn exit(exit_code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

impl RemoteConnector for FakeFleet {
    type Session = FakeSession;

    async fn connect(&self, host: &str) -> Result<FakeSession, RemoteError> {
        let (delay, unreachable) = {
            let mut state = self.lock();
            let h = state.hosts.entry(host.to_string()).or_default();
            h.connects += 1;
            (h.connect_delay, h.unreachable)
        };
        self.journal.record(format!("{}: connect", host));

        if !delay.is_zero() {
            sleep(delay).await;
        }
        if unreachable {
            return Err(RemoteError::connect(host, "simulated connection refused"));
        }

        if let Some(h) = self.lock().hosts.get_mut(host) {
            h.open_sessions += 1;
        }
        debug!("Fake session opened to {}", host);
        Ok(FakeSession {
            host: host.to_string(),
            fleet: self.clone(),
        })
    }
}

pub struct FakeSession {
    host: String,
    fleet: FakeFleet,
}

impl RemoteSession for FakeSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn execute(&mut self, command: &str) -> Result<CommandOutput, RemoteError> {
        Ok(self.fleet.run(&self.host, command))
    }

    async fn disconnect(self) {
        if let Some(h) = self.fleet.lock().hosts.get_mut(&self.host) {
            h.open_sessions -= 1;
        }
    }
}
