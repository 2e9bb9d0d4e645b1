//! SSH sessions built on the system `ssh` client.
//!
//! Each session owns one OpenSSH control master with a private control
//! socket. Commands are multiplexed over that master, so a session costs one
//! TCP connection and one authentication no matter how many commands it runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use super::{CommandOutput, RemoteConnector, RemoteError, RemoteSession};
use crate::config::SshConfig;

/// How often to look for the control socket while the master authenticates
const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for the master to exit after `-O exit`
const MASTER_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// ssh reserves exit status 255 for its own (connection) errors
const SSH_CONNECTION_ERROR: i32 = 255;

/// Opens [`SshSession`]s using the system ssh client
pub struct SshConnector {
    config: SshConfig,
    control_dir: PathBuf,
    next_session: AtomicU64,
}

impl SshConnector {
    pub fn new(config: SshConfig) -> Self {
        let control_dir = config
            .control_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        Self {
            config,
            control_dir,
            next_session: AtomicU64::new(0),
        }
    }

    /// Socket paths are kept short; unix sockets are limited to ~100 bytes
    fn next_control_path(&self) -> PathBuf {
        let n = self.next_session.fetch_add(1, Ordering::Relaxed);
        self.control_dir
            .join(format!("bootsys-{}-{}.sock", std::process::id(), n))
    }

    fn base_args(&self, control_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
        ];
        if let Some(port) = self.config.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(user) = &self.config.user {
            args.push("-l".to_string());
            args.push(user.clone());
        }
        if let Some(identity) = &self.config.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        for option in &self.config.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args
    }
}

impl RemoteConnector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, host: &str) -> Result<SshSession, RemoteError> {
        let control_path = self.next_control_path();
        let args = self.base_args(&control_path);

        // A leftover socket from a crashed run would look like a live master
        let _ = tokio::fs::remove_file(&control_path).await;

        debug!("Opening ssh control master to {}", host);
        let mut master = Command::new("ssh")
            .args(&args)
            .args(["-M", "-N"])
            .arg(host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RemoteError::connect(host, format!("failed to run ssh: {}", e)))?;

        let deadline = Instant::now() + self.config.connect_timeout;
        loop {
            if tokio::fs::try_exists(&control_path).await.unwrap_or(false) {
                break;
            }

            let exited = master
                .try_wait()
                .map_err(|e| RemoteError::connect(host, e))?;
            if let Some(status) = exited {
                let mut stderr = String::new();
                if let Some(mut pipe) = master.stderr.take() {
                    let _ = pipe.read_to_string(&mut stderr).await;
                }
                return Err(RemoteError::connect(
                    host,
                    format!("ssh exited with {}: {}", status, stderr.trim()),
                ));
            }

            if Instant::now() >= deadline {
                let _ = master.kill().await;
                return Err(RemoteError::connect(
                    host,
                    format!(
                        "timed out after {:?} waiting for the connection",
                        self.config.connect_timeout
                    ),
                ));
            }

            sleep(CONNECT_POLL_INTERVAL).await;
        }

        Ok(SshSession {
            host: host.to_string(),
            args,
            control_path,
            master: Some(master),
        })
    }
}

/// One host connection, backed by a dedicated control master
pub struct SshSession {
    host: String,
    args: Vec<String>,
    control_path: PathBuf,
    master: Option<Child>,
}

impl RemoteSession for SshSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn execute(&mut self, command: &str) -> Result<CommandOutput, RemoteError> {
        let output = Command::new("ssh")
            .args(&self.args)
            .args(["-o", "ControlMaster=no"])
            .arg(&self.host)
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RemoteError::connect(&self.host, format!("failed to run ssh: {}", e)))?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if exit_code == SSH_CONNECTION_ERROR {
            return Err(RemoteError::connect(&self.host, stderr.trim()));
        }

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    async fn disconnect(mut self) {
        let Some(mut master) = self.master.take() else {
            return;
        };

        let _ = Command::new("ssh")
            .args(&self.args)
            .args(["-O", "exit"])
            .arg(&self.host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        if timeout(MASTER_EXIT_TIMEOUT, master.wait()).await.is_err() {
            debug!("ssh master for {} did not exit, killing it", self.host);
            let _ = master.kill().await;
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        // The master itself is killed on drop; only the socket needs cleanup
        let _ = std::fs::remove_file(&self.control_path);
    }
}
