//! Remote command execution boundary.
//!
//! A [`RemoteConnector`] opens one exclusively owned [`RemoteSession`] per
//! host. Sessions are never pooled or shared across hosts: each reconciler and
//! each drain worker opens its own and releases it when done.

mod error;
mod ssh;

pub use error::RemoteError;
pub use ssh::{SshConnector, SshSession};

use std::future::Future;
use tracing::debug;

/// Result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// First line of stdout, trimmed. Status queries answer with a single token.
    pub fn token(&self) -> &str {
        self.stdout.lines().next().unwrap_or("").trim()
    }
}

/// Opens sessions to hosts
pub trait RemoteConnector: Send + Sync + 'static {
    type Session: RemoteSession;

    /// Connect to `host`. Failure is always [`RemoteError::Connect`].
    fn connect(
        &self,
        host: &str,
    ) -> impl Future<Output = Result<Self::Session, RemoteError>> + Send;
}

/// A live connection to one host
pub trait RemoteSession: Send + 'static {
    fn host(&self) -> &str;

    /// Run `command` and report its exit status and output.
    ///
    /// A non-zero exit is not an error at this level; callers that require
    /// success use [`RemoteSession::run_checked`].
    fn execute(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<CommandOutput, RemoteError>> + Send;

    /// Release the connection
    fn disconnect(self) -> impl Future<Output = ()> + Send;

    /// Run `command`, turning a non-zero exit into [`RemoteError::Command`]
    fn run_checked(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<CommandOutput, RemoteError>> + Send
    where
        Self: Sized,
    {
        async move {
            debug!("Executing command \"{}\" on host {}", command, self.host());
            let output = self.execute(command).await?;
            if !output.success() {
                return Err(RemoteError::Command {
                    host: self.host().to_string(),
                    command: command.to_string(),
                    exit_code: output.exit_code,
                    stdout: output.stdout.trim().to_string(),
                    stderr: output.stderr.trim().to_string(),
                });
            }
            Ok(output)
        }
    }
}
