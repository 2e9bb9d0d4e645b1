//! Errors scoped to a single host's remote session

/// Transient, per-host failures.
///
/// These are always recovered at the waiter boundary: logged and turned into
/// a not-completed outcome for the one host that produced them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("Failed to connect to host {host}: {message}")]
    Connect { host: String, message: String },

    #[error(
        "Command {command} on host {host} returned non-zero exit code {exit_code}. \
         Stdout: \"{stdout}\" Stderr: \"{stderr}\""
    )]
    Command {
        host: String,
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

impl RemoteError {
    pub fn connect(host: &str, message: impl std::fmt::Display) -> Self {
        RemoteError::Connect {
            host: host.to_string(),
            message: message.to_string(),
        }
    }

    /// Host the failure happened on
    pub fn host(&self) -> &str {
        match self {
            RemoteError::Connect { host, .. } | RemoteError::Command { host, .. } => host,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, RemoteError::Connect { .. })
    }
}
