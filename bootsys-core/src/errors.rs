use std::path::PathBuf;
use thiserror::Error;

/// Format a YAML error for user-friendly display, including the field path
fn format_yaml_error(e: &serde_path_to_error::Error<serde_yaml::Error>) -> String {
    let path = e.path().to_string();
    let inner = e.inner();
    let msg = inner.to_string();

    let located = match inner.location() {
        Some(loc) => format!("Line {}, Column {}: {}", loc.line(), loc.column(), msg),
        None => msg,
    };

    if path.is_empty() || path == "." {
        located
    } else {
        format!("{}: {}", path, located)
    }
}

/// Errors that end a platform action.
///
/// Per-host remote failures are not part of this enum: they are absorbed by
/// the waiter that hit them (see [`crate::remote::RemoteError`]).
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Invalid target state {0}. Must be one of ('active', 'inactive')")]
    InvalidTargetState(String),

    #[error("Invalid target enabled {0}. Must be one of ('enabled', 'disabled')")]
    InvalidTargetEnabled(String),

    #[error("Invalid waiter timing: timeout {timeout:?} and poll interval {poll_interval:?} must both be positive")]
    InvalidWaiterTiming {
        timeout: std::time::Duration,
        poll_interval: std::time::Duration,
    },

    #[error("Invalid action \"{0}\" to perform on platform services")]
    InvalidAction(String),

    #[error("Failed to identify members of the following NCN group(s): {0:?}")]
    TopologyDiscovery(Vec<String>),

    #[error("User indicated NCN groups are incorrect.")]
    ConfirmationDeclined,

    #[error("{0}")]
    Fatal(String),

    #[error("Fatal error during step \"{step}\": {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<PlatformError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse config file '{path}':\n  {}", format_yaml_error(.source))]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_yaml::Error>,
    },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlatformError>;
