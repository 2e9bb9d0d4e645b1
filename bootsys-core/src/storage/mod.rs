//! Storage cluster health gate and freeze.

mod ceph;

pub use ceph::CephCli;

use std::future::Future;

use tracing::{error, info};

use crate::errors::{PlatformError, Result};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' failed with exit code {exit_code:?}: {stderr}")]
    Command {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Unable to parse storage health output: {0}")]
    Parse(String),
}

/// The storage cluster collaborator
pub trait StorageCluster: Send + Sync {
    /// Whether the cluster is healthy enough to freeze
    fn health(&self) -> impl Future<Output = std::result::Result<bool, StorageError>> + Send;

    /// Stop data movement in the cluster
    fn freeze(&self) -> impl Future<Output = std::result::Result<(), StorageError>> + Send;
}

/// Freeze the storage cluster, but only if it is healthy.
///
/// An unhealthy cluster is never frozen and is not retried: the operator has
/// to fix it first.
pub async fn check_health_and_freeze<S: StorageCluster>(cluster: &S) -> Result<()> {
    let healthy = cluster
        .health()
        .await
        .map_err(|e| PlatformError::Fatal(e.to_string()))?;
    if !healthy {
        error!("Storage cluster is not healthy, refusing to freeze it");
        return Err(PlatformError::Fatal(
            "Ceph is not healthy. Please correct Ceph health and try again.".to_string(),
        ));
    }

    cluster
        .freeze()
        .await
        .map_err(|e| PlatformError::Fatal(e.to_string()))?;
    info!("Storage cluster frozen");
    Ok(())
}

#[cfg(test)]
mod tests;
