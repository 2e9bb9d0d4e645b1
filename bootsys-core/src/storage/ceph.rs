//! [`StorageCluster`] backed by the `ceph` command line tool

use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{StorageCluster, StorageError};
use crate::config::StorageConfig;

/// The subset of `ceph health --format json` that decides freezability
#[derive(Debug, Deserialize)]
struct HealthReport {
    status: String,
    #[serde(default)]
    checks: serde_json::Map<String, serde_json::Value>,
}

pub struct CephCli {
    command: String,
    freeze_flags: Vec<String>,
    tolerated_warnings: Vec<String>,
}

impl CephCli {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            command: config.command.clone(),
            freeze_flags: config.freeze_flags.clone(),
            tolerated_warnings: config.tolerated_warnings.clone(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, StorageError> {
        let rendered = format!("{} {}", self.command, args.join(" "));
        debug!("Running {}", rendered);

        let output = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| StorageError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(StorageError::Command {
                command: rendered,
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// HEALTH_OK, or HEALTH_WARN made only of tolerated checks
    pub(crate) fn is_healthy(&self, raw: &str) -> Result<bool, StorageError> {
        let report: HealthReport =
            serde_json::from_str(raw).map_err(|e| StorageError::Parse(e.to_string()))?;

        match report.status.as_str() {
            "HEALTH_OK" => Ok(true),
            "HEALTH_WARN" => {
                let blocking: Vec<&String> = report
                    .checks
                    .keys()
                    .filter(|check| !self.tolerated_warnings.contains(check))
                    .collect();
                if blocking.is_empty() {
                    Ok(true)
                } else {
                    warn!("Storage cluster has blocking health warnings: {:?}", blocking);
                    Ok(false)
                }
            }
            other => {
                warn!("Storage cluster health is {}", other);
                Ok(false)
            }
        }
    }
}

impl StorageCluster for CephCli {
    async fn health(&self) -> Result<bool, StorageError> {
        let raw = self.run(&["health", "--format", "json"]).await?;
        self.is_healthy(&raw)
    }

    async fn freeze(&self) -> Result<(), StorageError> {
        for flag in &self.freeze_flags {
            self.run(&["osd", "set", flag.as_str()]).await?;
            info!("Set storage flag {}", flag);
        }
        Ok(())
    }
}
