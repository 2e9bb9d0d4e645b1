//! Configuration for bootsys
//!
//! One YAML file describes the fleet inventory, how to reach hosts over SSH,
//! how long to wait on service changes, and how to talk to the storage cluster.
//! Every section is optional; defaults match a stock management cluster.

mod duration;

pub use duration::{format_duration, parse_duration};

use duration::deserialize_duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::errors::{PlatformError, Result};

/// File names searched for when no explicit config path is given
pub const CONFIG_FILE_NAMES: &[&str] = &["bootsys.yaml", "bootsys.yml"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootsysConfig {
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Static role membership of the management nodes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    #[serde(default)]
    pub managers: Vec<String>,
    #[serde(default)]
    pub workers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshConfig {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    #[serde(default = "default_connect_timeout", deserialize_with = "deserialize_duration")]
    pub connect_timeout: Duration,
    /// Extra `-o` options passed verbatim to ssh
    #[serde(default = "default_ssh_options")]
    pub options: Vec<String>,
    /// Where per-session control sockets are created (defaults to the temp dir)
    #[serde(default)]
    pub control_dir: Option<PathBuf>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: None,
            port: None,
            identity_file: None,
            connect_timeout: default_connect_timeout(),
            options: default_ssh_options(),
            control_dir: None,
        }
    }
}

/// Timing used when reconciling platform services on each host
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesConfig {
    #[serde(default = "default_action_timeout", deserialize_with = "deserialize_duration")]
    pub action_timeout: Duration,
    #[serde(default = "default_poll_interval", deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            action_timeout: default_action_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_storage_command")]
    pub command: String,
    #[serde(default = "default_freeze_flags")]
    pub freeze_flags: Vec<String>,
    /// HEALTH_WARN checks that do not block a freeze
    #[serde(default)]
    pub tolerated_warnings: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            command: default_storage_command(),
            freeze_flags: default_freeze_flags(),
            tolerated_warnings: Vec::new(),
        }
    }
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_ssh_options() -> Vec<String> {
    // Keepalives end a session whose host stops answering mid-command
    [
        "StrictHostKeyChecking=accept-new",
        "ServerAliveInterval=15",
        "ServerAliveCountMax=3",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_action_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_storage_command() -> String {
    "ceph".to_string()
}

fn default_freeze_flags() -> Vec<String> {
    ["noout", "norecover", "nobackfill"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl BootsysConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlatformError::ConfigNotFound(path.to_path_buf())
            } else {
                PlatformError::Io(e)
            }
        })?;
        let config = Self::parse(&contents, path)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config text; `path` is only used in error messages
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        // An empty file is a valid, all-defaults config
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let deserializer = serde_yaml::Deserializer::from_str(contents);
        let config: Self = serde_path_to_error::deserialize(deserializer).map_err(|source| {
            PlatformError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.services.action_timeout.is_zero() {
            return Err(PlatformError::Config(
                "services.action_timeout must be greater than zero".to_string(),
            ));
        }
        if self.services.poll_interval.is_zero() {
            return Err(PlatformError::Config(
                "services.poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Find a config file in `start_dir` or any of its parents
    pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            for name in CONFIG_FILE_NAMES {
                let candidate = current.join(name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve the config path from an explicit option, the current directory
    /// tree, or the user config directory, in that order
    pub fn resolve_config_path(file: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = file {
            return Ok(path.to_path_buf());
        }

        let cwd = std::env::current_dir()?;
        if let Some(found) = Self::find_config_file(&cwd) {
            return Ok(found);
        }

        dirs::config_dir()
            .map(|dir| dir.join("bootsys").join(CONFIG_FILE_NAMES[0]))
            .filter(|path| path.exists())
            .ok_or_else(|| PlatformError::ConfigNotFound(PathBuf::from(CONFIG_FILE_NAMES[0])))
    }
}
