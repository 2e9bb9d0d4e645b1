//! Scriptable storage cluster

use std::sync::atomic::{AtomicU32, Ordering};

use bootsys_core::storage::{StorageCluster, StorageError};

use super::fake_fleet::Journal;

pub struct FakeStorage {
    healthy: bool,
    freeze_fails: bool,
    health_checks: AtomicU32,
    freezes: AtomicU32,
    journal: Option<Journal>,
}

impl FakeStorage {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            freeze_fails: false,
            health_checks: AtomicU32::new(0),
            freezes: AtomicU32::new(0),
            journal: None,
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::healthy()
        }
    }

    /// Healthy, but every freeze attempt fails
    pub fn freeze_fails(mut self) -> Self {
        self.freeze_fails = true;
        self
    }

    /// Record health checks and freezes as `storage: health` / `storage: freeze`
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn health_checks(&self) -> u32 {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub fn freezes(&self) -> u32 {
        self.freezes.load(Ordering::SeqCst)
    }

    fn record(&self, what: &str) {
        if let Some(journal) = &self.journal {
            journal.record(format!("storage: {}", what));
        }
    }
}

impl StorageCluster for FakeStorage {
    async fn health(&self) -> Result<bool, StorageError> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        self.record("health");
        Ok(self.healthy)
    }

    async fn freeze(&self) -> Result<(), StorageError> {
        self.freezes.fetch_add(1, Ordering::SeqCst);
        self.record("freeze");
        if self.freeze_fails {
            return Err(StorageError::Command {
                command: "ceph osd set noout".to_string(),
                exit_code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}
