use super::*;
use crate::config::StorageConfig;
use std::sync::atomic::{AtomicU32, Ordering};

struct FixedCluster {
    healthy: std::result::Result<bool, &'static str>,
    freeze_fails: bool,
    freezes: AtomicU32,
}

impl FixedCluster {
    fn new(healthy: bool) -> Self {
        Self {
            healthy: Ok(healthy),
            freeze_fails: false,
            freezes: AtomicU32::new(0),
        }
    }
}

impl StorageCluster for FixedCluster {
    async fn health(&self) -> std::result::Result<bool, StorageError> {
        self.healthy.map_err(|msg| StorageError::Parse(msg.to_string()))
    }

    async fn freeze(&self) -> std::result::Result<(), StorageError> {
        self.freezes.fetch_add(1, Ordering::SeqCst);
        if self.freeze_fails {
            return Err(StorageError::Command {
                command: "ceph osd set noout".to_string(),
                exit_code: Some(22),
                stderr: "Error EINVAL".to_string(),
            });
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_unhealthy_cluster_is_never_frozen() {
    let cluster = FixedCluster::new(false);
    let err = check_health_and_freeze(&cluster).await.unwrap_err();

    assert!(matches!(err, PlatformError::Fatal(_)));
    assert!(err.to_string().contains("not healthy"));
    assert_eq!(cluster.freezes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_healthy_cluster_is_frozen_once() {
    let cluster = FixedCluster::new(true);
    check_health_and_freeze(&cluster).await.unwrap();
    assert_eq!(cluster.freezes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_freeze_failure_is_fatal() {
    let mut cluster = FixedCluster::new(true);
    cluster.freeze_fails = true;

    let err = check_health_and_freeze(&cluster).await.unwrap_err();
    assert!(matches!(err, PlatformError::Fatal(ref msg) if msg.contains("EINVAL")));
}

#[tokio::test]
async fn test_health_query_failure_is_fatal_without_freeze() {
    let cluster = FixedCluster {
        healthy: Err("garbage"),
        freeze_fails: false,
        freezes: AtomicU32::new(0),
    };

    let err = check_health_and_freeze(&cluster).await.unwrap_err();
    assert!(matches!(err, PlatformError::Fatal(_)));
    assert_eq!(cluster.freezes.load(Ordering::SeqCst), 0);
}

fn ceph(tolerated: &[&str]) -> CephCli {
    CephCli::new(&StorageConfig {
        tolerated_warnings: tolerated.iter().map(|s| s.to_string()).collect(),
        ..StorageConfig::default()
    })
}

#[test]
fn test_health_ok_is_healthy() {
    let raw = r#"{"status":"HEALTH_OK","checks":{},"mutes":[]}"#;
    assert!(ceph(&[]).is_healthy(raw).unwrap());
}

#[test]
fn test_health_warn_with_tolerated_checks_is_healthy() {
    let raw = r#"{"status":"HEALTH_WARN","checks":{"LARGE_OMAP_OBJECTS":{"severity":"HEALTH_WARN"}}}"#;
    assert!(ceph(&["LARGE_OMAP_OBJECTS"]).is_healthy(raw).unwrap());
    assert!(!ceph(&[]).is_healthy(raw).unwrap());
}

#[test]
fn test_health_err_is_unhealthy() {
    let raw = r#"{"status":"HEALTH_ERR","checks":{"OSD_DOWN":{}}}"#;
    assert!(!ceph(&["OSD_DOWN"]).is_healthy(raw).unwrap());
}

#[test]
fn test_unparseable_health_is_an_error() {
    assert!(matches!(ceph(&[]).is_healthy("HEALTH_OK"), Err(StorageError::Parse(_))));
}
