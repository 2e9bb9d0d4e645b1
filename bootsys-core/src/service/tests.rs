use super::*;
use crate::remote::CommandOutput;

/// Connector for tests that never reach the network
struct Unreachable;

struct NoSession;

impl RemoteSession for NoSession {
    fn host(&self) -> &str {
        "nowhere"
    }

    async fn execute(&mut self, _command: &str) -> Result<CommandOutput, RemoteError> {
        Ok(CommandOutput::default())
    }

    async fn disconnect(self) {}
}

impl RemoteConnector for Unreachable {
    type Session = NoSession;

    async fn connect(&self, host: &str) -> Result<NoSession, RemoteError> {
        Err(RemoteError::connect(host, "unreachable"))
    }
}

fn parse(state: &str, enabled: Option<&str>) -> Result<ServiceReconciler<Unreachable>, PlatformError> {
    ServiceReconciler::parse(Arc::new(Unreachable), "ncn-w001", "kubelet", state, enabled)
}

#[test]
fn test_parse_accepts_every_valid_combination() {
    for state in ["active", "inactive"] {
        for enabled in [None, Some("enabled"), Some("disabled")] {
            let reconciler = parse(state, enabled).unwrap();
            assert_eq!(reconciler.target_state().as_str(), state);
            assert_eq!(reconciler.target_enabled().map(|e| e.as_str()), enabled);
        }
    }
}

#[test]
fn test_parse_rejects_unknown_state() {
    let err = parse("running", None).err().unwrap();
    assert!(matches!(err, PlatformError::InvalidTargetState(ref s) if s == "running"));
    assert!(err.to_string().contains("running"));
}

#[test]
fn test_parse_rejects_unknown_enabled() {
    let err = parse("active", Some("masked")).err().unwrap();
    assert!(matches!(err, PlatformError::InvalidTargetEnabled(ref s) if s == "masked"));
}

#[test]
fn test_parse_is_case_sensitive() {
    assert!(parse("Active", None).is_err());
    assert!(parse("inactive", Some("Enabled")).is_err());
}

#[test]
fn test_condition_name() {
    let plain = parse("active", None).unwrap();
    assert_eq!(plain.condition_name(), "service kubelet active on ncn-w001");

    let with_enabled = parse("inactive", Some("disabled")).unwrap();
    assert_eq!(
        with_enabled.condition_name(),
        "service kubelet inactive and disabled on ncn-w001"
    );
}

#[tokio::test]
async fn test_connect_failure_is_not_completed() {
    let reconciler = parse("active", Some("enabled")).unwrap();
    let waiter = crate::waiter::Waiter::new(
        reconciler,
        std::time::Duration::from_secs(1),
        std::time::Duration::from_millis(100),
    )
    .unwrap();

    let outcome = waiter.start_async().await_outcome().await;
    match outcome {
        crate::waiter::WaitOutcome::Failed(e) => {
            assert!(e.is_connectivity());
            assert_eq!(e.host(), "ncn-w001");
        }
        other => panic!("expected a connectivity failure, got {:?}", other),
    }
}
