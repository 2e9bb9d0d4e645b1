//! Test utilities for the bootsys workspace
//!
//! In-memory stand-ins for the fleet, the storage cluster and the operator,
//! so orchestration can be exercised end to end without SSH or Ceph.

pub mod helpers;

pub use helpers::fake_fleet::{FakeFleet, FakeSession, Journal};
pub use helpers::fake_storage::FakeStorage;
pub use helpers::prompts::ScriptedPrompt;

/// Route `tracing` output to the test harness. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}
