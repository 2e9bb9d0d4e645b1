//! Coordinated start and stop of platform services across a cluster fleet.
//!
//! The building blocks, leaves first:
//! - [`waiter`]: the poll-until-converged engine
//! - [`service`]: a waiter condition for one systemd service on one host
//! - [`batch`]: the same service change fanned out across many hosts
//! - [`drain`]: best-effort container shutdown before the runtime stops
//! - [`storage`]: the storage health gate and freeze
//! - [`groups`]: node group resolution and operator confirmation
//! - [`sequencer`]: the ordered start and stop step lists

pub mod batch;
pub mod config;
pub mod drain;
pub mod errors;
pub mod groups;
pub mod remote;
pub mod sequencer;
pub mod service;
pub mod storage;
pub mod waiter;

pub use errors::{PlatformError, Result};
pub use sequencer::{PlatformAction, PlatformSequencer};
