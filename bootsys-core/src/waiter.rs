//! Poll-until-converged engine.
//!
//! A [`Condition`] describes what to do and how to check it; a [`Waiter`]
//! owns the timing. Waiters run in two phases so many of them can be in
//! flight at once: [`Waiter::start_async`] spawns the work and returns a
//! [`WaitHandle`] immediately, and [`WaitHandle::await_completion`] joins it.
//!
//! Remote failures never escape a waiter. They are logged where they happen
//! and the waiter resolves to not-completed.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::errors::{PlatformError, Result};
use crate::remote::RemoteError;

/// Something a [`Waiter`] can drive to completion
pub trait Condition: Send + 'static {
    /// Diagnostic label used in every log line about this condition
    fn condition_name(&self) -> String;

    /// Perform the one state-changing action, if it is needed.
    ///
    /// Must be idempotent: returns `Ok(true)` without changing anything when
    /// the condition already holds.
    fn pre_wait_action(&mut self) -> impl Future<Output = std::result::Result<bool, RemoteError>> + Send;

    /// Check the condition against live state. Must not change it.
    fn has_completed(&mut self) -> impl Future<Output = std::result::Result<bool, RemoteError>> + Send;

    /// Release anything the condition holds (connections). Runs exactly once,
    /// whatever the outcome.
    fn release(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// How a wait ended
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    /// The condition held, either before the action or within the timeout
    Completed,
    /// The timeout elapsed with the condition still false
    TimedOut,
    /// A transient remote failure; the error has already been logged
    Failed(RemoteError),
    /// The waiter's task panicked or was cancelled
    Aborted(String),
}

impl WaitOutcome {
    pub fn completed(&self) -> bool {
        matches!(self, WaitOutcome::Completed)
    }
}

/// Owns the timing of one [`Condition`]
pub struct Waiter<C> {
    condition: C,
    timeout: Duration,
    poll_interval: Duration,
}

impl<C: Condition> Waiter<C> {
    /// Both `timeout` and `poll_interval` must be positive
    pub fn new(condition: C, timeout: Duration, poll_interval: Duration) -> Result<Self> {
        if timeout.is_zero() || poll_interval.is_zero() {
            return Err(PlatformError::InvalidWaiterTiming {
                timeout,
                poll_interval,
            });
        }
        Ok(Self {
            condition,
            timeout,
            poll_interval,
        })
    }

    /// Begin the action and polling on its own task and return immediately
    pub fn start_async(self) -> WaitHandle {
        let name = self.condition.condition_name();
        let task = tokio::spawn(async move {
            let mut waiter = self;
            waiter.run().await
        });
        WaitHandle { name, task }
    }

    /// Start and await in one call, for callers that wait on a single condition
    pub async fn wait_for_completion(self) -> bool {
        self.start_async().await_completion().await
    }

    async fn run(&mut self) -> WaitOutcome {
        let name = self.condition.condition_name();
        info!("Waiting for condition \"{}\" timeout {:?}", name, self.timeout);

        let outcome = self.poll().await;
        self.condition.release().await;

        match &outcome {
            WaitOutcome::Completed => info!("Finished waiting for condition \"{}\"", name),
            WaitOutcome::TimedOut => warn!(
                "Waiting for condition \"{}\" timed out after {:?}",
                name, self.timeout
            ),
            WaitOutcome::Failed(e) => error!("{}", e),
            WaitOutcome::Aborted(_) => {}
        }
        outcome
    }

    async fn poll(&mut self) -> WaitOutcome {
        match self.condition.pre_wait_action().await {
            Ok(true) => return WaitOutcome::Completed,
            Ok(false) => {}
            Err(e) => return WaitOutcome::Failed(e),
        }

        let started = Instant::now();
        loop {
            match self.condition.has_completed().await {
                Ok(true) => return WaitOutcome::Completed,
                Ok(false) => {}
                Err(e) => return WaitOutcome::Failed(e),
            }

            if started.elapsed() >= self.timeout {
                return WaitOutcome::TimedOut;
            }

            debug!(
                "Condition \"{}\" not met, polling again in {:?}",
                self.condition.condition_name(),
                self.poll_interval
            );
            sleep(self.poll_interval).await;
        }
    }
}

/// A started [`Waiter`]
pub struct WaitHandle {
    name: String,
    task: JoinHandle<WaitOutcome>,
}

impl WaitHandle {
    pub fn condition_name(&self) -> &str {
        &self.name
    }

    /// Block until the waiter's task finishes and return whether the
    /// condition completed
    pub async fn await_completion(self) -> bool {
        self.await_outcome().await.completed()
    }

    /// Like [`WaitHandle::await_completion`] but keeps the reason
    pub async fn await_outcome(self) -> WaitOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Waiter task for \"{}\" did not finish: {}", self.name, e);
                WaitOutcome::Aborted(e.to_string())
            }
        }
    }
}
