//! Cancellable periodic work.
//!
//! `Ticker` is a timer bound to a `CancellationToken`; `TaskGuard` owns a
//! spawned task and cancels it when released. Whoever spawns recurring work
//! holds the guard, so there is no way to drop interest in the work without
//! also stopping it.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A recurring timer that stops yielding once its token is cancelled.
#[derive(Debug)]
pub struct Ticker {
    interval: Interval,
    cancel: CancellationToken,
}

impl Ticker {
    /// The first tick completes immediately.
    pub fn new(period: Duration, cancel: CancellationToken) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, cancel }
    }

    /// Wait for the next tick. Returns `None` once cancelled, and keeps
    /// returning `None` afterwards.
    pub async fn tick(&mut self) -> Option<Instant> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            instant = self.interval.tick() => Some(instant),
        }
    }

    /// Like `new`, but the first tick completes one `period` from now.
    pub fn delayed(period: Duration, cancel: CancellationToken) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, cancel }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

/// Owner of a spawned task. Cancels the task on `shutdown` or drop.
#[derive(Debug)]
pub struct TaskGuard {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    /// Spawn `task` on the current runtime. The task is expected to watch
    /// `cancel` and return promptly once it fires.
    pub fn spawn<F>(cancel: CancellationToken, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            cancel,
            handle: Some(tokio::spawn(task)),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
            && e.is_panic()
        {
            tracing::error!(error = %e, "periodic task panicked");
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
