//! The recurring recomputation loop behind every progress surface.
//!
//! Each mounted surface gets its own `ProgressLoop`. Loops never keep an
//! elapsed-time counter: every tick re-reads the shared session and asks the
//! simulator for the reading at the current instant, so independently mounted
//! loops agree with each other and a remounted loop resumes where it left off.
//!
//! The state machine lives in `LoopCore`, which has no timers and can be
//! stepped directly. `ProgressLoop::mount` wraps it in a tokio task driven by
//! session changes and a `Ticker`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::session::{ActiveSession, ProgressSession, SessionSnapshot};
use super::simulator::ProgressReading;
use super::ticker::{TaskGuard, Ticker};
use crate::phase::PhaseTable;

static NEXT_LOOP_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a single loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// No active session to track
    #[default]
    Idle,
    /// Recomputing on every tick
    Running,
    /// Reached 100% for the bound session
    Completed,
}

/// Callbacks a presentation surface implements to receive loop output.
///
/// Callbacks run on the loop's task and should return quickly.
pub trait ProgressObserver: Send + Sync {
    /// A fresh reading, once per tick.
    fn on_reading(&self, reading: &ProgressReading);

    /// The session reached 100%. Called at most once per session across all
    /// loops tracking it, right before the session is stopped.
    fn on_complete(&self, session: &ActiveSession, reading: &ProgressReading);

    /// The loop started tracking a session whose clock had already advanced
    /// (the surface was remounted mid-session).
    fn on_resume(&self, _reading: &ProgressReading) {}

    /// The tracked session went inactive.
    fn on_idle(&self) {}
}

/// Tunables shared by every loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub tick_interval: Duration,
    pub seconds_per_item: f64,
    pub phases: Arc<PhaseTable>,
}

/// Outcome of one `LoopCore::step`.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// No active session. `was_tracking` is true when this step left
    /// Running or Completed.
    Idle { was_tracking: bool },
    /// A reading below 100%.
    Reading {
        reading: ProgressReading,
        /// This step entered Running
        entered: bool,
        /// Entered on a session whose clock had already run a tick or more
        resumed: bool,
    },
    /// The first reading at 100% for the bound session.
    Completed {
        reading: ProgressReading,
        session: ActiveSession,
    },
    /// Completed and waiting for the session to be stopped.
    Waiting,
}

/// Timer-free loop state machine.
#[derive(Debug, Clone)]
pub struct LoopCore {
    settings: LoopSettings,
    state: LoopState,
    bound_generation: Option<u64>,
}

impl LoopCore {
    pub fn new(settings: LoopSettings) -> Self {
        Self {
            settings,
            state: LoopState::Idle,
            bound_generation: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Advance the state machine against the session as it is at `now`.
    pub fn step(&mut self, snapshot: &SessionSnapshot, now: DateTime<Utc>) -> Step {
        let Some(active) = snapshot.active.as_ref() else {
            let was_tracking = self.state != LoopState::Idle;
            self.state = LoopState::Idle;
            self.bound_generation = None;
            return Step::Idle { was_tracking };
        };

        // A different generation is a new session: restart cleanly.
        let entered =
            self.state == LoopState::Idle || self.bound_generation != Some(active.generation);
        if entered {
            self.bound_generation = Some(active.generation);
            self.state = LoopState::Running;
        } else if self.state == LoopState::Completed {
            return Step::Waiting;
        }

        let reading = ProgressReading::compute(
            active,
            now,
            self.settings.seconds_per_item,
            &self.settings.phases,
        );

        if reading.is_complete() {
            self.state = LoopState::Completed;
            return Step::Completed {
                reading,
                session: active.clone(),
            };
        }

        let resumed = entered
            && (now - active.start_time)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= self.settings.tick_interval);

        Step::Reading {
            reading,
            entered,
            resumed,
        }
    }
}

/// Entry point for mounting loops.
pub struct ProgressLoop;

impl ProgressLoop {
    /// Start a loop for one surface on the current tokio runtime.
    ///
    /// If the session is already active the first reading is taken before
    /// the task first yields. The loop runs until the returned handle is
    /// unmounted or dropped.
    pub fn mount(
        session: ProgressSession,
        settings: LoopSettings,
        observer: Arc<dyn ProgressObserver>,
    ) -> LoopHandle {
        let id = NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(LoopState::Idle);

        let driver = Driver {
            id,
            session,
            core: LoopCore::new(settings),
            observer,
            state_tx,
            ticker: None,
        };
        let guard = TaskGuard::spawn(cancel.clone(), driver.run(cancel));
        tracing::debug!(event = "loop.mount", loop_id = id, "progress loop mounted");

        LoopHandle {
            id,
            guard,
            state: state_rx,
        }
    }
}

/// Owning handle for a mounted loop. Dropping it cancels the loop.
#[derive(Debug)]
pub struct LoopHandle {
    id: u64,
    guard: TaskGuard,
    state: watch::Receiver<LoopState>,
}

impl LoopHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.guard.is_finished()
    }

    /// Cancel the loop and wait until its task has exited. No observer
    /// callback runs after this returns.
    pub async fn unmount(self) {
        let id = self.id;
        self.guard.shutdown().await;
        tracing::debug!(event = "loop.unmount", loop_id = id, "progress loop unmounted");
    }
}

struct Driver {
    id: u64,
    session: ProgressSession,
    core: LoopCore,
    observer: Arc<dyn ProgressObserver>,
    state_tx: watch::Sender<LoopState>,
    ticker: Option<Ticker>,
}

impl Driver {
    async fn run(mut self, cancel: CancellationToken) {
        let mut changes = self.session.subscribe();
        let snapshot = changes.borrow_and_update().clone();
        self.advance(&snapshot, &cancel);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = changes.borrow_and_update().clone();
                    self.advance(&snapshot, &cancel);
                }
                Some(_) = next_tick(&mut self.ticker) => {
                    let snapshot = self.session.read();
                    self.advance(&snapshot, &cancel);
                }
            }
        }

        self.ticker = None;
        self.state_tx.send_replace(LoopState::Idle);
    }

    fn advance(&mut self, snapshot: &SessionSnapshot, cancel: &CancellationToken) {
        let now = self.session.clock().now();
        match self.core.step(snapshot, now) {
            Step::Idle { was_tracking } => {
                self.ticker = None;
                if was_tracking {
                    self.state_tx.send_replace(LoopState::Idle);
                    tracing::info!(event = "loop.idle", loop_id = self.id, "progress loop idle");
                    self.observer.on_idle();
                }
            }
            Step::Reading {
                reading,
                entered,
                resumed,
            } => {
                if entered {
                    let period = self.core.settings().tick_interval;
                    self.ticker = Some(Ticker::delayed(period, cancel.child_token()));
                    self.state_tx.send_replace(LoopState::Running);
                    self.log_entered(&reading, snapshot);
                    if resumed {
                        tracing::info!(
                            event = "loop.resume",
                            loop_id = self.id,
                            campaign_id = %reading.campaign_id,
                            percent = reading.percent,
                            phase = %reading.phase_name,
                            "resuming progress"
                        );
                        self.observer.on_resume(&reading);
                    }
                }
                tracing::trace!(
                    loop_id = self.id,
                    campaign_id = %reading.campaign_id,
                    percent = reading.percent,
                    phase = %reading.phase_name,
                    seconds_remaining = reading.seconds_remaining,
                    "progress tick"
                );
                self.observer.on_reading(&reading);
            }
            Step::Completed { reading, session } => {
                self.ticker = None;
                self.state_tx.send_replace(LoopState::Completed);
                self.observer.on_reading(&reading);
                if self.session.claim_completion(session.generation) {
                    tracing::info!(
                        event = "loop.completed",
                        loop_id = self.id,
                        campaign_id = %session.campaign_id,
                        generation = session.generation,
                        total_items = session.total_items,
                        completed_at = %reading.at,
                        "campaign progress completed"
                    );
                    self.observer.on_complete(&session, &reading);
                    self.session.stop();
                }
            }
            Step::Waiting => {
                self.ticker = None;
            }
        }
    }

    fn log_entered(&self, reading: &ProgressReading, snapshot: &SessionSnapshot) {
        tracing::info!(
            event = "loop.running",
            loop_id = self.id,
            campaign_id = %reading.campaign_id,
            generation = snapshot.generation().unwrap_or_default(),
            total_items = reading.total_items,
            percent = reading.percent,
            "progress loop running"
        );
    }
}

async fn next_tick(ticker: &mut Option<Ticker>) -> Option<tokio::time::Instant> {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => std::future::pending().await,
    }
}
