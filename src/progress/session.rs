//! The shared progress session.
//!
//! One `ProgressSession` is created per process and a clone of the handle is
//! passed to every component that reads or changes it. All clones observe the
//! same state. Changes are published through a `tokio::sync::watch` channel so
//! surfaces can re-render as soon as `start` or `stop` returns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::clock::{Clock, SystemClock};

/// The fields of a session that is being tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSession {
    pub campaign_id: String,
    pub campaign_name: String,
    pub total_items: u32,
    /// Fixed from the inactive->active transition until the next stop
    pub start_time: DateTime<Utc>,
    /// Increments on every inactive->active transition
    pub generation: u64,
}

/// Point-in-time view of the session.
///
/// All session fields live in one `Option`, so they are either all set or all
/// at their inactive defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub active: Option<ActiveSession>,
}

impl SessionSnapshot {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn campaign_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.campaign_id.as_str())
    }

    pub fn campaign_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.campaign_name.as_str())
    }

    pub fn total_items(&self) -> u32 {
        self.active.as_ref().map_or(0, |a| a.total_items)
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|a| a.start_time)
    }

    pub fn generation(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.generation)
    }
}

struct Inner {
    clock: Arc<dyn Clock>,
    state: watch::Sender<SessionSnapshot>,
    next_generation: AtomicU64,
    /// Generation whose completion notification has been handed out
    completion_claimed: Mutex<Option<u64>>,
}

/// Handle to the process-wide progress session. Cheap to clone.
#[derive(Clone)]
pub struct ProgressSession {
    inner: Arc<Inner>,
}

impl ProgressSession {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                clock,
                state,
                next_generation: AtomicU64::new(1),
                completion_claimed: Mutex::new(None),
            }),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Begin tracking a batch.
    ///
    /// If a session is already active its `start_time` is kept and only the
    /// campaign id, name and item count are replaced.
    pub fn start(&self, campaign_id: &str, campaign_name: &str, total_items: u32) {
        let now = self.inner.clock.now();
        let mut retargeted: Option<ActiveSession> = None;

        self.inner.state.send_modify(|snapshot| match snapshot.active.as_mut() {
            Some(active) => {
                retargeted = Some(active.clone());
                active.campaign_id = campaign_id.to_string();
                active.campaign_name = campaign_name.to_string();
                active.total_items = total_items;
            }
            None => {
                snapshot.active = Some(ActiveSession {
                    campaign_id: campaign_id.to_string(),
                    campaign_name: campaign_name.to_string(),
                    total_items,
                    start_time: now,
                    generation: self.inner.next_generation.fetch_add(1, Ordering::SeqCst),
                });
            }
        });

        match retargeted {
            // The running clock now covers the new batch.
            Some(previous) => tracing::warn!(
                event = "session.restart",
                previous_campaign_id = %previous.campaign_id,
                campaign_id = %campaign_id,
                total_items,
                generation = previous.generation,
                start_time = %previous.start_time,
                "start called while a session is active; keeping its clock"
            ),
            None => tracing::info!(
                event = "session.start",
                campaign_id = %campaign_id,
                campaign_name = %campaign_name,
                total_items,
                start_time = %now,
                "progress session started"
            ),
        }
    }

    /// Return to the inactive state. No-op when already inactive.
    pub fn stop(&self) {
        let mut stopped: Option<ActiveSession> = None;
        self.inner.state.send_if_modified(|snapshot| {
            stopped = snapshot.active.take();
            stopped.is_some()
        });

        if let Some(previous) = stopped {
            tracing::info!(
                event = "session.stop",
                campaign_id = %previous.campaign_id,
                generation = previous.generation,
                stopped_at = %self.inner.clock.now(),
                "progress session stopped"
            );
        }
    }

    /// Current snapshot.
    pub fn read(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Claim the completion notification for `generation`.
    ///
    /// Returns `true` for exactly one caller per generation, and only while
    /// that generation is the active session.
    pub fn claim_completion(&self, generation: u64) -> bool {
        // Holding the read guard keeps start/stop out until the claim is recorded.
        let state = self.inner.state.borrow();
        if state.generation() != Some(generation) {
            return false;
        }
        let mut claimed = self
            .inner
            .completion_claimed
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if *claimed == Some(generation) {
            return false;
        }
        *claimed = Some(generation);
        true
    }
}

impl Default for ProgressSession {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for ProgressSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSession")
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::clock::ManualClock;
    use chrono::Duration;

    fn session_with_clock() -> (ProgressSession, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (ProgressSession::new(clock.clone()), clock)
    }

    #[test]
    fn test_new_session_is_inactive() {
        let (session, _) = session_with_clock();
        let snapshot = session.read();
        assert!(!snapshot.is_active());
        assert_eq!(snapshot.campaign_id(), None);
        assert_eq!(snapshot.campaign_name(), None);
        assert_eq!(snapshot.total_items(), 0);
        assert_eq!(snapshot.start_time(), None);
    }

    #[test]
    fn test_start_sets_all_fields() {
        let (session, clock) = session_with_clock();
        session.start("cmp-a", "Spring", 5);
        let snapshot = session.read();
        assert!(snapshot.is_active());
        assert_eq!(snapshot.campaign_id(), Some("cmp-a"));
        assert_eq!(snapshot.campaign_name(), Some("Spring"));
        assert_eq!(snapshot.total_items(), 5);
        assert_eq!(snapshot.start_time(), Some(clock.now()));
    }

    #[test]
    fn test_start_while_active_keeps_clock_and_retargets() {
        let (session, clock) = session_with_clock();
        session.start("A", "X", 5);
        let original = session.read().start_time();
        let generation = session.read().generation();

        clock.advance(Duration::seconds(30));
        session.start("B", "Y", 10);

        let snapshot = session.read();
        assert_eq!(snapshot.start_time(), original);
        assert_eq!(snapshot.generation(), generation);
        assert_eq!(snapshot.campaign_id(), Some("B"));
        assert_eq!(snapshot.campaign_name(), Some("Y"));
        assert_eq!(snapshot.total_items(), 10);
    }

    #[test]
    fn test_stop_resets_to_defaults() {
        let (session, _) = session_with_clock();
        session.start("A", "X", 5);
        session.stop();
        assert_eq!(session.read(), SessionSnapshot::default());

        // Stopping again is a no-op.
        session.stop();
        assert_eq!(session.read(), SessionSnapshot::default());
    }

    #[test]
    fn test_stop_before_any_start() {
        let (session, _) = session_with_clock();
        session.stop();
        assert_eq!(session.read(), SessionSnapshot::default());
    }

    #[test]
    fn test_restart_after_stop_gets_new_clock_and_generation() {
        let (session, clock) = session_with_clock();
        session.start("A", "X", 5);
        let first = session.read().active.unwrap();
        session.stop();

        clock.advance(Duration::seconds(10));
        session.start("A", "X", 5);
        let second = session.read().active.unwrap();

        assert_eq!(second.start_time, first.start_time + Duration::seconds(10));
        assert!(second.generation > first.generation);
    }

    #[test]
    fn test_clones_share_state() {
        let (session, _) = session_with_clock();
        let other = session.clone();
        session.start("A", "X", 1);
        assert!(other.read().is_active());
        other.stop();
        assert!(!session.read().is_active());
    }

    #[test]
    fn test_transitions_notify_subscribers() {
        let (session, _) = session_with_clock();
        let mut rx = session.subscribe();
        assert!(!rx.has_changed().unwrap());

        session.start("A", "X", 1);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_active());

        session.stop();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_active());

        // No transition, no notification.
        session.stop();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_claim_completion_once_per_generation() {
        let (session, _) = session_with_clock();
        session.start("A", "X", 1);
        let generation = session.read().generation().unwrap();

        assert!(!session.claim_completion(generation + 1));
        assert!(session.claim_completion(generation));
        assert!(!session.claim_completion(generation));

        session.stop();
        assert!(!session.claim_completion(generation));

        session.start("A", "X", 1);
        let next = session.read().generation().unwrap();
        assert!(session.claim_completion(next));
    }
}
