//! Synthetic time-to-progress mapping.
//!
//! Progress is never measured. It is derived only from how long ago the
//! session started, how many items it covers and the configured per-item
//! duration. The same inputs always yield the same reading, which is what lets
//! a surface that remounts pick up exactly where the others are.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::ActiveSession;
use crate::phase::PhaseTable;

/// Result of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEstimate {
    /// Percent complete, 0.0..=100.0
    pub percent: f64,
    /// Index into the phase table, 0..phase_count
    pub phase_index: usize,
    /// Whole seconds until the estimate reaches 100%
    pub seconds_remaining: u64,
}

impl ProgressEstimate {
    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}

/// Map elapsed wall-clock time to a progress estimate.
///
/// A zero total duration (no items, or a non-positive per-item duration) is
/// complete from the first reading. `now` before `start` counts as no time
/// elapsed. `phase_count` of zero is treated as a single phase.
pub fn simulate(
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    total_items: u32,
    seconds_per_item: f64,
    phase_count: usize,
) -> ProgressEstimate {
    let phase_count = phase_count.max(1);
    let last_phase = phase_count - 1;
    let total_ms = f64::from(total_items) * seconds_per_item * 1000.0;
    let elapsed_ms = (now - start).num_milliseconds().max(0) as f64;

    if total_ms.is_nan() || total_ms <= 0.0 {
        return ProgressEstimate {
            percent: 100.0,
            phase_index: last_phase,
            seconds_remaining: 0,
        };
    }

    let percent = (elapsed_ms / total_ms * 100.0).min(100.0);
    let phase_window_ms = total_ms / phase_count as f64;
    let phase_index = ((elapsed_ms / phase_window_ms).floor() as usize).min(last_phase);
    let seconds_remaining = ((total_ms - elapsed_ms) / 1000.0).ceil().max(0.0) as u64;

    ProgressEstimate {
        percent,
        phase_index,
        seconds_remaining,
    }
}

/// A reading published to presentation surfaces on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReading {
    pub campaign_id: String,
    pub campaign_name: String,
    pub total_items: u32,
    pub percent: f64,
    pub phase_index: usize,
    pub phase_name: String,
    pub seconds_remaining: u64,
    /// Instant the reading was taken at
    pub at: DateTime<Utc>,
}

impl ProgressReading {
    /// Compute the reading for `session` at `now`.
    pub fn compute(
        session: &ActiveSession,
        now: DateTime<Utc>,
        seconds_per_item: f64,
        phases: &PhaseTable,
    ) -> Self {
        let estimate = simulate(
            session.start_time,
            now,
            session.total_items,
            seconds_per_item,
            phases.len(),
        );
        Self::from_estimate(session, estimate, phases, now)
    }

    pub fn from_estimate(
        session: &ActiveSession,
        estimate: ProgressEstimate,
        phases: &PhaseTable,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            campaign_id: session.campaign_id.clone(),
            campaign_name: session.campaign_name.clone(),
            total_items: session.total_items,
            percent: estimate.percent,
            phase_index: estimate.phase_index,
            phase_name: phases.name_at(estimate.phase_index).to_string(),
            seconds_remaining: estimate.seconds_remaining,
            at,
        }
    }

    pub fn estimate(&self) -> ProgressEstimate {
        ProgressEstimate {
            percent: self.percent,
            phase_index: self.phase_index,
            seconds_remaining: self.seconds_remaining,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.estimate().is_complete()
    }
}
