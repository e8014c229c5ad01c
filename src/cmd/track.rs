//! Live tracking of a campaign batch: `outreach track`.

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use std::sync::Arc;

use outreach::config::OutreachConfig;
use outreach::enrollment::DEFAULT_CAMPAIGN_NAME;
use outreach::progress::{LoopHandle, ProgressLoop, ProgressSession};
use outreach::ui::{CampaignProgressUI, UiMode};

/// How a tracking run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The session went inactive, normally through completion
    Finished,
    /// Ctrl-C stopped the session early
    Interrupted,
}

pub async fn cmd_track(
    config: &OutreachConfig,
    campaign_id: &str,
    campaign_name: Option<&str>,
    items: u32,
    mode: UiMode,
    surfaces: usize,
) -> Result<()> {
    let name = campaign_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_CAMPAIGN_NAME);

    let session = ProgressSession::default();
    session.start(campaign_id, name, items);
    track_session(config, &session, mode, surfaces).await?;
    Ok(())
}

/// Mount `surfaces` progress surfaces on `session` and wait until the session
/// goes inactive. Ctrl-C stops the session. Every surface is unmounted before
/// this returns.
pub async fn track_session(
    config: &OutreachConfig,
    session: &ProgressSession,
    mode: UiMode,
    surfaces: usize,
) -> Result<TrackOutcome> {
    let settings = config.loop_settings();
    let multi = MultiProgress::new();
    let mut changes = session.subscribe();

    let handles: Vec<LoopHandle> = (1..=surfaces.max(1))
        .map(|surface| {
            let ui = CampaignProgressUI::with_multi(
                mode,
                settings.phases.clone(),
                multi.clone(),
                surface,
            );
            ProgressLoop::mount(session.clone(), settings.clone(), Arc::new(ui))
        })
        .collect();

    let outcome = tokio::select! {
        finished = changes.wait_for(|snapshot| !snapshot.is_active()) => {
            finished.context("Progress session closed unexpectedly")?;
            TrackOutcome::Finished
        }
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("Failed to listen for Ctrl-C")?;
            session.stop();
            TrackOutcome::Interrupted
        }
    };

    for handle in handles {
        handle.unmount().await;
    }

    if outcome == TrackOutcome::Interrupted && mode != UiMode::Json {
        println!();
        println!("Interrupted. Tracking stopped.");
    }
    Ok(outcome)
}
