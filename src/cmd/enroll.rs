//! Lead enrollment followed by live tracking: `outreach enroll`.

use anyhow::{Context, Result};
use std::path::Path;

use super::track::track_session;
use outreach::config::{ENV_WEBHOOK_URL, OutreachConfig};
use outreach::enrollment::{EnrollmentRequest, WebhookGateway, enroll, load_leads};
use outreach::progress::ProgressSession;
use outreach::ui::UiMode;
use outreach::ui::icons::ROCKET;

pub async fn cmd_enroll(
    config: &OutreachConfig,
    campaign_id: &str,
    campaign_name: Option<&str>,
    leads_file: &Path,
    mode: UiMode,
) -> Result<()> {
    let url = config.webhook_url().with_context(|| {
        format!(
            "No webhook URL configured. Pass --webhook, set {}, or set enrollment.webhook_url in outreach.toml",
            ENV_WEBHOOK_URL
        )
    })?;

    let leads = load_leads(leads_file)?;
    let mut request = EnrollmentRequest::new(campaign_id, leads);
    if let Some(name) = campaign_name {
        request = request.with_campaign_name(name);
    }

    if mode != UiMode::Json {
        println!(
            "{}Submitting {} lead(s) to campaign {}...",
            ROCKET,
            request.leads.len(),
            request.campaign_id
        );
    }

    let gateway = WebhookGateway::new(url)?;
    let session = ProgressSession::default();
    enroll(&gateway, &session, &request)
        .await
        .context("Failed to add leads to campaign")?;

    if mode != UiMode::Json {
        println!("Workflow started for {}", request.display_name());
    }

    track_session(config, &session, mode, 1).await?;
    Ok(())
}
