//! Submitting a batch of leads to a campaign workflow.
//!
//! The workflow is an external webhook. Once it accepts a batch, the shared
//! progress session is started for the campaign so every mounted surface
//! begins tracking it. A rejected or failed submission leaves the session
//! untouched.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::EnrollmentError;
use crate::progress::ProgressSession;

/// Name used when the campaign has none.
pub const DEFAULT_CAMPAIGN_NAME: &str = "Campaign";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A lead to enroll. `fields` is passed through to the workflow as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Load leads from a JSON file holding an array of `{"id", "fields"}` objects.
pub fn load_leads(path: &Path) -> Result<Vec<Lead>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read leads file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse leads file {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub campaign_id: String,
    pub campaign_name: Option<String>,
    pub leads: Vec<Lead>,
}

impl EnrollmentRequest {
    pub fn new(campaign_id: impl Into<String>, leads: Vec<Lead>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            campaign_name: None,
            leads,
        }
    }

    pub fn with_campaign_name(mut self, name: impl Into<String>) -> Self {
        self.campaign_name = Some(name.into());
        self
    }

    /// Campaign name shown while tracking.
    pub fn display_name(&self) -> &str {
        match self.campaign_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_CAMPAIGN_NAME,
        }
    }

    fn validate(&self) -> Result<(), EnrollmentError> {
        if self.campaign_id.trim().is_empty() {
            return Err(EnrollmentError::InvalidRequest("campaign id is empty".to_string()));
        }
        if self.leads.is_empty() {
            return Err(EnrollmentError::InvalidRequest("no leads to enroll".to_string()));
        }
        Ok(())
    }

    /// JSON body accepted by the workflow webhook.
    pub fn to_payload(&self, created_at: DateTime<Utc>) -> EnrollmentPayload<'_> {
        let created_time = created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        EnrollmentPayload {
            campaign_id: &self.campaign_id,
            lead: self
                .leads
                .iter()
                .map(|lead| PayloadLead {
                    id: &lead.id,
                    created_time: created_time.clone(),
                    fields: &lead.fields,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPayload<'a> {
    pub campaign_id: &'a str,
    pub lead: Vec<PayloadLead<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadLead<'a> {
    pub id: &'a str,
    pub created_time: String,
    pub fields: &'a BTreeMap<String, serde_json::Value>,
}

/// Delivery of an enrollment payload.
/// Real implementation: `WebhookGateway`. Tests use in-memory doubles.
#[async_trait]
pub trait EnrollmentGateway: Send + Sync {
    async fn submit(&self, payload: &EnrollmentPayload<'_>) -> Result<(), EnrollmentError>;
}

/// POSTs the payload to a workflow webhook.
#[derive(Debug, Clone)]
pub struct WebhookGateway {
    client: reqwest::Client,
    url: String,
}

impl WebhookGateway {
    pub fn new(url: impl Into<String>) -> Result<Self, EnrollmentError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EnrollmentGateway for WebhookGateway {
    async fn submit(&self, payload: &EnrollmentPayload<'_>) -> Result<(), EnrollmentError> {
        let resp = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(EnrollmentError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            url = %self.url,
            status = status.as_u16(),
            body = %body,
            "webhook accepted batch"
        );
        Ok(())
    }
}

/// Submit `request` through `gateway` and, once accepted, start tracking it.
pub async fn enroll(
    gateway: &dyn EnrollmentGateway,
    session: &ProgressSession,
    request: &EnrollmentRequest,
) -> Result<(), EnrollmentError> {
    request.validate()?;

    let total_items = u32::try_from(request.leads.len()).map_err(|_| {
        EnrollmentError::InvalidRequest(format!("too many leads: {}", request.leads.len()))
    })?;
    let payload = request.to_payload(session.clock().now());

    tracing::info!(
        event = "enrollment.submit",
        campaign_id = %request.campaign_id,
        leads = total_items,
        "submitting leads to campaign workflow"
    );

    if let Err(e) = gateway.submit(&payload).await {
        tracing::warn!(
            event = "enrollment.failed",
            campaign_id = %request.campaign_id,
            error = %e,
            "campaign workflow did not accept leads"
        );
        return Err(e);
    }

    session.start(&request.campaign_id, request.display_name(), total_items);
    Ok(())
}
