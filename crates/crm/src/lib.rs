//! LeadSquared CRM client.
//!
//! Thin request builders over the LeadSquared v2 REST API: fetch leads by
//! stage, fetch recent activities per lead, write anomaly fields back, and
//! append activity-log entries. No retries — every call is attempted once.

pub mod client;

use async_trait::async_trait;
use serde_json::Value;

use hawke_core::model::{ActivityRecord, Anomaly};

pub use client::LeadSquaredClient;

#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CRM API error: {status} — {body}")]
    Api { status: u16, body: String },
    #[error("CRM client not configured: {0}")]
    NotConfigured(String),
}

/// Seam for the CRM collaborator — the orchestrator and handlers talk to
/// this trait, tests supply an in-memory double.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Fetch raw leads currently sitting in `stage`. Leads come back as
    /// untyped JSON (flat objects or property lists); field-schema
    /// resolution happens at the caller.
    async fn leads_in_stage(&self, stage: &str) -> Result<Vec<Value>, CrmError>;

    /// Fetch the most recent activities for a lead, capped at
    /// [`client::RECENT_ACTIVITY_CAP`].
    async fn recent_activities(&self, prospect_id: &str) -> Result<Vec<ActivityRecord>, CrmError>;

    /// Write anomaly fields onto the CRM lead record.
    async fn write_anomaly_fields(
        &self,
        prospect_id: &str,
        anomaly: &Anomaly,
    ) -> Result<(), CrmError>;

    /// Append an activity-log entry describing a decision.
    async fn log_decision(&self, prospect_id: &str, note: &str) -> Result<(), CrmError>;
}
