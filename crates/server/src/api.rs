//! HTTP handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::scan;
use crate::state::AppState;

// ── Liveness ──────────────────────────────────────────────────────

pub async fn root() -> &'static str {
    "Agent Hawke is live"
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Scan ──────────────────────────────────────────────────────────

/// Trigger one full scan. The report is cached for `GET /last-scan`
/// only when the run succeeds.
pub async fn run_intelligence(
    State(state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, String)> {
    match scan::run_scan(&state).await {
        Ok(report) => {
            let mut cache = state.last_scan.write().await;
            *cache = Some(report.clone());
            Ok(Json(report).into_response())
        }
        Err(e) => {
            warn!("scan failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Scan failed: {}", e),
            ))
        }
    }
}

pub async fn last_scan(State(state): State<Arc<AppState>>) -> Response {
    match &*state.last_scan.read().await {
        Some(report) => Json(report).into_response(),
        None => Json(json!({ "message": "No scan has run yet" })).into_response(),
    }
}

// ── Debug / discovery ─────────────────────────────────────────────

/// Raw passthrough of the SIS student payload.
pub async fn sis_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let sis = state.sis.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "SIS is not configured".to_string(),
    ))?;

    let payload = sis
        .raw_students()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("SIS fetch failed: {}", e)))?;
    Ok(Json(payload))
}

/// How many leads the activity-type discovery endpoint samples.
const DISCOVERY_SAMPLE: usize = 10;

#[derive(Serialize)]
pub struct ActivityTypesResponse {
    pub leads_sampled: usize,
    pub counts_by_event: BTreeMap<String, usize>,
}

/// Sample a handful of leads and tally their activity event names —
/// used to discover what a tenant actually calls its events.
pub async fn discover_activity_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActivityTypesResponse>, (StatusCode, String)> {
    let mut sampled = Vec::new();
    for stage in hawke_engine::SCAN_STAGES {
        if sampled.len() >= DISCOVERY_SAMPLE {
            break;
        }
        let raw_leads = state
            .crm
            .leads_in_stage(stage)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("CRM fetch failed: {}", e)))?;
        for raw in &raw_leads {
            let lead = state.schema.resolve(raw);
            if !lead.prospect_id.is_empty() {
                sampled.push(lead.prospect_id);
            }
            if sampled.len() >= DISCOVERY_SAMPLE {
                break;
            }
        }
    }

    let mut counts_by_event = BTreeMap::new();
    for prospect_id in &sampled {
        let activities = state
            .crm
            .recent_activities(prospect_id)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("CRM fetch failed: {}", e)))?;
        for activity in activities {
            *counts_by_event.entry(activity.event).or_insert(0) += 1;
        }
    }

    Ok(Json(ActivityTypesResponse {
        leads_sampled: sampled.len(),
        counts_by_event,
    }))
}

/// Dump all scan-stage leads after field-schema resolution.
pub async fn debug_students(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<hawke_core::model::LeadRecord>>, (StatusCode, String)> {
    let mut leads = Vec::new();
    for stage in hawke_engine::SCAN_STAGES {
        let raw_leads = state
            .crm
            .leads_in_stage(stage)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("CRM fetch failed: {}", e)))?;
        leads.extend(raw_leads.iter().map(|raw| state.schema.resolve(raw)));
    }
    Ok(Json(leads))
}

// ── Manual decision write ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteDecisionRequest {
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub findings: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct WriteDecisionResponse {
    pub message: &'static str,
    pub lead_id: String,
}

/// Manually post a decision activity for a lead.
pub async fn write_decision(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WriteDecisionRequest>,
) -> Result<Json<WriteDecisionResponse>, (StatusCode, String)> {
    let lead_id = request
        .lead_id
        .filter(|s| !s.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "leadId is required".to_string()))?;
    let decision = request
        .decision
        .filter(|s| !s.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "decision is required".to_string()))?;

    let mut note = format!("Decision: {}", decision);
    if let Some(risk) = request.risk_level.filter(|s| !s.is_empty()) {
        note.push_str(&format!(" | Risk: {}", risk));
    }
    if let Some(findings) = request.findings.filter(|f| !f.is_empty()) {
        note.push_str(&format!(" | Findings: {}", findings.join("; ")));
    }

    state.crm.log_decision(&lead_id, &note).await.map_err(|e| {
        warn!("manual decision write failed for lead {}: {}", lead_id, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to write decision: {}", e),
        )
    })?;

    Ok(Json(WriteDecisionResponse {
        message: "Decision recorded",
        lead_id,
    }))
}
