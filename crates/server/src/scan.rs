//! The scan orchestrator.
//!
//! One end-to-end run: fetch leads per stage, normalize through the field
//! schema, join SIS records, evaluate both rule pipelines per lead
//! (fetching activities lazily), write the primary anomaly back to the
//! CRM, and optionally summarize. Leads are processed strictly
//! sequentially; per-lead write-back failures are logged and never abort
//! the scan, while any upstream fetch failure fails the whole run.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use hawke_core::model::{LeadRecord, SisRecord};
use hawke_crm::CrmError;
use hawke_engine::report::{LeadAnomaly, ScanReport};
use hawke_engine::rules;
use hawke_sis::SisError;

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Crm(#[from] CrmError),
    #[error(transparent)]
    Sis(#[from] SisError),
}

/// Run one full scan and return its report. The caller stores the report
/// in the last-scan cache on success.
pub async fn run_scan(state: &AppState) -> Result<ScanReport, ScanError> {
    let started_at = Utc::now();
    let timer = std::time::Instant::now();

    // Fetch and normalize, stage by stage.
    let mut leads: Vec<LeadRecord> = Vec::new();
    for stage in rules::SCAN_STAGES {
        let raw_leads = state.crm.leads_in_stage(stage).await?;
        for raw in &raw_leads {
            let lead = state.schema.resolve(raw);
            if lead.prospect_id.is_empty() {
                warn!("skipping lead without a prospect id in stage '{}'", stage);
                continue;
            }
            if !lead.is_student() {
                continue;
            }
            leads.push(lead);
        }
    }

    info!("scan: {} student leads fetched", leads.len());

    // Join SIS records by prospect id.
    let sis_by_id: HashMap<String, SisRecord> = match (&state.sis, leads.is_empty()) {
        (Some(sis), false) => {
            let ids: Vec<String> = leads.iter().map(|l| l.prospect_id.clone()).collect();
            sis.students(&ids)
                .await?
                .into_iter()
                .map(|r| (r.prospect_id.clone(), r))
                .collect()
        }
        _ => HashMap::new(),
    };

    // One "now" for the whole run keeps rule evaluation deterministic
    // across the sequential lead loop.
    let now = Utc::now();
    let mut entries: Vec<LeadAnomaly> = Vec::new();

    for lead in &leads {
        // Activities are fetched only when a rule that reads them could fire.
        let activities = if rules::crm_rules_need_activities(lead) {
            state.crm.recent_activities(&lead.prospect_id).await?
        } else {
            Vec::new()
        };

        let crm_anomaly = rules::evaluate_crm(lead, &activities, now);
        let sis_anomaly = sis_by_id
            .get(&lead.prospect_id)
            .and_then(|record| rules::evaluate_sis(lead, record));

        let primary = rules::primary_anomaly(crm_anomaly.as_ref(), sis_anomaly.as_ref()).cloned();

        for anomaly in [crm_anomaly, sis_anomaly].into_iter().flatten() {
            let is_primary = primary.as_ref() == Some(&anomaly);
            entries.push(LeadAnomaly {
                prospect_id: lead.prospect_id.clone(),
                lead_name: lead.display_name(),
                stage: lead.stage_label.clone(),
                anomaly,
                primary: is_primary,
            });
        }

        if let Some(anomaly) = primary {
            let note = format!(
                "Anomaly detected: {} [{}] {}",
                anomaly.kind, anomaly.severity, anomaly.explanation
            );
            if let Err(e) = state.crm.write_anomaly_fields(&lead.prospect_id, &anomaly).await {
                warn!("write-back failed for lead {}: {}", lead.prospect_id, e);
            }
            if let Err(e) = state.crm.log_decision(&lead.prospect_id, &note).await {
                warn!("activity log failed for lead {}: {}", lead.prospect_id, e);
            }
        }
    }

    let mut report = ScanReport::assemble(
        leads.len(),
        entries,
        started_at.to_rfc3339(),
        timer.elapsed().as_millis() as u64,
    );

    if let Some(analyst) = &state.analyst {
        if let Some(analysis) = analyst.analyze(&report.anomalies, report.total_leads_scanned).await
        {
            report.analysis = serde_json::to_value(&analysis).ok();
        }
    }

    info!(
        "scan done: {} leads, {} anomalies in {}ms",
        report.total_leads_scanned, report.anomalies_detected, report.duration_ms
    );

    Ok(report)
}
