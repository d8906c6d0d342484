//! Scan report types returned by `/run-intelligence` and cached for
//! `/last-scan`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use hawke_core::model::Anomaly;

/// One anomalous lead in a scan report. `primary` marks the anomaly
/// selected for CRM write-back when both pipelines fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadAnomaly {
    pub prospect_id: String,
    pub lead_name: String,
    pub stage: String,
    #[serde(flatten)]
    pub anomaly: Anomaly,
    pub primary: bool,
}

/// Result of one full scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub message: String,
    pub total_leads_scanned: usize,
    pub anomalies_detected: usize,
    pub anomalies: Vec<LeadAnomaly>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_origin: BTreeMap<String, usize>,
    /// Structured LLM analysis; absent when the summarizer is disabled
    /// or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    pub started_at: String,
    pub duration_ms: u64,
}

impl ScanReport {
    /// Assemble a report from the evaluated anomaly list, tallying
    /// severity and origin counts.
    pub fn assemble(
        total_leads_scanned: usize,
        anomalies: Vec<LeadAnomaly>,
        started_at: String,
        duration_ms: u64,
    ) -> Self {
        let mut by_severity = BTreeMap::new();
        let mut by_origin = BTreeMap::new();
        for entry in &anomalies {
            *by_severity
                .entry(entry.anomaly.severity.as_str().to_string())
                .or_insert(0) += 1;
            *by_origin
                .entry(entry.anomaly.origin.to_string())
                .or_insert(0) += 1;
        }

        let anomalies_detected = anomalies.len();
        let message = if anomalies_detected == 0 {
            format!("Scan complete: {} leads, no anomalies", total_leads_scanned)
        } else {
            format!(
                "Scan complete: {} leads, {} anomalies",
                total_leads_scanned, anomalies_detected
            )
        };

        Self {
            message,
            total_leads_scanned,
            anomalies_detected,
            anomalies,
            by_severity,
            by_origin,
            analysis: None,
            started_at,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawke_core::model::{Origin, Severity};

    fn entry(severity: Severity, origin: Origin) -> LeadAnomaly {
        LeadAnomaly {
            prospect_id: "p-1".to_string(),
            lead_name: "Ana Iyer".to_string(),
            stage: "Application Pending".to_string(),
            anomaly: Anomaly {
                kind: "x".to_string(),
                severity,
                confidence: 0.5,
                explanation: String::new(),
                origin,
            },
            primary: true,
        }
    }

    #[test]
    fn tallies_severity_and_origin() {
        let report = ScanReport::assemble(
            10,
            vec![
                entry(Severity::High, Origin::Crm),
                entry(Severity::High, Origin::Sis),
                entry(Severity::Critical, Origin::Sis),
            ],
            "2026-03-01T00:00:00Z".to_string(),
            42,
        );
        assert_eq!(report.total_leads_scanned, 10);
        assert_eq!(report.anomalies_detected, 3);
        assert_eq!(report.by_severity["High"], 2);
        assert_eq!(report.by_severity["Critical"], 1);
        assert_eq!(report.by_origin["CRM"], 1);
        assert_eq!(report.by_origin["SIS"], 2);
    }

    #[test]
    fn empty_scan_reports_zero_counts() {
        let report = ScanReport::assemble(0, vec![], "2026-03-01T00:00:00Z".to_string(), 1);
        assert_eq!(report.total_leads_scanned, 0);
        assert_eq!(report.anomalies_detected, 0);
        assert!(report.by_severity.is_empty());
        assert!(report.analysis.is_none());
    }
}
