//! Canonical data model shared across the workspace.
//!
//! CRM leads arrive as property lists and are resolved into [`LeadRecord`]
//! by [`crate::schema::FieldSchema`]; SIS records deserialize directly from
//! the Mavis API. Anomalies are ephemeral per-scan values — the CRM record
//! itself is the durable store.

use serde::{Deserialize, Serialize};

/// Anomaly severity, ordered so that `Critical > High > Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule pipeline produced an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Origin {
    Crm,
    Sis,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Origin::Crm => "CRM",
            Origin::Sis => "SIS",
        })
    }
}

/// A detected deviation from expected pipeline progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Rule label, e.g. "Offer Stalled".
    pub kind: String,
    pub severity: Severity,
    /// Fixed per-rule constant, not computed.
    pub confidence: f64,
    pub explanation: String,
    pub origin: Origin,
}

/// A CRM lead after field-schema resolution.
///
/// `stage` and `source` are trimmed and lower-cased for comparison;
/// `stage_label` keeps the CRM's original casing for display and write-back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadRecord {
    pub prospect_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub stage: String,
    pub stage_label: String,
    pub source: String,
    pub stage_entered_at: Option<String>,
    pub offer_given_at: Option<String>,
    pub lead_type: String,
}

impl LeadRecord {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    /// Leads carrying a non-student lead type are excluded from scans.
    /// An empty lead type is kept (many tenants never set the field).
    pub fn is_student(&self) -> bool {
        self.lead_type.is_empty() || self.lead_type == "student"
    }
}

/// One CRM activity event attached to a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub event: String,
    pub created_at: Option<String>,
}

/// A student record from the secondary SIS (Mavis), joined 1:1 at most
/// with a lead by prospect id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SisRecord {
    pub prospect_id: String,
    pub student_id: Option<String>,
    pub enrollment_status: String,
    pub academic_standing: String,
    pub credits_earned: f64,
    pub tuition_balance: f64,
    pub financial_aid_status: String,
    pub scholarship_amount: f64,
    pub current_term: Option<String>,
    pub expected_graduation: Option<String>,
}
