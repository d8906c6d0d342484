//! The anomaly rules.
//!
//! CRM rules fire on stage/time heuristics against the lead itself plus its
//! recent activity list; SIS rules fire on cross-system status mismatches
//! and financial/academic risk. Keyword matching is case-insensitive
//! containment in both directions, the most permissive observed policy.

use chrono::{DateTime, Utc};

use hawke_core::age::days_between_at;
use hawke_core::model::{ActivityRecord, Anomaly, LeadRecord, Origin, Severity, SisRecord};

// ── Stages ──────────────────────────────────────────────────────────

pub const STAGE_ENGAGEMENT_INITIATED: &str = "engagement initiated";
pub const STAGE_APPLICATION_PENDING: &str = "application pending";
pub const STAGE_APPLICATION_COMPLETED: &str = "application completed";
pub const STAGE_ENROLLED: &str = "enrolled";

/// Pipeline stages one scan fetches, in pipeline order. Enrolled is
/// included because the SIS mismatch rules need it.
pub const SCAN_STAGES: [&str; 4] = [
    "Engagement Initiated",
    "Application Pending",
    "Application Completed",
    "Enrolled",
];

// ── Keyword sets ────────────────────────────────────────────────────

/// Sources that indicate a high-intent lead.
pub const HIGH_INTENT_SOURCES: [&str; 5] = [
    "B2B Referral",
    "Website",
    "Chatbot",
    "Inbound Phone Call",
    "Pay per Click Ads",
];

/// Activity kinds that count as counselor contact.
pub const COUNSELOR_KEYWORDS: [&str; 5] = [
    "Inbound Phone Call Activity",
    "Outbound Phone Call Activity",
    "Invorto Call Qualification",
    "Meeting",
    "Flostack Appointment",
];

/// Counselor keywords plus self-serve engagement signals.
pub const ENGAGEMENT_KEYWORDS: [&str; 10] = [
    "Inbound Phone Call Activity",
    "Outbound Phone Call Activity",
    "Invorto Call Qualification",
    "Meeting",
    "Flostack Appointment",
    "Email Opened",
    "Email Link Clicked",
    "Dynamic Form Submission",
    "Logged into Portal",
    "Logged out of Portal",
];

/// Case-insensitive containment in either direction: "Meeting" matches
/// "Sales Meeting Completed", and a verbose keyword still matches a
/// tenant's abbreviated event name.
fn keyword_match(event: &str, keyword: &str) -> bool {
    let event = event.trim().to_lowercase();
    let keyword = keyword.to_lowercase();
    if event.is_empty() {
        return false;
    }
    event.contains(&keyword) || keyword.contains(&event)
}

fn any_activity_matches(activities: &[ActivityRecord], keywords: &[&str]) -> bool {
    activities
        .iter()
        .any(|a| keywords.iter().any(|k| keyword_match(&a.event, k)))
}

// ── CRM rules ───────────────────────────────────────────────────────

const OFFER_STALLED_DAYS: i64 = 14;
const NO_FOLLOWUP_DAYS: i64 = 5;
const PENDING_STALLED_DAYS: i64 = 7;
const NO_MOVEMENT_DAYS: i64 = 7;

/// Whether any activity-dependent CRM rule could fire for this lead.
/// The orchestrator uses this to fetch activities lazily.
pub fn crm_rules_need_activities(lead: &LeadRecord) -> bool {
    lead.stage == STAGE_APPLICATION_COMPLETED || lead.stage == STAGE_APPLICATION_PENDING
}

/// Evaluate the CRM rule set in priority order, stopping at the first
/// match. Returns at most one anomaly.
pub fn evaluate_crm(
    lead: &LeadRecord,
    activities: &[ActivityRecord],
    now: DateTime<Utc>,
) -> Option<Anomaly> {
    let days_in_stage = days_between_at(lead.stage_entered_at.as_deref(), now);

    // 1. Offer Stalled
    if lead.offer_given_at.is_some() && lead.stage != STAGE_ENROLLED {
        let offer_age = days_between_at(lead.offer_given_at.as_deref(), now);
        if offer_age > OFFER_STALLED_DAYS {
            return Some(Anomaly {
                kind: "Offer Stalled".to_string(),
                severity: Severity::High,
                confidence: 0.85,
                explanation: format!(
                    "Admission offer given {} days ago but stage is still '{}'",
                    offer_age, lead.stage_label
                ),
                origin: Origin::Crm,
            });
        }
    }

    // 2. Application Completed — No Counselor Follow-up
    if lead.stage == STAGE_APPLICATION_COMPLETED
        && days_in_stage > NO_FOLLOWUP_DAYS
        && !any_activity_matches(activities, &COUNSELOR_KEYWORDS)
    {
        return Some(Anomaly {
            kind: "Application Completed - No Counselor Follow-up".to_string(),
            severity: Severity::High,
            confidence: 0.9,
            explanation: format!(
                "Application completed {} days ago with no counselor contact since",
                days_in_stage
            ),
            origin: Origin::Crm,
        });
    }

    // 3. Application Pending — Stalled
    if lead.stage == STAGE_APPLICATION_PENDING
        && days_in_stage > PENDING_STALLED_DAYS
        && !any_activity_matches(activities, &ENGAGEMENT_KEYWORDS)
    {
        return Some(Anomaly {
            kind: "Application Pending - Stalled".to_string(),
            severity: Severity::Medium,
            confidence: 0.75,
            explanation: format!(
                "Application pending for {} days with no engagement activity",
                days_in_stage
            ),
            origin: Origin::Crm,
        });
    }

    // 4. High Intent — No Movement
    if lead.stage == STAGE_ENGAGEMENT_INITIATED
        && HIGH_INTENT_SOURCES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&lead.source))
        && days_in_stage > NO_MOVEMENT_DAYS
    {
        return Some(Anomaly {
            kind: "High Intent - No Movement".to_string(),
            severity: Severity::Medium,
            confidence: 0.7,
            explanation: format!(
                "High-intent source '{}' with no stage movement for {} days",
                lead.source, days_in_stage
            ),
            origin: Origin::Crm,
        });
    }

    None
}

// ── SIS rules ───────────────────────────────────────────────────────

const TUITION_BALANCE_FLOOR: f64 = 3000.0;
const TUITION_BALANCE_HIGH: f64 = 5000.0;

/// CRM stages that contradict an SIS "Withdrawn" status.
const ACTIVE_PIPELINE_STAGES: [&str; 4] = [
    STAGE_ENGAGEMENT_INITIATED,
    STAGE_APPLICATION_PENDING,
    STAGE_APPLICATION_COMPLETED,
    STAGE_ENROLLED,
];

/// Evaluate the SIS rule set in priority order, stopping at the first
/// match. Only called when a joined SIS record exists.
pub fn evaluate_sis(lead: &LeadRecord, sis: &SisRecord) -> Option<Anomaly> {
    let status = sis.enrollment_status.trim().to_lowercase();
    let standing = sis.academic_standing.trim().to_lowercase();
    let aid = sis.financial_aid_status.trim().to_lowercase();

    // 5. Enrollment Status Mismatch (withdrawn in SIS, live in CRM)
    if status == "withdrawn" && ACTIVE_PIPELINE_STAGES.contains(&lead.stage.as_str()) {
        return Some(Anomaly {
            kind: "Enrollment Status Mismatch".to_string(),
            severity: Severity::Critical,
            confidence: 0.95,
            explanation: format!(
                "SIS shows student withdrawn but CRM stage is still '{}'",
                lead.stage_label
            ),
            origin: Origin::Sis,
        });
    }

    // 6. Enrollment Status Mismatch — Admitted
    if sis.student_id.is_some()
        && (status == "active" || status == "admitted")
        && lead.stage == STAGE_APPLICATION_COMPLETED
    {
        return Some(Anomaly {
            kind: "Enrollment Status Mismatch - Admitted".to_string(),
            severity: Severity::High,
            confidence: 0.85,
            explanation: format!(
                "SIS status is '{}' but CRM stage is still 'Application Completed'",
                sis.enrollment_status
            ),
            origin: Origin::Sis,
        });
    }

    // 7. High Tuition Balance (graded severity)
    if (status == "enrolled" || status == "active") && sis.tuition_balance > TUITION_BALANCE_FLOOR {
        let severity = if aid == "denied" {
            Severity::Critical
        } else if sis.tuition_balance > TUITION_BALANCE_HIGH {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(Anomaly {
            kind: "High Tuition Balance".to_string(),
            severity,
            confidence: 0.8,
            explanation: format!(
                "Tuition balance of {:.2} outstanding (financial aid: {})",
                sis.tuition_balance,
                if sis.financial_aid_status.is_empty() {
                    "unknown"
                } else {
                    &sis.financial_aid_status
                }
            ),
            origin: Origin::Sis,
        });
    }

    // 8. Academic Probation/Suspension
    if standing == "probation" || standing == "suspension" {
        let severity = if standing == "suspension" {
            Severity::Critical
        } else {
            Severity::High
        };
        return Some(Anomaly {
            kind: "Academic Probation/Suspension".to_string(),
            severity,
            confidence: 0.9,
            explanation: format!("Academic standing is '{}'", sis.academic_standing),
            origin: Origin::Sis,
        });
    }

    // 9. Zero Progress
    if status == "enrolled" && sis.credits_earned == 0.0 {
        if let Some(term) = sis.current_term.as_deref().filter(|t| !t.is_empty()) {
            return Some(Anomaly {
                kind: "Zero Progress".to_string(),
                severity: Severity::High,
                confidence: 0.8,
                explanation: format!("Enrolled in {} with zero credits earned", term),
                origin: Origin::Sis,
            });
        }
    }

    None
}

// ── Primary selection ───────────────────────────────────────────────

/// Pick the single anomaly written back to the CRM when both pipelines
/// fire. A Critical SIS anomaly always wins; a High SIS anomaly wins
/// unless the CRM anomaly is itself Critical; otherwise the CRM anomaly
/// is primary, falling back to the SIS anomaly.
pub fn primary_anomaly<'a>(
    crm: Option<&'a Anomaly>,
    sis: Option<&'a Anomaly>,
) -> Option<&'a Anomaly> {
    match (crm, sis) {
        (_, Some(s)) if s.severity == Severity::Critical => sis,
        (Some(c), Some(s))
            if s.severity == Severity::High && c.severity != Severity::Critical =>
        {
            Some(s)
        }
        (Some(_), _) => crm,
        (None, _) => sis,
    }
}
