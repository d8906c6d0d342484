//! Anomaly-detection rule engine.
//!
//! Two independent pipelines — CRM rules and SIS rules — each evaluated in
//! fixed priority order with short-circuit at the first match, so a lead
//! carries at most one anomaly per origin per scan. Evaluation is a pure
//! function of its inputs and the `now` passed in.

pub mod report;
pub mod rules;

pub use report::{LeadAnomaly, ScanReport};
pub use rules::{
    crm_rules_need_activities, evaluate_crm, evaluate_sis, primary_anomaly, SCAN_STAGES,
};
