//! Scan analyst: turns a detected-anomaly list into a ranked root-cause
//! analysis via one LLM completion.
//!
//! The model is asked for strict JSON; the response is extracted leniently
//! (markdown fences tolerated) and parsed into [`ScanAnalysis`]. Anything
//! that goes wrong yields `None` — the scan itself never fails on analysis.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hawke_core::config::LlmConfig;
use hawke_engine::report::LeadAnomaly;

use crate::{create_provider, LlmError, LlmProvider, Message, Role};

const SYSTEM_PROMPT: &str = "\
You are an admissions-operations analyst. You receive a list of anomalies \
detected across a student-admissions pipeline (CRM stage heuristics and \
student-information-system cross-checks). Identify the likely root causes, \
recommend corrective actions, and summarize the overall risk.\n\
Respond ONLY with a JSON object of this exact shape:\n\
{\n\
  \"root_causes\": [{\"cause\": str, \"confidence\": float 0-1, \"affected_count\": int}],\n\
  \"recommendations\": [{\"action\": str, \"priority\": \"High\"|\"Medium\"|\"Low\", \"effort\": str, \"impact\": str}],\n\
  \"risk_summary\": str\n\
}";

/// Structured result of the LLM analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAnalysis {
    #[serde(default)]
    pub root_causes: Vec<RootCause>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub risk_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootCause {
    pub cause: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub affected_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub effort: String,
    #[serde(default)]
    pub impact: String,
}

pub struct ScanAnalyst {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl ScanAnalyst {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Build from config, creating the configured provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider = create_provider(config)?;
        Ok(Self::new(provider, config.temperature, config.max_tokens))
    }

    /// Analyze one scan's anomalies. Best-effort: any provider or parse
    /// failure is logged and returns `None`.
    pub async fn analyze(
        &self,
        anomalies: &[LeadAnomaly],
        total_scanned: usize,
    ) -> Option<ScanAnalysis> {
        if anomalies.is_empty() {
            return None;
        }

        let messages = vec![
            Message {
                role: Role::System,
                content: SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: Role::User,
                content: build_digest(anomalies, total_scanned),
            },
        ];

        let response = match self
            .provider
            .complete(messages, self.temperature, self.max_tokens)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("scan analysis failed: {} — continuing without it", e);
                return None;
            }
        };

        debug!("analyst response: {}", response);

        match serde_json::from_str::<ScanAnalysis>(extract_json(&response)) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!("scan analysis returned malformed JSON: {} — dropping it", e);
                None
            }
        }
    }
}

/// Compact one-line-per-anomaly digest sent to the model.
fn build_digest(anomalies: &[LeadAnomaly], total_scanned: usize) -> String {
    let mut digest = format!(
        "Scanned {} leads; {} anomalies detected:\n",
        total_scanned,
        anomalies.len()
    );
    for entry in anomalies {
        digest.push_str(&format!(
            "- {} (stage: {}) [{}/{}] {}: {}\n",
            entry.lead_name,
            entry.stage,
            entry.anomaly.origin,
            entry.anomaly.severity,
            entry.anomaly.kind,
            entry.anomaly.explanation,
        ));
    }
    digest
}

/// Extract JSON from an LLM response, handling markdown code blocks.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let json_start = start + 3;
        // Skip past any language identifier on the same line
        let after_tick = &trimmed[json_start..];
        let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after_tick[content_start..].find("```") {
            return after_tick[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawke_core::model::{Anomaly, Origin, Severity};

    #[test]
    fn extract_json_raw() {
        let input = r#"{"risk_summary": "ok"}"#;
        assert_eq!(extract_json(input), r#"{"risk_summary": "ok"}"#);
    }

    #[test]
    fn extract_json_code_block() {
        let input = "Here you go:\n```json\n{\"risk_summary\": \"ok\"}\n```\nDone.";
        assert_eq!(extract_json(input), r#"{"risk_summary": "ok"}"#);
    }

    #[test]
    fn extract_json_with_prefix() {
        let input = "Sure! {\"risk_summary\": \"ok\"} hope that helps";
        assert_eq!(extract_json(input), r#"{"risk_summary": "ok"}"#);
    }

    #[test]
    fn parses_full_analysis_shape() {
        let raw = r#"{
            "root_causes": [
                {"cause": "Counselor capacity gap", "confidence": 0.8, "affected_count": 4}
            ],
            "recommendations": [
                {"action": "Assign follow-up owner", "priority": "High", "effort": "Low", "impact": "High"}
            ],
            "risk_summary": "Pipeline is stalling at the completed-application stage."
        }"#;
        let analysis: ScanAnalysis = serde_json::from_str(extract_json(raw)).unwrap();
        assert_eq!(analysis.root_causes.len(), 1);
        assert_eq!(analysis.root_causes[0].affected_count, 4);
        assert_eq!(analysis.recommendations[0].priority, "High");
        assert!(analysis.risk_summary.contains("stalling"));
    }

    #[test]
    fn missing_fields_default_rather_than_fail() {
        let analysis: ScanAnalysis = serde_json::from_str(r#"{"risk_summary": "fine"}"#).unwrap();
        assert!(analysis.root_causes.is_empty());
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn digest_lists_each_anomaly() {
        let anomalies = vec![LeadAnomaly {
            prospect_id: "p-1".to_string(),
            lead_name: "Ana Iyer".to_string(),
            stage: "Application Completed".to_string(),
            anomaly: Anomaly {
                kind: "Offer Stalled".to_string(),
                severity: Severity::High,
                confidence: 0.85,
                explanation: "offer given 20 days ago".to_string(),
                origin: Origin::Crm,
            },
            primary: true,
        }];
        let digest = build_digest(&anomalies, 12);
        assert!(digest.contains("Scanned 12 leads"));
        assert!(digest.contains("Ana Iyer"));
        assert!(digest.contains("[CRM/High] Offer Stalled"));
    }
}
