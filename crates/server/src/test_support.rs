//! In-memory collaborator doubles shared by the server tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use hawke_core::model::{ActivityRecord, Anomaly, SisRecord};
use hawke_crm::{CrmApi, CrmError};
use hawke_llm::{LlmError, LlmProvider, Message};
use hawke_sis::{SisApi, SisError};

#[derive(Default)]
pub struct MockCrm {
    pub leads_by_stage: HashMap<String, Vec<Value>>,
    pub activities: HashMap<String, Vec<ActivityRecord>>,
    pub fail_fetches: bool,
    pub fail_writes: bool,
    pub activity_fetches: Arc<AtomicUsize>,
    pub write_calls: Arc<AtomicUsize>,
    pub log_calls: Arc<AtomicUsize>,
}

impl MockCrm {
    pub fn add_lead(&mut self, stage: &str, lead: Value) {
        self.leads_by_stage
            .entry(stage.to_string())
            .or_default()
            .push(lead);
    }

    pub fn add_activity(&mut self, prospect_id: &str, event: &str) {
        self.activities
            .entry(prospect_id.to_string())
            .or_default()
            .push(ActivityRecord {
                event: event.to_string(),
                created_at: None,
            });
    }
}

#[async_trait]
impl CrmApi for MockCrm {
    async fn leads_in_stage(&self, stage: &str) -> Result<Vec<Value>, CrmError> {
        if self.fail_fetches {
            return Err(CrmError::Api {
                status: 500,
                body: "upstream down".to_string(),
            });
        }
        Ok(self.leads_by_stage.get(stage).cloned().unwrap_or_default())
    }

    async fn recent_activities(&self, prospect_id: &str) -> Result<Vec<ActivityRecord>, CrmError> {
        if self.fail_fetches {
            return Err(CrmError::Api {
                status: 500,
                body: "upstream down".to_string(),
            });
        }
        self.activity_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.activities.get(prospect_id).cloned().unwrap_or_default())
    }

    async fn write_anomaly_fields(
        &self,
        _prospect_id: &str,
        _anomaly: &Anomaly,
    ) -> Result<(), CrmError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(CrmError::Api {
                status: 500,
                body: "write rejected".to_string(),
            });
        }
        Ok(())
    }

    async fn log_decision(&self, _prospect_id: &str, _note: &str) -> Result<(), CrmError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(CrmError::Api {
                status: 500,
                body: "write rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockSis {
    pub records: Vec<SisRecord>,
    pub fail_fetches: bool,
}

impl MockSis {
    pub fn add(&mut self, record: SisRecord) {
        self.records.push(record);
    }
}

#[async_trait]
impl SisApi for MockSis {
    async fn students(&self, prospect_ids: &[String]) -> Result<Vec<SisRecord>, SisError> {
        if self.fail_fetches {
            return Err(SisError::Api {
                status: 500,
                body: "sis down".to_string(),
            });
        }
        Ok(self
            .records
            .iter()
            .filter(|r| prospect_ids.contains(&r.prospect_id))
            .cloned()
            .collect())
    }

    async fn raw_students(&self) -> Result<Value, SisError> {
        if self.fail_fetches {
            return Err(SisError::Api {
                status: 500,
                body: "sis down".to_string(),
            });
        }
        Ok(json!({ "students": self.records }))
    }
}

pub struct MockLlm {
    pub calls: Arc<AtomicUsize>,
    pub response: String,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::with_response(r#"{"root_causes": [], "recommendations": [], "risk_summary": ""}"#)
    }
}

impl MockLlm {
    pub fn with_response(response: &str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            response: response.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(
        &self,
        _messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}
