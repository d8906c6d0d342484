use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use hawke_core::config::CrmConfig;
use hawke_core::model::{ActivityRecord, Anomaly};

use crate::{CrmApi, CrmError};

/// How many of a lead's most recent activities one fetch returns.
pub const RECENT_ACTIVITY_CAP: usize = 50;

/// Custom LeadSquared activity event code used for decision log entries.
const DECISION_EVENT_CODE: u32 = 285;

/// CRM fields updated when an anomaly is written back.
const FIELD_ANOMALY_TYPE: &str = "mx_Anomaly_Type";
const FIELD_ANOMALY_SEVERITY: &str = "mx_Anomaly_Severity";
const FIELD_ANOMALY_EXPLANATION: &str = "mx_Anomaly_Explanation";
const FIELD_LAST_RUN: &str = "mx_Anomaly_Last_Run";

pub struct LeadSquaredClient {
    client: reqwest::Client,
    api_base: String,
    access_key: String,
    secret_key: String,
}

impl LeadSquaredClient {
    /// Build from config. Fails when access or secret key is missing.
    pub fn from_config(config: &CrmConfig) -> Result<Self, CrmError> {
        let access_key = config
            .access_key
            .clone()
            .ok_or_else(|| CrmError::NotConfigured("LSQ_ACCESS_KEY is not set".to_string()))?;
        let secret_key = config
            .secret_key
            .clone()
            .ok_or_else(|| CrmError::NotConfigured("LSQ_SECRET_KEY is not set".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_key,
            secret_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn post(&self, path: &str, query: &[(&str, &str)], body: Value) -> Result<Value, CrmError> {
        let mut params = vec![
            ("accessKey", self.access_key.as_str()),
            ("secretKey", self.secret_key.as_str()),
        ];
        params.extend_from_slice(query);

        debug!("CRM request: {}", path);

        let response = self
            .client
            .post(self.url(path))
            .query(&params)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CrmApi for LeadSquaredClient {
    async fn leads_in_stage(&self, stage: &str) -> Result<Vec<Value>, CrmError> {
        let body = json!({
            "Parameter": {
                "LookupName": "ProspectStage",
                "LookupValue": stage,
            },
            "Paging": { "PageIndex": 1, "PageSize": 500 },
        });

        let response = self.post("LeadManagement.svc/Leads.Get", &[], body).await?;
        Ok(extract_rows(&response))
    }

    async fn recent_activities(&self, prospect_id: &str) -> Result<Vec<ActivityRecord>, CrmError> {
        let body = json!({
            "Parameter": { "LeadId": prospect_id },
            "Paging": { "PageIndex": 1, "PageSize": RECENT_ACTIVITY_CAP },
            "Sorting": { "ColumnName": "CreatedOn", "Direction": "1" },
        });

        let response = self
            .post("ProspectActivity.svc/Retrieve", &[], body)
            .await?;
        Ok(parse_activities(&response))
    }

    async fn write_anomaly_fields(
        &self,
        prospect_id: &str,
        anomaly: &Anomaly,
    ) -> Result<(), CrmError> {
        let body = json!([
            { "Attribute": FIELD_ANOMALY_TYPE, "Value": anomaly.kind },
            { "Attribute": FIELD_ANOMALY_SEVERITY, "Value": anomaly.severity.as_str() },
            { "Attribute": FIELD_ANOMALY_EXPLANATION, "Value": anomaly.explanation },
            { "Attribute": FIELD_LAST_RUN, "Value": Utc::now().to_rfc3339() },
        ]);

        self.post(
            "LeadManagement.svc/Lead.Update",
            &[("leadId", prospect_id)],
            body,
        )
        .await?;
        Ok(())
    }

    async fn log_decision(&self, prospect_id: &str, note: &str) -> Result<(), CrmError> {
        let body = json!({
            "RelatedProspectId": prospect_id,
            "ActivityEvent": DECISION_EVENT_CODE,
            "ActivityNote": note,
            "ActivityDateTime": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });

        self.post("ProspectActivity.svc/Create", &[], body).await?;
        Ok(())
    }
}

/// Pull the row list out of a LeadSquared response. Leads.Get returns a
/// bare array; some tenants wrap it in a `Leads` or `List` envelope.
fn extract_rows(response: &Value) -> Vec<Value> {
    if let Value::Array(rows) = response {
        return rows.clone();
    }
    for key in ["Leads", "List", "LeadPropertyList"] {
        if let Some(Value::Array(rows)) = response.get(key) {
            return rows.clone();
        }
    }
    Vec::new()
}

/// Parse activity rows out of a ProspectActivity.svc/Retrieve response.
///
/// Event name and timestamp keys differ between tenant versions, so both
/// known spellings are tried. Rows without an event name are dropped.
fn parse_activities(response: &Value) -> Vec<ActivityRecord> {
    let rows = response
        .get("ProspectActivities")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_else(|| extract_rows(response));

    rows.iter()
        .filter_map(|row| {
            let event = ["ActivityEventName", "EventName", "ActivityName"]
                .iter()
                .find_map(|key| row.get(*key).and_then(Value::as_str))?
                .to_string();
            let created_at = ["CreatedOn", "ActivityDateTime"]
                .iter()
                .find_map(|key| row.get(*key).and_then(Value::as_str))
                .map(str::to_string);
            Some(ActivityRecord { event, created_at })
        })
        .collect()
}
