//! Mavis student-information-system client.
//!
//! Bulk-fetches student records keyed by prospect id. Absence of a record
//! for a lead is a valid state; absence of an API key means the whole SIS
//! pipeline is skipped.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use hawke_core::config::SisConfig;
use hawke_core::model::SisRecord;

#[derive(Debug, thiserror::Error)]
pub enum SisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SIS API error: {status} — {body}")]
    Api { status: u16, body: String },
    #[error("SIS client not configured: {0}")]
    NotConfigured(String),
}

/// Seam for the SIS collaborator.
#[async_trait]
pub trait SisApi: Send + Sync {
    /// Fetch student records for the given prospect ids. Records the SIS
    /// does not know about are simply missing from the result.
    async fn students(&self, prospect_ids: &[String]) -> Result<Vec<SisRecord>, SisError>;

    /// Raw passthrough of the SIS student payload, for schema discovery.
    async fn raw_students(&self) -> Result<Value, SisError>;
}

pub struct MavisClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl MavisClient {
    /// Build from config. Fails when the API key is missing — callers
    /// treat that as "no SIS" rather than an error.
    pub fn from_config(config: &SisConfig) -> Result<Self, SisError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SisError::NotConfigured("MAVIS_API_KEY is not set".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_students(&self, ids: Option<&str>) -> Result<Value, SisError> {
        let mut request = self
            .client
            .get(format!("{}/students", self.api_base))
            .header("x-api-key", &self.api_key);
        if let Some(ids) = ids {
            request = request.query(&[("ids", ids)]);
        }

        debug!("SIS request: /students");

        let response = request.send().await?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(SisError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SisApi for MavisClient {
    async fn students(&self, prospect_ids: &[String]) -> Result<Vec<SisRecord>, SisError> {
        let ids = prospect_ids.join(",");
        let payload = self.get_students(Some(&ids)).await?;
        Ok(parse_students(&payload))
    }

    async fn raw_students(&self) -> Result<Value, SisError> {
        self.get_students(None).await
    }
}

/// Parse SIS records out of a Mavis payload. The endpoint returns either
/// a bare array or a `{"students": [...]}` envelope; rows that fail to
/// deserialize are dropped rather than failing the batch.
fn parse_students(payload: &Value) -> Vec<SisRecord> {
    let rows = match payload {
        Value::Array(rows) => rows.as_slice(),
        Value::Object(map) => map
            .get("students")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };

    rows.iter()
        .filter_map(|row| serde_json::from_value::<SisRecord>(row.clone()).ok())
        .filter(|record| !record.prospect_id.is_empty())
        .collect()
}
