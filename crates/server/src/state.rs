use std::sync::Arc;

use tokio::sync::RwLock;

use hawke_core::schema::FieldSchema;
use hawke_crm::CrmApi;
use hawke_engine::ScanReport;
use hawke_llm::ScanAnalyst;
use hawke_sis::SisApi;

pub struct AppState {
    pub crm: Arc<dyn CrmApi>,
    /// Absent when no SIS key is configured; SIS rules are then skipped.
    pub sis: Option<Arc<dyn SisApi>>,
    /// Absent when no LLM is configured; scans then carry no analysis.
    pub analyst: Option<ScanAnalyst>,
    pub schema: FieldSchema,
    /// Report of the most recent successful run. Written only on run
    /// completion, read by `GET /last-scan`, cleared by process restart.
    pub last_scan: RwLock<Option<ScanReport>>,
}

impl AppState {
    pub fn new(
        crm: Arc<dyn CrmApi>,
        sis: Option<Arc<dyn SisApi>>,
        analyst: Option<ScanAnalyst>,
    ) -> Self {
        Self {
            crm,
            sis,
            analyst,
            schema: FieldSchema::default(),
            last_scan: RwLock::new(None),
        }
    }
}
