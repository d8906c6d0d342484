//! HTTP router construction.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health))
        .route("/run-intelligence", post(api::run_intelligence))
        .route("/last-scan", get(api::last_scan))
        .route("/sis-data", get(api::sis_data))
        .route("/discover-activity-types", get(api::discover_activity_types))
        .route("/debug-students", get(api::debug_students))
        .route("/write-decision", post(api::write_decision))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::test_support::{MockCrm, MockSis};

    fn app(crm: MockCrm, sis: Option<MockSis>) -> Router {
        let state = AppState::new(
            Arc::new(crm),
            sis.map(|s| Arc::new(s) as Arc<dyn hawke_sis::SisApi>),
            None,
        );
        build_router(Arc::new(state))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_returns_liveness_text() {
        let app = app(MockCrm::default(), None);
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Agent Hawke is live");
    }

    #[tokio::test]
    async fn last_scan_before_any_run_says_so() {
        let app = app(MockCrm::default(), None);
        let response = app
            .oneshot(Request::get("/last-scan").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "No scan has run yet");
    }

    #[tokio::test]
    async fn run_intelligence_returns_and_caches_a_report() {
        let state = Arc::new(AppState::new(Arc::new(MockCrm::default()), None, None));
        let app = build_router(state.clone());

        let response = app
            .oneshot(
                Request::post("/run-intelligence")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total_leads_scanned"], 0);
        assert_eq!(body["anomalies_detected"], 0);
        assert!(state.last_scan.read().await.is_some());
    }

    #[tokio::test]
    async fn failed_scan_returns_500_and_caches_nothing() {
        let mut crm = MockCrm::default();
        crm.fail_fetches = true;
        let state = Arc::new(AppState::new(Arc::new(crm), None, None));
        let app = build_router(state.clone());

        let response = app
            .oneshot(
                Request::post("/run-intelligence")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.last_scan.read().await.is_none());
    }

    #[tokio::test]
    async fn write_decision_requires_lead_id_and_decision() {
        for body in [
            json!({ "decision": "escalate" }),
            json!({ "leadId": "p-1" }),
            json!({ "leadId": "", "decision": "escalate" }),
        ] {
            let app = app(MockCrm::default(), None);
            let response = app
                .oneshot(
                    Request::post("/write-decision")
                        .header("content-type", "application/json")
                        .body(Body::from(body.to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn write_decision_logs_an_activity() {
        let crm = MockCrm::default();
        let log_calls = crm.log_calls.clone();
        let app = app(crm, None);

        let body = json!({
            "leadId": "p-1",
            "decision": "escalate",
            "riskLevel": "High",
            "findings": ["offer stalled 20 days"],
        });
        let response = app
            .oneshot(
                Request::post("/write-decision")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["lead_id"], "p-1");
        assert_eq!(log_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sis_data_without_sis_is_unavailable() {
        let app = app(MockCrm::default(), None);
        let response = app
            .oneshot(Request::get("/sis-data").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn sis_data_passes_payload_through() {
        let mut sis = MockSis::default();
        sis.add(hawke_core::model::SisRecord {
            prospect_id: "p-1".to_string(),
            enrollment_status: "Enrolled".to_string(),
            ..Default::default()
        });
        let app = app(MockCrm::default(), Some(sis));
        let response = app
            .oneshot(Request::get("/sis-data").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["students"][0]["prospectId"], "p-1");
    }

    #[tokio::test]
    async fn discover_activity_types_tallies_events() {
        let mut crm = MockCrm::default();
        crm.add_lead(
            "Application Pending",
            json!({ "ProspectID": "p-1", "ProspectStage": "Application Pending" }),
        );
        crm.add_activity("p-1", "Email Opened");
        crm.add_activity("p-1", "Email Opened");
        crm.add_activity("p-1", "Meeting");
        let app = app(crm, None);

        let response = app
            .oneshot(
                Request::get("/discover-activity-types")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["leads_sampled"], 1);
        assert_eq!(body["counts_by_event"]["Email Opened"], 2);
        assert_eq!(body["counts_by_event"]["Meeting"], 1);
    }
}
