mod api;
mod router;
mod scan;
mod state;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use hawke_crm::{CrmApi, LeadSquaredClient};
use hawke_llm::ScanAnalyst;
use hawke_sis::{MavisClient, SisApi};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    hawke_core::config::load_dotenv();
    let config = hawke_core::Config::from_env();
    config.log_summary();

    let crm: Arc<dyn CrmApi> = Arc::new(
        LeadSquaredClient::from_config(&config.crm)
            .context("CRM credentials are required (LSQ_ACCESS_KEY / LSQ_SECRET_KEY)")?,
    );

    let sis: Option<Arc<dyn SisApi>> = match MavisClient::from_config(&config.sis) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("SIS unavailable: {} — SIS rules disabled", e);
            None
        }
    };

    let analyst = match ScanAnalyst::from_config(&config.llm) {
        Ok(analyst) => {
            info!("scan analyst ready (provider: {})", config.llm.provider);
            Some(analyst)
        }
        Err(e) => {
            warn!("scan analyst unavailable: {} — scans will carry no analysis", e);
            None
        }
    };

    let state = Arc::new(state::AppState::new(crm, sis, analyst));
    let app = router::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Agent Hawke listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
