use api_types::health::HealthResponse;
use axum::{Json, extract::State};
use chrono::Utc;

use crate::server::ServerState;

/// Liveness and configuration summary. Served without authentication.
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let database = match state.engine.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("database ping failed: {err}");
            false
        }
    };
    let dispatcher = state.agent.dispatcher();

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" }.to_string(),
        database,
        fx_provider: dispatcher.currency().provider_name().to_string(),
        llm_provider: state.agent.provider_name().to_string(),
        calendar_provider: dispatcher.calendar().provider_name().map(ToString::to_string),
        registry_size: dispatcher.tools().len(),
        timestamp: Utc::now(),
    })
}
