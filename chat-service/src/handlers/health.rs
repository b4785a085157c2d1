use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

pub const ROOT_BANNER: &str = "HealthPilot API OK";

/// `GET /` on the standalone server.
pub async fn root() -> &'static str {
    ROOT_BANNER
}

/// Liveness probe. Does not call the provider.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "chat-service",
        "adapter": state.adapter.as_str(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
