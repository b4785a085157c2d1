use crate::models::{ChatRequest, ChatResponse};
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, Json};
use service_core::error::AppError;

/// `POST /chat` (server) and `POST /` (function).
///
/// The body is read raw so malformed JSON ends up as a missing message
/// rather than an extractor rejection.
pub async fn chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request = ChatRequest::from_body(&body);
    let response = state.relay.respond(&request).await?;
    Ok(Json(response))
}
