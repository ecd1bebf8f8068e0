use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    // The loop answering at all is the liveness signal.
    match state.session.snapshot().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "session": snapshot.state,
            })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "session_closed",
            })),
        ),
    }
}
