pub mod health;
pub mod session;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

/// Loopback API the host shell drives the session through.
pub fn build_router(state: AppState) -> Router {
    let session_api = Router::new()
        .route("/session", get(session::get_session))
        .route("/session/begin", post(session::begin))
        .route("/session/answers/:question_id", put(session::put_answer))
        .route("/session/answers/:question_id/save", post(session::save_answer))
        .route("/session/signals", post(session::post_signal))
        .route("/session/platform", post(session::post_platform))
        .route("/session/submit", post(session::submit))
        .route("/session/finalize/retry", post(session::retry_finalize));

    Router::new()
        .route("/health", get(health::health))
        .merge(session_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
}
