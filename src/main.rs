use proctored_exam::{
    config::{get_config, init_config},
    routes,
    services::{bridge_platform::BridgePlatform, exam_api::HttpExamApi},
    session::ExamSession,
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    init_config()?;
    let config = get_config();

    let api = Arc::new(HttpExamApi::new(
        &config.exam_api_base_url,
        config.exam_api_token.clone(),
        Duration::from_secs(config.http_timeout_secs),
    )?);
    let bridge = Arc::new(BridgePlatform::new());

    let (session, session_task) = ExamSession::load(
        api,
        bridge.clone(),
        config.session_config(),
        config.assignment_id,
        config.candidate_id,
    )
    .await?;

    let app = routes::build_router(AppState::new(session.clone(), bridge));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Session daemon listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = ?e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    info!("Shutting down session");
    session.shutdown().await;
    if let Err(e) = session_task.await {
        tracing::error!(error = ?e, "session task ended abnormally");
    }
    Ok(())
}
