use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::handlers;
use crate::llm::Dispatcher;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

pub fn build_app(state: AppState, request_timeout_secs: u64) -> Router {
    let api_v1 = Router::new()
        .route("/completions", post(handlers::v1::complete))
        .route("/providers", get(handlers::v1::list_providers))
        .with_state(state);

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .nest("/api/v1", api_v1)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    request_timeout_secs: u64,
) -> std::io::Result<()> {
    let app = build_app(state, request_timeout_secs);
    let listener = TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "omnichat listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}
