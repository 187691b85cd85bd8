use std::net::SocketAddr;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::{
    services::{bridge, bridge_root, health, list_uploads, transform_image, upload_files},
    state::AppState,
};
use crate::config::Config;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes, sharing one state
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes.as_usize();

    Router::new()
        .route("/bridge/{service}", get(bridge_root))
        .route("/bridge/{service}/", get(bridge_root))
        .route("/bridge/{service}/{*path}", get(bridge))
        // Route name used by existing front-end builds
        .route("/apibridge/{service}", get(bridge_root))
        .route("/apibridge/{service}/", get(bridge_root))
        .route("/apibridge/{service}/{*path}", get(bridge))
        .route("/upload", get(list_uploads).post(upload_files))
        .route("/upload/", get(list_uploads).post(upload_files))
        .route("/img", get(transform_image))
        .route("/img/", get(transform_image))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the stores, bind and serve until SIGINT/SIGTERM
///
/// `address` overrides `server.bind_addr` when given.
pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);

    let state = AppState::from_config(config).await?;
    let cache = state.cache.clone();
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "stockbridge listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = cache.flush() {
        warn!(error = %err, "Failed to flush response cache");
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
