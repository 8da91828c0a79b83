//! Application entry point and server initialization
//!
//! Loads configuration, opens the configured storage backend, and serves the
//! bookmark API with graceful shutdown support.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use athena::config::Config;
use athena::database::open_repository;
use athena::fetcher::HttpContentFetcher;
use athena::route::{create_app, AppState};
use athena::service::BookmarkService;

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("Invalid configuration");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("athena=debug,tower_http=debug")),
        )
        .init();

    let repo = open_repository(&config).expect("Failed to open storage backend");
    let fetcher =
        HttpContentFetcher::new(config.fetch_timeout).expect("Failed to build content fetcher");

    let service = BookmarkService::new(repo, Arc::new(fetcher));
    let state = AppState::new(service, config.auth_token.clone());

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");

    info!(port = config.port, backend = %config.backend, "server running at http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM so in-flight requests
/// finish and storage handles close cleanly.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
