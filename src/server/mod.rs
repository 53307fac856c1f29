//! HTTP server
//!
//! Builds the Axum application from a resolved [`Config`] and runs it until
//! Ctrl-C or SIGTERM.

pub mod auth;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::core::Publisher;
use crate::library::{FsContentTree, SqliteCatalog};

pub use auth::Credential;
pub use response::{ApiError, ApiResult};
pub use state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState, config: &Config) -> Router {
    let router = routes::create_router(
        state.clone(),
        &config.content_root(),
        &config.front,
        &config.base_path(),
    );
    let router = middleware::apply_middleware(router);
    router.with_state(state)
}

/// Open the stores under the storage root and create AppState
pub async fn create_app_state(config: &Config) -> Result<AppState> {
    let content_root = config.content_root();
    tokio::fs::create_dir_all(&content_root)
        .await
        .with_context(|| format!("Failed to create {}", content_root.display()))?;

    let catalog = SqliteCatalog::open(&config.root)
        .with_context(|| format!("Failed to open catalog in {}", config.root.display()))?;
    let content = FsContentTree::under(&config.root);
    let publisher = Publisher::new(Arc::new(catalog), Arc::new(content), config.host.clone());

    let credential = config.credential.as_deref().map(Credential::parse);
    if credential.is_none() {
        info!("No credential configured, API is open");
    }

    Ok(AppState::new(publisher, credential))
}

/// Run the complete server with configuration
pub async fn run(config: Config) -> Result<()> {
    let state = create_app_state(&config).await?;
    let app = create_app(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, host = %config.host, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
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
