//! HTTP surface: six endpoints over the feed store.
//!
//! | Method | Path                       | Handler                  |
//! |--------|----------------------------|--------------------------|
//! | GET    | `/feeds`                   | [`handlers::list_feeds`] |
//! | POST   | `/feeds/{feed}`            | [`handlers::create_feed`]|
//! | GET    | `/feeds/{feed}`            | [`handlers::get_feed`]   |
//! | GET    | `/feeds/{feed}/items`      | [`handlers::list_items`] |
//! | POST   | `/feeds/{feed}/items`      | [`handlers::create_item`]|
//! | GET    | `/feeds/{feed}/items/{item}` | [`handlers::get_item`] |

mod error;
pub mod handlers;
mod state;

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::storage::FeedStore;

pub use error::{AppError, AppResult};
pub use state::AppState;

/// Build the router. `request_timeout` of `None` disables the timeout layer.
pub fn create_router(state: AppState, request_timeout: Option<Duration>) -> Router {
    let router = Router::new()
        .route("/feeds", get(handlers::list_feeds))
        .route(
            "/feeds/{feed}",
            get(handlers::get_feed).post(handlers::create_feed),
        )
        .route(
            "/feeds/{feed}/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route("/feeds/{feed}/items/{item}", get(handlers::get_item))
        .with_state(state);

    let router = match request_timeout {
        Some(timeout) => router.layer(TimeoutLayer::new(timeout)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

/// Open the store, bind the listener and serve until Ctrl-C or SIGTERM.
pub async fn run_server(config: &Config) -> Result<()> {
    let store = FeedStore::open(&config.base_path).await.with_context(|| {
        format!(
            "Failed to open feed directory '{}'",
            config.base_path.display()
        )
    })?;
    let app = create_router(AppState::new(store), config.request_timeout());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    tracing::info!(
        addr = %config.listen_addr,
        base_path = %config.base_path.display(),
        "Starting server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
