//! Datamart Server - JSON API for the storefront and the admin console
//!
//! Handlers share one [`AppState`] behind an `Arc`. Storage, payment and
//! mail are trait objects so the same router runs over PostgreSQL or the
//! in-memory store.

pub mod error;
pub mod routes;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::Router;
use datamart_client::{Mailer, PageFetcher, PaymentGateway};
use datamart_core::{AdminAuth, StorefrontConfig};
use datamart_db::{BlogStore, DatasetStore};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{RequestError, RequestResult};
pub use session::AdminSession;

pub const LOG_TARGET: &str = "datamart::server";

pub struct AppState {
    pub datasets: Arc<dyn DatasetStore>,
    pub posts: Arc<dyn BlogStore>,
    pub fetcher: PageFetcher,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub auth: AdminAuth,
    pub storefront: StorefrontConfig,
}

pub type SharedState = Arc<AppState>;

/// The full API with tracing and CORS applied.
pub fn router(state: SharedState) -> Router {
    routes::route_handler(state.clone())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .max_age(Duration::from_secs(86400))
}

/// Serves until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, state: SharedState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(target: LOG_TARGET, %addr, "Starting server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(target: LOG_TARGET, %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(target: LOG_TARGET, %err, "Failed to install signal handler");
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
    info!(target: LOG_TARGET, "Shutting down");
}
