//! # mapnu-server - HTTP surface for mapnu authentication
//!
//! - `POST /auth/google` - exchange a Google ID token for a session token
//! - `GET /user/profile` - names of the session token's user (bearer protected)
//! - `GET /health` - liveness
//!
//! The binary in `main.rs` wires [`ServerConfig`], [`telemetry`] and [`serve`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod telemetry;

use axum::{
    Router,
    routing::{get, post},
};
use mapnu_auth::AuthService;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::{ServerConfig, ServerConfigError};
pub use error::ApiError;

/// Shared handler state
pub type AppState = Arc<AuthService>;

/// Largest request body accepted (ID tokens are a few KiB)
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/user/profile", get(handlers::user_profile))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/auth/google", post(handlers::google_login))
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// Serve `app` until `shutdown` resolves, then give in-flight requests up to
/// `drain` to finish.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    drain: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        // Server stopped on its own
        res = &mut server => return res.map_err(std::io::Error::other)?,
        () = shutdown => {}
    }

    info!(drain_secs = drain.as_secs(), "Shutdown requested, draining connections");
    let _ = stop_tx.send(());

    match tokio::time::timeout(drain, &mut server).await {
        Ok(res) => res.map_err(std::io::Error::other)?,
        Err(_) => {
            warn!("Drain limit reached, aborting remaining connections");
            server.abort();
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Ctrl+C received, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("SIGTERM received, initiating shutdown");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
