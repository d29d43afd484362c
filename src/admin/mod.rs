//! Operator admin API.
//!
//! # Routes
//! ```text
//! GET  /admin/status       version + lifecycle state
//! GET  /admin/metrics      MetricsSnapshot
//! GET  /admin/leaderboard  top tip recipients (when aggregation is on)
//! POST /admin/start        Relay::start
//! POST /admin/stop         Relay::stop
//! POST /admin/retry        one full drain pass
//! POST /admin/clear        empty the queue
//! ```
//!
//! Every route sits behind the bearer key middleware in auth.rs.

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::ShutdownSignal;
use crate::relay::Relay;

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub relay: Arc<Relay>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(relay: Arc<Relay>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            relay,
            api_key: api_key.into(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/metrics", get(get_metrics))
        .route("/admin/leaderboard", get(get_leaderboard))
        .route("/admin/start", post(start_relay))
        .route("/admin/stop", post(stop_relay))
        .route("/admin/retry", post(retry_queue))
        .route("/admin/clear", post(clear_queue))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: ShutdownSignal,
) -> std::io::Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(address = ?addr, "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move { shutdown.recv().await })
        .await
}
