use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::leaderboard::Standing;
use crate::observability::MetricsSnapshot;
use crate::relay::{DrainReport, RelayError, RelayState};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub state: RelayState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResult {
    pub removed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub address: String,
    #[serde(flatten)]
    pub standing: Standing,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// A failed `start`, rendered as JSON.
pub struct StartFailed(RelayError);

impl IntoResponse for StartFailed {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RelayError::InvalidState(_) => StatusCode::CONFLICT,
            RelayError::Connection(_) | RelayError::Subscribe { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RelayError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        state: state.relay.state(),
    })
}

pub async fn get_metrics(State(state): State<AdminState>) -> Json<MetricsSnapshot> {
    Json(state.relay.get_metrics())
}

pub async fn get_leaderboard(
    State(state): State<AdminState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, StatusCode> {
    let tally = state.relay.leaderboard().ok_or(StatusCode::NOT_FOUND)?;
    let entries = tally
        .top(query.limit)
        .into_iter()
        .map(|(address, standing)| LeaderboardEntry {
            address: address.to_string(),
            standing,
        })
        .collect();
    Ok(Json(entries))
}

pub async fn start_relay(State(state): State<AdminState>) -> Result<Json<SystemStatus>, StartFailed> {
    state.relay.start().await.map_err(StartFailed)?;
    Ok(get_status(State(state)).await)
}

pub async fn stop_relay(State(state): State<AdminState>) -> Json<SystemStatus> {
    state.relay.stop().await;
    get_status(State(state)).await
}

pub async fn retry_queue(State(state): State<AdminState>) -> Json<DrainReport> {
    Json(state.relay.retry_queue().await)
}

pub async fn clear_queue(State(state): State<AdminState>) -> Json<ClearResult> {
    Json(ClearResult {
        removed: state.relay.clear_queue(),
    })
}
