use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::observability::metrics;
use crate::security::rate_limit::TrackedClient;

#[derive(Serialize)]
pub struct GateStatus {
    pub version: &'static str,
    pub auth_mode: &'static str,
    pub window_secs: u64,
    pub max_requests: u32,
    pub tracked_clients: usize,
}

#[derive(Serialize)]
pub struct ClientsSummary {
    pub tracked: usize,
    pub clients: Vec<TrackedClient>,
}

#[derive(Serialize)]
pub struct PruneResult {
    pub removed: usize,
    pub remaining: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<GateStatus> {
    let limiter = state.gate.limiter();
    Json(GateStatus {
        version: env!("CARGO_PKG_VERSION"),
        auth_mode: state.gate.auth_mode().label(),
        window_secs: limiter.window().as_secs(),
        max_requests: limiter.max_requests(),
        tracked_clients: limiter.tracked(),
    })
}

pub async fn get_clients(State(state): State<AdminState>) -> Json<ClientsSummary> {
    let clients = state.gate.limiter().snapshot();
    Json(ClientsSummary {
        tracked: clients.len(),
        clients,
    })
}

pub async fn prune(State(state): State<AdminState>) -> Json<PruneResult> {
    let limiter = state.gate.limiter();
    let removed = limiter.prune();
    let remaining = limiter.tracked();
    metrics::set_tracked_clients(remaining);
    tracing::info!(removed, remaining, "Manual prune");
    Json(PruneResult { removed, remaining })
}
