use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::chat::DispatcherStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: ConnectionStats,
    pub rooms: BTreeMap<String, usize>,
    pub chat: DispatcherStatsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub joined_sessions: usize,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let conn_stats = state.connection_manager.stats();
    let rooms = state.dispatcher.rooms().await;

    Json(StatsResponse {
        connections: ConnectionStats {
            total_connections: conn_stats.total_connections,
            joined_sessions: rooms.values().sum(),
        },
        rooms,
        chat: state.dispatcher.stats(),
    })
}
