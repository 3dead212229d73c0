//! Prometheus metrics endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::error::AppError;
use crate::metrics;
use crate::server::AppState;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    update_metrics_from_state(&state).await;

    match metrics::encode_metrics() {
        Ok(output) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )),
        Err(e) => Err(AppError::Internal(format!("Failed to encode metrics: {}", e))),
    }
}

/// Refresh gauges that are derived from live state
async fn update_metrics_from_state(state: &AppState) {
    let rooms = state.dispatcher.rooms().await;

    metrics::CONNECTIONS_TOTAL.set(state.connection_manager.connection_count() as i64);
    metrics::SESSIONS_JOINED.set(rooms.values().sum::<usize>() as i64);
    metrics::ROOMS_ACTIVE.set(rooms.len() as i64);
}
