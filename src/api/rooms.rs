//! Read-only room endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::chat::RoomData;
use crate::error::{AppError, Result};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct RoomSummary {
    pub name: String,
    pub member_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummary>,
    pub total_rooms: usize,
}

/// GET /api/v1/rooms - List non-empty rooms with member counts
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomListResponse> {
    let rooms: Vec<RoomSummary> = state
        .dispatcher
        .rooms()
        .await
        .into_iter()
        .map(|(name, member_count)| RoomSummary { name, member_count })
        .collect();
    let total = rooms.len();

    Json(RoomListResponse {
        rooms,
        total_rooms: total,
    })
}

/// GET /api/v1/rooms/{room} - Members of one room, same shape as `roomData`
pub async fn get_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<RoomData>> {
    let users = state.dispatcher.users_in_room(&room).await;
    if users.is_empty() {
        return Err(AppError::NotFound(format!("Room '{}' has no members", room)));
    }

    Ok(Json(RoomData {
        room: room.trim().to_lowercase(),
        users,
    }))
}
