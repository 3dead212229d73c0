use serde::Serialize;
use uuid::Uuid;

/// Connection identifier assigned by the transport at connect time
pub type ConnectionId = Uuid;

/// Identity bound to one live connection after a successful join
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: ConnectionId,
    /// Display name, trimmed, original case preserved
    pub username: String,
    /// Room name, trimmed and lowercased
    pub room: String,
}

/// Normalize a username for uniqueness comparison
pub(crate) fn username_key(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Normalize a room name; rooms are matched case-insensitively
pub(crate) fn normalize_room(room: &str) -> String {
    room.trim().to_lowercase()
}
