//! Envelope construction for text, location, and room-state events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp source for envelopes
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Text message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEnvelope {
    pub sender: String,
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

/// Location message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEnvelope {
    pub sender: String,
    pub url: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

/// Room state: the room name and its members in join order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomData {
    pub room: String,
    pub users: Vec<String>,
}

/// Coordinates shared by a client; not range-checked
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Builds timestamped envelopes
#[derive(Clone)]
pub struct MessageFormatter {
    clock: Arc<dyn Clock>,
    maps_base_url: String,
}

impl MessageFormatter {
    pub fn new(maps_base_url: impl Into<String>) -> Self {
        Self::with_clock(maps_base_url, Arc::new(SystemClock))
    }

    pub fn with_clock(maps_base_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            maps_base_url: maps_base_url.into(),
        }
    }

    pub fn format_text(&self, sender: &str, body: &str) -> TextEnvelope {
        TextEnvelope {
            sender: sender.to_string(),
            text: body.to_string(),
            created_at: self.clock.now().timestamp_millis(),
        }
    }

    pub fn format_location(&self, sender: &str, coords: Coordinates) -> LocationEnvelope {
        LocationEnvelope {
            sender: sender.to_string(),
            url: self.map_url(coords),
            created_at: self.clock.now().timestamp_millis(),
        }
    }

    fn map_url(&self, coords: Coordinates) -> String {
        format!(
            "{}?q={},{}",
            self.maps_base_url.trim_end_matches('/'),
            coords.latitude,
            coords.longitude
        )
    }
}
