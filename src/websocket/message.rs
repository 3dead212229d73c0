use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::{ChatError, Coordinates, LocationEnvelope, RoomData, TextEnvelope};

/// Raw frame sent from client to server.
///
/// `{"event": "join", "id": 1, "data": {"username": "alice", "room": "r1"}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    /// Acknowledgment id echoed back in the `ack` frame
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Join request payload; missing fields decode as empty and fail validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub room: String,
}

/// Decoded client event
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Join(JoinRequest),
    SendMessage(String),
    SendLocation(Coordinates),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::SendMessage(_) => "sendMessage",
            Self::SendLocation(_) => "sendLocation",
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid payload for {event}: {source}")]
    InvalidPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl FrameError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "INVALID_MESSAGE",
            Self::UnknownEvent(_) => "UNKNOWN_EVENT",
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
        }
    }
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(FrameError::Malformed)
    }

    /// Decode the payload according to the event name
    pub fn into_event(self) -> Result<ClientEvent, FrameError> {
        fn payload<T: serde::de::DeserializeOwned>(
            event: &'static str,
            data: serde_json::Value,
        ) -> Result<T, FrameError> {
            serde_json::from_value(data).map_err(|source| FrameError::InvalidPayload { event, source })
        }

        match self.event.as_str() {
            "join" => payload("join", self.data).map(ClientEvent::Join),
            "sendMessage" => payload("sendMessage", self.data).map(ClientEvent::SendMessage),
            "sendLocation" => payload("sendLocation", self.data).map(ClientEvent::SendLocation),
            _ => Err(FrameError::UnknownEvent(self.event)),
        }
    }
}

/// Acknowledgment for one client event; `error` is null on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub id: Option<u64>,
    pub error: Option<String>,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "message")]
    Message(TextEnvelope),
    #[serde(rename = "locationMessage")]
    LocationMessage(LocationEnvelope),
    #[serde(rename = "roomData")]
    RoomData(RoomData),
    #[serde(rename = "ack")]
    Ack(Ack),
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn ack(id: Option<u64>, result: Result<(), ChatError>) -> Self {
        Self::Ack(Ack {
            id,
            error: result.err().map(|e| e.to_string()),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
