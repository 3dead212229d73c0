//! Connection handle and related types

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use crate::chat::ConnectionId;
use crate::websocket::ServerMessage;

/// Handle for a single WebSocket connection
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub sender: mpsc::Sender<ServerMessage>,
    pub connected_at: DateTime<Utc>,
    /// Last activity timestamp (Unix seconds) - using AtomicI64 for lock-free updates
    last_activity: AtomicI64,
    /// Signalled when the server wants this connection gone
    shutdown: Notify,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sender,
            connected_at: now,
            last_activity: AtomicI64::new(now.timestamp()),
            shutdown: Notify::new(),
        }
    }

    pub fn update_activity(&self) {
        self.last_activity
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.last_activity.load(Ordering::Relaxed), 0)
            .unwrap_or_else(Utc::now)
    }

    /// Enqueue a message, waiting for queue space. Fails only once the
    /// connection's writer is gone.
    pub async fn send(
        &self,
        message: ServerMessage,
    ) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.sender.send(message).await
    }

    /// Enqueue a message without waiting; a full or closed queue drops it
    pub fn try_send(
        &self,
        message: ServerMessage,
    ) -> Result<(), mpsc::error::TrySendError<ServerMessage>> {
        self.sender.try_send(message)
    }

    /// Ask the connection's socket loop to shut down
    pub fn close(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }

    #[cfg(test)]
    pub(crate) fn backdate_activity(&self, seconds: i64) {
        self.last_activity
            .fetch_sub(seconds, Ordering::Relaxed);
    }
}

/// Error returned when connection limits are exceeded
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    #[error("Total connection limit exceeded ({current}/{max})")]
    TotalLimitExceeded { current: usize, max: usize },
}
