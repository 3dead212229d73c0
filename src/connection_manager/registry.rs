use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::chat::ConnectionId;
use crate::websocket::ServerMessage;

use super::stats::ConnectionStats;
use super::types::{ConnectionError, ConnectionHandle};

const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// Manages all open WebSocket connections
pub struct ConnectionManager {
    /// connection_id -> ConnectionHandle
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    max_connections: usize,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn with_limit(max_connections: usize) -> Self {
        Self {
            connections: DashMap::new(),
            max_connections,
        }
    }

    /// Register a new connection
    pub fn register(
        &self,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<Arc<ConnectionHandle>, ConnectionError> {
        let current = self.connections.len();
        if current >= self.max_connections {
            return Err(ConnectionError::TotalLimitExceeded {
                current,
                max: self.max_connections,
            });
        }

        let handle = Arc::new(ConnectionHandle::new(sender));
        self.connections.insert(handle.id, handle.clone());

        tracing::info!(connection_id = %handle.id, "Connection registered");

        Ok(handle)
    }

    /// Unregister a connection and signal its socket loop to close.
    /// Returns false if it was already gone.
    pub fn unregister(&self, connection_id: ConnectionId) -> bool {
        match self.connections.remove(&connection_id) {
            Some((_, handle)) => {
                handle.close();
                tracing::info!(connection_id = %connection_id, "Connection unregistered");
                true
            }
            None => false,
        }
    }

    /// Get connection by ID
    pub fn get_connection(&self, connection_id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&connection_id).map(|h| h.clone())
    }

    /// Get all connections
    pub fn get_all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get statistics
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            total_connections: self.connections.len(),
            max_connections: self.max_connections,
        }
    }

    /// Find connections that have been inactive for longer than the timeout
    pub fn find_stale_connections(&self, timeout_secs: u64) -> Vec<ConnectionId> {
        let now = Utc::now();
        let timeout = chrono::Duration::seconds(timeout_secs as i64);

        self.connections
            .iter()
            .filter(|entry| now.signed_duration_since(entry.value().last_activity()) > timeout)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Remove stale connections and return the count of removed connections
    pub fn cleanup_stale_connections(&self, timeout_secs: u64) -> usize {
        let stale = self.find_stale_connections(timeout_secs);
        let mut count = 0;

        for conn_id in stale {
            tracing::info!(connection_id = %conn_id, "Removing stale connection due to timeout");
            if self.unregister(conn_id) {
                count += 1;
            }
        }

        count
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
