use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::connection_manager::ConnectionManager;
use crate::metrics::{ChatMetrics, DeliveryMetrics};
use crate::websocket::ServerMessage;

use super::error::ChatError;
use super::filter::ContentFilter;
use super::formatter::{Coordinates, MessageFormatter, RoomData};
use super::registry::IdentityRegistry;
use super::session::{ConnectionId, Session};

const WELCOME_TEXT: &str = "Welcome!";

/// Who receives an outbound event
#[derive(Debug, Clone, Copy)]
enum Audience<'a> {
    /// One connection only
    Session(ConnectionId),
    /// Every member of the room
    Room(&'a str),
    /// Every member of the room except one connection
    RoomExcept { room: &'a str, except: ConnectionId },
}

impl Audience<'_> {
    /// Must be called while holding the registry lock
    fn resolve(self, registry: &IdentityRegistry) -> Vec<ConnectionId> {
        match self {
            Audience::Session(id) => vec![id],
            Audience::Room(room) => registry.connections_in_room(room),
            Audience::RoomExcept { room, except } => registry
                .connections_in_room(room)
                .into_iter()
                .filter(|id| *id != except)
                .collect(),
        }
    }
}

/// Statistics for the chat dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    pub joins: AtomicU64,
    pub leaves: AtomicU64,
    pub messages: AtomicU64,
    pub locations: AtomicU64,
    pub rejected: AtomicU64,
    /// Frames enqueued to a connection
    pub delivered: AtomicU64,
    /// Frames dropped because the connection was gone or its queue was full
    pub dropped: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            joins: self.joins.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            locations: self.locations.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub joins: u64,
    pub leaves: u64,
    pub messages: u64,
    pub locations: u64,
    pub rejected: u64,
    pub delivered: u64,
    pub dropped: u64,
}

/// Turns connection events into registry changes and room broadcasts.
///
/// The registry is the only shared mutable state and sits behind one lock.
/// Each event resolves its audiences and enqueues its frames inside a single
/// critical section, so every member sees room events in registry order.
/// Frames are enqueued with `try_send`, so nothing here waits on a slow client.
pub struct ChatDispatcher {
    registry: Mutex<IdentityRegistry>,
    connection_manager: Arc<ConnectionManager>,
    formatter: MessageFormatter,
    filter: Arc<dyn ContentFilter>,
    admin_name: String,
    stats: DispatcherStats,
}

impl ChatDispatcher {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        formatter: MessageFormatter,
        filter: Arc<dyn ContentFilter>,
        admin_name: impl Into<String>,
    ) -> Self {
        Self {
            registry: Mutex::new(IdentityRegistry::new()),
            connection_manager,
            formatter,
            filter,
            admin_name: admin_name.into(),
            stats: DispatcherStats::default(),
        }
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Join a room.
    ///
    /// On success, in order: welcome to the joiner, "joined" notice to the rest
    /// of the room, room state to the whole room including the joiner.
    #[tracing::instrument(name = "dispatcher.join", skip(self))]
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        username: &str,
        room: &str,
    ) -> Result<Session, ChatError> {
        let mut registry = self.registry.lock().await;
        let session = registry
            .add(connection_id, username, room)
            .map_err(|e| self.reject(e))?;

        let notice_to = Audience::RoomExcept {
            room: &session.room,
            except: connection_id,
        }
        .resolve(&registry);
        let room_to = Audience::Room(&session.room).resolve(&registry);

        self.deliver(
            &Audience::Session(connection_id).resolve(&registry),
            ServerMessage::Message(self.formatter.format_text(&self.admin_name, WELCOME_TEXT)),
        );
        self.deliver(
            &notice_to,
            ServerMessage::Message(self.formatter.format_text(
                &self.admin_name,
                &format!("{} has joined the room!", session.username),
            )),
        );
        self.deliver(
            &room_to,
            ServerMessage::RoomData(RoomData {
                room: session.room.clone(),
                users: registry.users_in_room(&session.room),
            }),
        );
        drop(registry);

        self.stats.joins.fetch_add(1, Ordering::Relaxed);
        ChatMetrics::record_join();

        tracing::info!(
            connection_id = %connection_id,
            username = %session.username,
            room = %session.room,
            members = room_to.len(),
            "User joined room"
        );

        Ok(session)
    }

    /// Broadcast a text message to the sender's room, sender included.
    /// Profane text is rejected and nothing is sent.
    #[tracing::instrument(name = "dispatcher.send_text", skip(self, body))]
    pub async fn send_text(&self, connection_id: ConnectionId, body: &str) -> Result<(), ChatError> {
        let registry = self.registry.lock().await;
        let session = self.lookup(&registry, connection_id)?;

        if self.filter.is_profane(body) {
            tracing::debug!(
                connection_id = %connection_id,
                room = %session.room,
                "Rejected profane message"
            );
            return Err(self.reject(ChatError::Profanity));
        }

        let envelope = self.formatter.format_text(&session.username, body);
        self.deliver(
            &Audience::Room(&session.room).resolve(&registry),
            ServerMessage::Message(envelope),
        );
        drop(registry);

        self.stats.messages.fetch_add(1, Ordering::Relaxed);
        ChatMetrics::record_message();

        Ok(())
    }

    /// Broadcast a map link to the sender's room, sender included
    #[tracing::instrument(name = "dispatcher.send_location", skip(self))]
    pub async fn send_location(
        &self,
        connection_id: ConnectionId,
        coords: Coordinates,
    ) -> Result<(), ChatError> {
        let registry = self.registry.lock().await;
        let session = self.lookup(&registry, connection_id)?;

        let envelope = self.formatter.format_location(&session.username, coords);
        self.deliver(
            &Audience::Room(&session.room).resolve(&registry),
            ServerMessage::LocationMessage(envelope),
        );
        drop(registry);

        self.stats.locations.fetch_add(1, Ordering::Relaxed);
        ChatMetrics::record_location();

        Ok(())
    }

    /// Tear down a connection's identity.
    ///
    /// If the connection had joined, the remaining members get a "left" notice
    /// and fresh room state. Calling this for a connection that never joined,
    /// or a second time, does nothing.
    #[tracing::instrument(name = "dispatcher.disconnect", skip(self))]
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut registry = self.registry.lock().await;
        let session = registry.remove(connection_id)?;
        let remaining = Audience::Room(&session.room).resolve(&registry);

        self.deliver(
            &remaining,
            ServerMessage::Message(self.formatter.format_text(
                &self.admin_name,
                &format!("{} has left the room!", session.username),
            )),
        );
        self.deliver(
            &remaining,
            ServerMessage::RoomData(RoomData {
                room: session.room.clone(),
                users: registry.users_in_room(&session.room),
            }),
        );
        drop(registry);

        self.stats.leaves.fetch_add(1, Ordering::Relaxed);
        ChatMetrics::record_leave();

        tracing::info!(
            connection_id = %connection_id,
            username = %session.username,
            room = %session.room,
            remaining = remaining.len(),
            "User left room"
        );

        Some(session)
    }

    pub async fn session(&self, connection_id: ConnectionId) -> Option<Session> {
        self.registry.lock().await.get(connection_id).cloned()
    }

    pub async fn users_in_room(&self, room: &str) -> Vec<String> {
        self.registry.lock().await.users_in_room(room)
    }

    /// Non-empty rooms with member counts
    pub async fn rooms(&self) -> BTreeMap<String, usize> {
        self.registry.lock().await.rooms()
    }

    pub async fn session_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Session for an event's sender; the caller holds the registry lock
    fn lookup<'a>(
        &self,
        registry: &'a IdentityRegistry,
        connection_id: ConnectionId,
    ) -> Result<&'a Session, ChatError> {
        registry.get(connection_id).ok_or_else(|| {
            tracing::debug!(connection_id = %connection_id, "Event from connection with no session");
            self.reject(ChatError::NotJoined)
        })
    }

    fn reject(&self, err: ChatError) -> ChatError {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        ChatMetrics::record_rejected(err.code());
        err
    }

    /// Enqueue a frame to each recipient. Best effort, never waits, so it is
    /// safe to call with the registry lock held.
    fn deliver(&self, recipients: &[ConnectionId], message: ServerMessage) -> (usize, usize) {
        let mut delivered = 0;
        let mut dropped = 0;

        for id in recipients {
            let sent = match self.connection_manager.get_connection(*id) {
                Some(conn) => conn.try_send(message.clone()).is_ok(),
                None => false,
            };
            if sent {
                delivered += 1;
            } else {
                dropped += 1;
                tracing::debug!(connection_id = %id, "Dropped frame for unreachable connection");
            }
        }

        self.stats.delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.stats.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        DeliveryMetrics::record_delivered(delivered as u64);
        DeliveryMetrics::record_dropped(dropped as u64);

        (delivered, dropped)
    }
}
