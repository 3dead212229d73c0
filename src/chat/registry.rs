//! Identity registry: the single source of truth for who is in which room.
//!
//! Room membership is never stored on its own. Every room query is computed
//! from the session map, so the two can not drift apart.

use std::collections::{BTreeMap, HashMap};

use super::error::ChatError;
use super::session::{normalize_room, username_key, ConnectionId, Session};

struct Entry {
    session: Session,
    /// Monotonic join sequence, gives room listings a stable order
    seq: u64,
}

/// connection_id -> Session, with derived per-room queries
#[derive(Default)]
pub struct IdentityRegistry {
    sessions: HashMap<ConnectionId, Entry>,
    next_seq: u64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a username in a room.
    ///
    /// Fails with `Validation` when either value is blank after trimming,
    /// `AlreadyJoined` when the connection already holds a session, and
    /// `DuplicateName` when the room already has that name (case-insensitive).
    /// A failed add leaves the registry untouched.
    pub fn add(
        &mut self,
        id: ConnectionId,
        username: &str,
        room: &str,
    ) -> Result<Session, ChatError> {
        let username = username.trim();
        let room = normalize_room(room);

        if username.is_empty() || room.is_empty() {
            return Err(ChatError::Validation);
        }

        if self.sessions.contains_key(&id) {
            return Err(ChatError::AlreadyJoined);
        }

        let key = username_key(username);
        let taken = self
            .sessions
            .values()
            .any(|e| e.session.room == room && username_key(&e.session.username) == key);
        if taken {
            return Err(ChatError::DuplicateName);
        }

        let session = Session {
            id,
            username: username.to_string(),
            room,
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.sessions.insert(
            id,
            Entry {
                session: session.clone(),
                seq,
            },
        );

        Ok(session)
    }

    /// Remove a connection's session; `None` if it never joined or is already gone
    pub fn remove(&mut self, id: ConnectionId) -> Option<Session> {
        self.sessions.remove(&id).map(|e| e.session)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id).map(|e| &e.session)
    }

    /// Sessions in a room, in join order
    pub fn list_by_room(&self, room: &str) -> Vec<&Session> {
        let room = normalize_room(room);
        let mut entries: Vec<&Entry> = self
            .sessions
            .values()
            .filter(|e| e.session.room == room)
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| &e.session).collect()
    }

    /// Usernames in a room, same order as `list_by_room`
    pub fn users_in_room(&self, room: &str) -> Vec<String> {
        self.list_by_room(room)
            .into_iter()
            .map(|s| s.username.clone())
            .collect()
    }

    /// Connection ids in a room, same order as `list_by_room`
    pub fn connections_in_room(&self, room: &str) -> Vec<ConnectionId> {
        self.list_by_room(room).into_iter().map(|s| s.id).collect()
    }

    /// Every non-empty room with its member count, sorted by name
    pub fn rooms(&self) -> BTreeMap<String, usize> {
        let mut rooms = BTreeMap::new();
        for entry in self.sessions.values() {
            *rooms.entry(entry.session.room.clone()).or_insert(0) += 1;
        }
        rooms
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_add_and_get() {
        let mut registry = IdentityRegistry::new();
        let id = Uuid::new_v4();

        let session = registry.add(id, "  alice ", " R1 ").unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(session.room, "r1");
        assert_eq!(registry.get(id), Some(&session));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_username_or_room_rejected() {
        let mut registry = IdentityRegistry::new();

        assert_eq!(
            registry.add(Uuid::new_v4(), "   ", "r1"),
            Err(ChatError::Validation)
        );
        assert_eq!(
            registry.add(Uuid::new_v4(), "alice", ""),
            Err(ChatError::Validation)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_name_is_case_insensitive() {
        let mut registry = IdentityRegistry::new();
        registry.add(Uuid::new_v4(), "alice", "r1").unwrap();

        let result = registry.add(Uuid::new_v4(), " ALICE ", "r1");
        assert_eq!(result, Err(ChatError::DuplicateName));
        assert_eq!(registry.users_in_room("r1"), vec!["alice"]);
    }

    #[test]
    fn test_same_name_allowed_in_other_room() {
        let mut registry = IdentityRegistry::new();
        registry.add(Uuid::new_v4(), "alice", "r1").unwrap();
        registry.add(Uuid::new_v4(), "alice", "r2").unwrap();

        assert_eq!(registry.users_in_room("r1"), vec!["alice"]);
        assert_eq!(registry.users_in_room("r2"), vec!["alice"]);
    }

    #[test]
    fn test_second_join_on_same_connection_rejected() {
        let mut registry = IdentityRegistry::new();
        let id = Uuid::new_v4();
        registry.add(id, "alice", "r1").unwrap();

        assert_eq!(
            registry.add(id, "alice2", "r2"),
            Err(ChatError::AlreadyJoined)
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.list_by_room("r2").is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = IdentityRegistry::new();
        let id = Uuid::new_v4();
        registry.add(id, "alice", "r1").unwrap();

        assert_eq!(registry.remove(id).map(|s| s.username), Some("alice".into()));
        assert!(registry.remove(id).is_none());
        assert!(registry.get(id).is_none());
        assert!(registry.list_by_room("r1").is_empty());
    }

    #[test]
    fn test_remove_unknown_connection() {
        let mut registry = IdentityRegistry::new();
        assert!(registry.remove(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_list_by_room_keeps_join_order() {
        let mut registry = IdentityRegistry::new();
        let names = ["carol", "alice", "bob", "dave"];
        for name in names {
            registry.add(Uuid::new_v4(), name, "r1").unwrap();
        }
        registry.add(Uuid::new_v4(), "eve", "r2").unwrap();

        assert_eq!(registry.users_in_room("r1"), names.to_vec());
        assert_eq!(registry.users_in_room("R1 "), names.to_vec());
    }

    #[test]
    fn test_name_freed_after_remove() {
        let mut registry = IdentityRegistry::new();
        let id = Uuid::new_v4();
        registry.add(id, "alice", "r1").unwrap();
        registry.remove(id);

        assert!(registry.add(Uuid::new_v4(), "Alice", "r1").is_ok());
    }

    #[test]
    fn test_rooms_counts() {
        let mut registry = IdentityRegistry::new();
        registry.add(Uuid::new_v4(), "alice", "r1").unwrap();
        registry.add(Uuid::new_v4(), "bob", "r1").unwrap();
        registry.add(Uuid::new_v4(), "carol", "lobby").unwrap();

        let rooms = registry.rooms();
        assert_eq!(rooms.get("r1"), Some(&2));
        assert_eq!(rooms.get("lobby"), Some(&1));
        assert_eq!(rooms.len(), 2);
    }
}
