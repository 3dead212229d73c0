//! Cross-component integration tests
//!
//! These drive the chat dispatcher and connection manager together through
//! in-memory outbound queues, without opening sockets.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use room_chat_relay::chat::{
    ChatDispatcher, ChatError, ContentFilter, Coordinates, MessageFormatter, RoomData,
    WordListFilter,
};
use room_chat_relay::connection_manager::{ConnectionHandle, ConnectionManager};
use room_chat_relay::websocket::ServerMessage;

struct TestClient {
    handle: Arc<ConnectionHandle>,
    rx: mpsc::Receiver<ServerMessage>,
}

impl TestClient {
    fn id(&self) -> uuid::Uuid {
        self.handle.id
    }

    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

struct TestEnvironment {
    connection_manager: Arc<ConnectionManager>,
    dispatcher: Arc<ChatDispatcher>,
}

impl TestEnvironment {
    fn new() -> Self {
        Self::with_filter(Arc::new(WordListFilter::default()))
    }

    fn with_filter(filter: Arc<dyn ContentFilter>) -> Self {
        let connection_manager = Arc::new(ConnectionManager::new());
        let dispatcher = Arc::new(ChatDispatcher::new(
            connection_manager.clone(),
            MessageFormatter::new("https://google.com/maps"),
            filter,
            "Admin",
        ));
        Self {
            connection_manager,
            dispatcher,
        }
    }

    fn connect(&self) -> TestClient {
        self.connect_with_capacity(64)
    }

    fn connect_with_capacity(&self, capacity: usize) -> TestClient {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = self.connection_manager.register(tx).unwrap();
        TestClient { handle, rx }
    }
}

fn text(sender: &str, body: &str, msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::Message(e) if e.sender == sender && e.text == body)
}

fn room_data(room: &str, users: &[&str]) -> ServerMessage {
    ServerMessage::RoomData(RoomData {
        room: room.to_string(),
        users: users.iter().map(|u| u.to_string()).collect(),
    })
}

// =============================================================================
// End-to-end room scenario
// =============================================================================

#[tokio::test]
async fn test_room_lifecycle_scenario() {
    let env = TestEnvironment::new();
    let mut a = env.connect();
    let mut b = env.connect();

    // A joins r1 as alice
    assert_ok!(env.dispatcher.join(a.id(), "alice", "r1").await);
    let got = a.drain();
    assert_eq!(got.len(), 2);
    assert!(text("Admin", "Welcome!", &got[0]));
    assert_eq!(got[1], room_data("r1", &["alice"]));

    // B joins r1 as bob
    assert_ok!(env.dispatcher.join(b.id(), "bob", "r1").await);
    let got = a.drain();
    assert_eq!(got.len(), 2);
    assert!(text("Admin", "bob has joined the room!", &got[0]));
    assert_eq!(got[1], room_data("r1", &["alice", "bob"]));

    let got = b.drain();
    assert_eq!(got.len(), 2);
    assert!(text("Admin", "Welcome!", &got[0]));
    assert_eq!(got[1], room_data("r1", &["alice", "bob"]));

    // B says hello, both receive it
    assert_ok!(env.dispatcher.send_text(b.id(), "hello").await);
    for client in [&mut a, &mut b] {
        let got = client.drain();
        assert_eq!(got.len(), 1);
        assert!(text("bob", "hello", &got[0]));
    }

    // B disconnects
    assert!(env.dispatcher.disconnect(b.id()).await.is_some());
    let got = a.drain();
    assert_eq!(got.len(), 2);
    assert!(text("Admin", "bob has left the room!", &got[0]));
    assert_eq!(got[1], room_data("r1", &["alice"]));
    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn test_duplicate_name_different_case_rejected() {
    let env = TestEnvironment::new();
    let a = env.connect();
    let b = env.connect();
    let mut c = env.connect();

    env.dispatcher.join(a.id(), "alice", "r1").await.unwrap();
    env.dispatcher.join(b.id(), "bob", "r1").await.unwrap();

    let err = assert_err!(env.dispatcher.join(c.id(), " Alice ", "R1").await);
    assert_eq!(err, ChatError::DuplicateName);
    assert_eq!(err.to_string(), "Username is in use!");
    assert_eq!(env.dispatcher.users_in_room("r1").await, vec!["alice", "bob"]);
    assert!(c.drain().is_empty());
}

// =============================================================================
// Room isolation
// =============================================================================

#[tokio::test]
async fn test_join_does_not_touch_other_rooms() {
    let env = TestEnvironment::new();
    let mut lobby = env.connect();
    let newcomer = env.connect();

    env.dispatcher.join(lobby.id(), "carol", "lobby").await.unwrap();
    lobby.drain();

    env.dispatcher.join(newcomer.id(), "dave", "r1").await.unwrap();

    assert!(lobby.drain().is_empty());
    assert_eq!(env.dispatcher.users_in_room("lobby").await, vec!["carol"]);
    assert_eq!(env.dispatcher.users_in_room("r1").await, vec!["dave"]);
}

#[tokio::test]
async fn test_messages_stay_in_room() {
    let env = TestEnvironment::new();
    let mut a = env.connect();
    let mut b = env.connect();

    env.dispatcher.join(a.id(), "alice", "r1").await.unwrap();
    env.dispatcher.join(b.id(), "bob", "r2").await.unwrap();
    a.drain();
    b.drain();

    env.dispatcher.send_text(a.id(), "just us").await.unwrap();
    env.dispatcher
        .send_location(
            a.id(),
            Coordinates {
                latitude: 48.8566,
                longitude: 2.3522,
            },
        )
        .await
        .unwrap();

    let got = a.drain();
    assert_eq!(got.len(), 2);
    assert!(text("alice", "just us", &got[0]));
    assert!(matches!(
        &got[1],
        ServerMessage::LocationMessage(e) if e.url == "https://google.com/maps?q=48.8566,2.3522"
    ));
    assert!(b.drain().is_empty());
}

// =============================================================================
// Error paths
// =============================================================================

#[tokio::test]
async fn test_profanity_rejected_to_sender_only() {
    let env = TestEnvironment::new();
    let mut a = env.connect();
    let mut b = env.connect();
    env.dispatcher.join(a.id(), "alice", "r1").await.unwrap();
    env.dispatcher.join(b.id(), "bob", "r1").await.unwrap();
    a.drain();
    b.drain();

    let err = assert_err!(env.dispatcher.send_text(a.id(), "Damn it").await);
    assert_eq!(err, ChatError::Profanity);
    assert!(a.drain().is_empty());
    assert!(b.drain().is_empty());
}

struct RejectAll;

impl ContentFilter for RejectAll {
    fn is_profane(&self, _text: &str) -> bool {
        true
    }
}

#[tokio::test]
async fn test_location_is_not_filtered() {
    let env = TestEnvironment::with_filter(Arc::new(RejectAll));
    let mut a = env.connect();
    env.dispatcher.join(a.id(), "alice", "r1").await.unwrap();
    a.drain();

    assert_err!(env.dispatcher.send_text(a.id(), "anything").await);
    assert_ok!(
        env.dispatcher
            .send_location(
                a.id(),
                Coordinates {
                    latitude: 1.0,
                    longitude: 2.0,
                },
            )
            .await
    );
    assert_eq!(a.drain().len(), 1);
}

#[tokio::test]
async fn test_blank_join_rejected() {
    let env = TestEnvironment::new();
    let mut a = env.connect();

    let err = assert_err!(env.dispatcher.join(a.id(), "  ", "r1").await);
    assert_eq!(err, ChatError::Validation);
    let err = assert_err!(env.dispatcher.join(a.id(), "alice", "").await);
    assert_eq!(err, ChatError::Validation);

    assert!(a.drain().is_empty());
    assert!(env.dispatcher.rooms().await.is_empty());
}

#[tokio::test]
async fn test_second_join_on_same_connection_rejected() {
    let env = TestEnvironment::new();
    let mut a = env.connect();
    env.dispatcher.join(a.id(), "alice", "r1").await.unwrap();
    a.drain();

    let err = assert_err!(env.dispatcher.join(a.id(), "alice", "r2").await);
    assert_eq!(err, ChatError::AlreadyJoined);
    assert!(a.drain().is_empty());
    assert_eq!(env.dispatcher.session_count().await, 1);
}

#[tokio::test]
async fn test_events_after_disconnect_are_dropped() {
    let env = TestEnvironment::new();
    let mut a = env.connect();
    let mut b = env.connect();
    env.dispatcher.join(a.id(), "alice", "r1").await.unwrap();
    env.dispatcher.join(b.id(), "bob", "r1").await.unwrap();
    env.dispatcher.disconnect(b.id()).await;
    a.drain();
    b.drain();

    let err = assert_err!(env.dispatcher.send_text(b.id(), "still here?").await);
    assert_eq!(err, ChatError::NotJoined);
    assert!(a.drain().is_empty());
    assert!(env.dispatcher.disconnect(b.id()).await.is_none());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_and_disconnects_keep_registry_consistent() {
    let env = TestEnvironment::new();
    let clients: Vec<TestClient> = (0..50).map(|_| env.connect()).collect();
    let ids: Vec<uuid::Uuid> = clients.iter().map(|c| c.id()).collect();

    let mut tasks = Vec::new();
    for (i, id) in ids.iter().copied().enumerate() {
        let dispatcher = env.dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            let room = if i % 2 == 0 { "even" } else { "odd" };
            dispatcher.join(id, &format!("user{}", i), room).await.unwrap();
            if i % 5 == 0 {
                dispatcher.disconnect(id).await;
                // Second disconnect must be a no-op
                assert!(dispatcher.disconnect(id).await.is_none());
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let rooms = env.dispatcher.rooms().await;
    let remaining: usize = (0..50).filter(|i| i % 5 != 0).count();
    assert_eq!(rooms.values().sum::<usize>(), remaining);
    assert_eq!(env.dispatcher.session_count().await, remaining);

    let even = env.dispatcher.users_in_room("even").await;
    assert!(even.iter().all(|u| {
        let n: usize = u.trim_start_matches("user").parse().unwrap();
        n % 2 == 0 && n % 5 != 0
    }));

    let stats = env.dispatcher.stats();
    assert_eq!(stats.joins, 50);
    assert_eq!(stats.leaves, 10);
}

#[tokio::test]
async fn test_final_room_data_matches_registry() {
    let env = TestEnvironment::new();
    let mut clients: Vec<TestClient> = (0..5).map(|_| env.connect()).collect();
    for (i, c) in clients.iter().enumerate() {
        env.dispatcher
            .join(c.id(), &format!("user{}", i), "r1")
            .await
            .unwrap();
    }

    // Last roomData each member saw is the full member list
    let expected = room_data("r1", &["user0", "user1", "user2", "user3", "user4"]);
    for client in clients.iter_mut() {
        let last_room_data = client
            .drain()
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::RoomData(_)))
            .last();
        assert_eq!(last_room_data, Some(expected.clone()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_room_data_follows_registry_under_churn() {
    let env = TestEnvironment::new();
    let mut observer = env.connect_with_capacity(4096);
    env.dispatcher
        .join(observer.id(), "observer", "r1")
        .await
        .unwrap();

    for round in 0..100 {
        observer.drain();

        let clients: Vec<TestClient> = (0..16).map(|_| env.connect()).collect();
        let mut tasks = Vec::new();
        for (i, client) in clients.iter().enumerate() {
            let dispatcher = env.dispatcher.clone();
            let id = client.id();
            tasks.push(tokio::spawn(async move {
                dispatcher
                    .join(id, &format!("r{}u{}", round, i), "r1")
                    .await
                    .unwrap();
                if i % 2 == 0 {
                    dispatcher.disconnect(id).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let last_users = observer
            .drain()
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::RoomData(data) => Some(data.users),
                _ => None,
            })
            .last();
        assert_eq!(
            last_users,
            Some(env.dispatcher.users_in_room("r1").await),
            "observer fell behind the registry in round {}",
            round
        );
    }
}
