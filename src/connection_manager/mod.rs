//! Live transport connections and their outbound queues.
//!
//! This tracks every open socket, joined or not. Chat identity (username and
//! room) lives in the chat registry; this module only knows how to reach a
//! connection by id.

mod registry;
mod stats;
mod types;

pub use registry::ConnectionManager;
pub use stats::ConnectionStats;
pub use types::{ConnectionError, ConnectionHandle};
