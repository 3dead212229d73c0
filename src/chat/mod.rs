//! Room chat core: identity registry, envelope formatting, content filtering,
//! and the dispatcher that ties them together.

mod dispatcher;
mod error;
mod filter;
mod formatter;
mod registry;
mod session;

pub use dispatcher::{ChatDispatcher, DispatcherStatsSnapshot};
pub use error::ChatError;
pub use filter::{ContentFilter, WordListFilter};
pub use formatter::{
    Clock, Coordinates, LocationEnvelope, MessageFormatter, RoomData, SystemClock, TextEnvelope,
};
pub use registry::IdentityRegistry;
pub use session::{ConnectionId, Session};
