mod handler;
mod message;

pub use handler::ws_handler;
pub use message::{Ack, ClientEvent, ClientFrame, FrameError, JoinRequest, ServerMessage};
