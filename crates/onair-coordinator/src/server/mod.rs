//! WebSocket server implementation

mod handler;
mod listener;

pub use handler::handle_socket;
pub use listener::{router, WsServer};
