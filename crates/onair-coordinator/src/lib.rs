//! onair-coordinator: Live-broadcast rotation coordinator
//!
//! The coordinator shares a single on-air slot among contenders waiting in
//! a queue. Viewers move a shared vote meter that extends or cuts short the
//! current broadcast, and the coordinator relays WebRTC negotiation
//! messages between the broadcaster and its viewers. Clients connect over
//! a WebSocket and exchange the JSON events defined in `onair-protocol`.

pub mod connection;
pub mod coordinator;
pub mod gateway;
pub mod queue;
pub mod relay;
pub mod server;
pub mod session;
pub mod state;
pub mod vote;

pub use coordinator::{Command, Coordinator, CoordinatorClosed, CoordinatorHandle};
pub use gateway::Gateways;
pub use state::{CoordinatorState, StateSnapshot};
