//! Connection tracking

mod reaper;
mod registry;

pub use reaper::run_idle_reaper;
pub use registry::{ConnectionHandle, Outbox, SessionRegistry};
