//! On-air session management

mod broadcast;
mod timer;

pub use broadcast::{
    ActiveBroadcastSession, BroadcastId, BroadcastState, FinishedBroadcast, TickOutcome,
};
pub use timer::{SessionTimer, TICK_PERIOD};
