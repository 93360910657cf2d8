//! The single on-air slot
//!
//! `ActiveBroadcastSession` is either idle or holds exactly one
//! `BroadcastState`. Every way a session can end goes through
//! [`ActiveBroadcastSession::finish`], which only succeeds for the
//! connection that currently owns the slot, so a second finish for the same
//! session (a timeout racing a disconnect, say) is a no-op.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use onair_core::{CoordinatorError, Identity};
use onair_protocol::ConnectionId;

use super::SessionTimer;
use crate::coordinator::Command;

/// Identifier of one on-air session, never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BroadcastId(u64);

impl BroadcastId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broadcast-{}", self.0)
    }
}

/// The current broadcaster and its countdown
pub struct BroadcastState {
    /// Session ID
    pub id: BroadcastId,
    /// Connection holding the slot
    pub connection: ConnectionId,
    /// Identity announced to viewers
    pub identity: Identity,
    /// Seconds left on the countdown
    pub remaining: u64,
    /// When the session went live
    pub started_at: Instant,
    timer: SessionTimer,
}

impl fmt::Debug for BroadcastState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastState")
            .field("id", &self.id)
            .field("connection", &self.connection)
            .field("identity", &self.identity)
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// What remains of a session after it ended
#[derive(Debug, Clone)]
pub struct FinishedBroadcast {
    pub id: BroadcastId,
    pub connection: ConnectionId,
    pub identity: Identity,
    /// Time spent on air
    pub elapsed: Duration,
}

/// Result of a countdown tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Tick belongs to a session that already ended
    Stale,
    /// Countdown still running
    Running { identity: Identity, remaining: u64 },
    /// Countdown reached zero; the caller must finish the session
    Expired {
        connection: ConnectionId,
        identity: Identity,
    },
}

/// Idle/live state machine for the on-air slot
#[derive(Debug, Default)]
pub struct ActiveBroadcastSession {
    current: Option<BroadcastState>,
    next_id: u64,
}

impl ActiveBroadcastSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// Current broadcast, if live
    pub fn current(&self) -> Option<&BroadcastState> {
        self.current.as_ref()
    }

    /// Whether someone is on air
    pub fn is_live(&self) -> bool {
        self.current.is_some()
    }

    /// Connection holding the slot
    pub fn broadcaster(&self) -> Option<ConnectionId> {
        self.current.as_ref().map(|state| state.connection)
    }

    /// Whether `connection` holds the slot
    pub fn is_broadcaster(&self, connection: &ConnectionId) -> bool {
        self.broadcaster().as_ref() == Some(connection)
    }

    /// Transition `Idle -> Live` and start the countdown.
    ///
    /// Fails with `SlotOccupied` if someone is already on air; the caller
    /// decides whether that is an error or an idempotent repeat.
    pub fn start(
        &mut self,
        connection: ConnectionId,
        identity: Identity,
        slot: Duration,
        ticks: mpsc::Sender<Command>,
    ) -> Result<&BroadcastState, CoordinatorError> {
        if let Some(current) = &self.current {
            return Err(CoordinatorError::SlotOccupied(current.identity.to_string()));
        }

        self.next_id += 1;
        let id = BroadcastId::new(self.next_id);
        let state = BroadcastState {
            id,
            connection,
            identity,
            remaining: slot.as_secs().max(1),
            started_at: Instant::now(),
            timer: SessionTimer::spawn(id, ticks),
        };
        Ok(self.current.insert(state))
    }

    /// Advance the countdown by one tick of `broadcast`
    pub fn tick(&mut self, broadcast: BroadcastId) -> TickOutcome {
        let Some(state) = self.current.as_mut().filter(|s| s.id == broadcast) else {
            return TickOutcome::Stale;
        };

        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            TickOutcome::Expired {
                connection: state.connection,
                identity: state.identity.clone(),
            }
        } else {
            TickOutcome::Running {
                identity: state.identity.clone(),
                remaining: state.remaining,
            }
        }
    }

    /// Announce `connection` under a new identity if it holds the slot
    pub fn rebind(&mut self, connection: &ConnectionId, identity: Identity) -> bool {
        match self.current.as_mut().filter(|state| state.connection == *connection) {
            Some(state) => {
                state.identity = identity;
                true
            }
            None => false,
        }
    }

    /// Add time to the running countdown; returns the new remaining seconds
    pub fn extend(&mut self, by: Duration) -> Option<u64> {
        self.current.as_mut().map(|state| {
            state.remaining = state.remaining.saturating_add(by.as_secs());
            state.remaining
        })
    }

    /// Transition `Live -> Idle` if `connection` still holds the slot.
    ///
    /// Cancels the timer and hands back the finished session so the caller
    /// can account for it. Returns `None` when `connection` is not the
    /// current broadcaster, including when the session already ended.
    pub fn finish(&mut self, connection: &ConnectionId) -> Option<FinishedBroadcast> {
        if !self.is_broadcaster(connection) {
            return None;
        }
        let state = self.current.take()?;
        state.timer.cancel();

        Some(FinishedBroadcast {
            id: state.id,
            connection: state.connection,
            identity: state.identity,
            elapsed: state.started_at.elapsed(),
        })
    }
}
