//! Countdown timer for an on-air session
//!
//! Each session owns exactly one `SessionTimer`. The timer does not keep
//! the countdown itself: it only posts a `Command::Tick` tagged with its
//! session's ID into the coordinator mailbox once per second, so the
//! remaining time is always read and written by the coordinator task.
//! A tick that arrives after its session ended carries a stale ID and is
//! dropped by the session.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::BroadcastId;
use crate::coordinator::Command;

/// Interval between countdown ticks
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Cancellable repeating tick bound to one session
pub struct SessionTimer {
    cancel: CancellationToken,
}

impl SessionTimer {
    /// Start ticking for `broadcast`; the first tick lands one period from now
    pub fn spawn(broadcast: BroadcastId, ticks: mpsc::Sender<Command>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if ticks.send(Command::Tick { broadcast }).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::trace!("Timer for {} stopped", broadcast);
        });

        Self { cancel }
    }

    /// Stop ticking. Cancelling twice is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
