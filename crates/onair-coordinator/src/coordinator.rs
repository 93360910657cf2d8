//! Coordinator actor
//!
//! All rotation state lives in one [`CoordinatorState`] owned by a single
//! task. Everything that wants to change it (WebSocket connections, the
//! countdown timer, identity lookups, the idle reaper) sends a [`Command`]
//! into that task's mailbox and the task applies commands one at a time.
//!
//! # Ordering Model
//!
//! Commands from one connection are sent by that connection's reader task
//! in the order its frames arrived, so they are applied in arrival order.
//! Commands from different sources interleave freely, but each is applied
//! completely (mutation plus notifications) before the next one starts.
//!
//! Work that has to wait (gateway calls) runs in spawned tasks that report
//! back with another command. Whatever they report is checked against the
//! state at the time it arrives, never against the state when the call
//! was made:
//! - An identity lookup for a connection that has since closed is dropped
//! - A profile refresh for a connection that has since rebound is dropped
//! - A timer tick for a session that has since ended is ignored

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use onair_core::config::CoordinatorConfig;
use onair_core::{GatewayError, Identity, IdentityProfile};
use onair_protocol::{ClientEvent, ConnectionId, ServerEvent};

use crate::connection::Outbox;
use crate::gateway::Gateways;
use crate::session::BroadcastId;
use crate::state::{CoordinatorState, StateSnapshot};

/// Messages accepted by the coordinator task
#[derive(Debug)]
pub enum Command {
    /// A transport connection opened
    Connect {
        connection: ConnectionId,
        outbox: Outbox,
    },
    /// A decoded inbound event
    Event {
        connection: ConnectionId,
        event: ClientEvent,
    },
    /// An inbound frame that could not be decoded
    Malformed {
        connection: ConnectionId,
        reason: String,
    },
    /// A transport connection closed
    Disconnect { connection: ConnectionId },
    /// One second elapsed on a session's countdown
    Tick { broadcast: BroadcastId },
    /// An identity lookup finished
    IdentityResolved {
        connection: ConnectionId,
        identity: Identity,
        result: Result<IdentityProfile, GatewayError>,
    },
    /// A periodic re-check of a bound identity finished
    ProfileRefreshed {
        connection: ConnectionId,
        identity: Identity,
        result: Result<IdentityProfile, GatewayError>,
    },
    /// Sweep idle anonymous connections and re-check bound identities
    ReapIdle,
    /// Report the current state
    Snapshot { reply: oneshot::Sender<StateSnapshot> },
}

/// The coordinator task is no longer running
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Coordinator is not running")]
pub struct CoordinatorClosed;

/// Outbox capacity for handles not built from a config
const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Cloneable handle for sending commands to the coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
    outbox_capacity: usize,
}

impl CoordinatorHandle {
    /// Wrap an existing command sender
    pub fn from_sender(tx: mpsc::Sender<Command>) -> Self {
        Self {
            tx,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }

    /// Create a mailbox pair for a new connection
    pub fn outbox(&self) -> (Outbox, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(self.outbox_capacity)
    }

    async fn send(&self, command: Command) -> Result<(), CoordinatorClosed> {
        self.tx.send(command).await.map_err(|_| CoordinatorClosed)
    }

    /// Announce a new connection and its outbound mailbox
    pub async fn connect(
        &self,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> Result<(), CoordinatorClosed> {
        self.send(Command::Connect { connection, outbox }).await
    }

    /// Forward a decoded event
    pub async fn event(
        &self,
        connection: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), CoordinatorClosed> {
        self.send(Command::Event { connection, event }).await
    }

    /// Report an undecodable frame
    pub async fn malformed(
        &self,
        connection: ConnectionId,
        reason: impl Into<String>,
    ) -> Result<(), CoordinatorClosed> {
        self.send(Command::Malformed {
            connection,
            reason: reason.into(),
        })
        .await
    }

    /// Announce that a connection closed
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), CoordinatorClosed> {
        self.send(Command::Disconnect { connection }).await
    }

    /// Ask for an idle sweep
    pub async fn reap_idle(&self) -> Result<(), CoordinatorClosed> {
        self.send(Command::ReapIdle).await
    }

    /// Fetch a snapshot of the current state
    pub async fn snapshot(&self) -> Result<StateSnapshot, CoordinatorClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| CoordinatorClosed)
    }
}

/// Spawner for the coordinator task
pub struct Coordinator;

impl Coordinator {
    /// Start the coordinator task.
    ///
    /// The task runs until `cancel` fires.
    pub fn spawn(
        config: CoordinatorConfig,
        gateways: Gateways,
        cancel: CancellationToken,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity);
        let handle = CoordinatorHandle {
            tx: tx.clone(),
            outbox_capacity: config.outbox_capacity,
        };
        let state = CoordinatorState::new(config, gateways, tx);
        let task = tokio::spawn(run(state, rx, cancel));
        (handle, task)
    }
}

async fn run(
    mut state: CoordinatorState,
    mut rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) {
    tracing::info!("Coordinator started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Coordinator shutting down");
                break;
            }
            command = rx.recv() => match command {
                Some(command) => state.apply(command),
                None => break,
            },
        }
    }

    let snapshot = state.snapshot();
    if let Some(broadcaster) = snapshot.broadcaster {
        tracing::info!("Dropping live session of {} on shutdown", broadcaster);
    }
}

impl CoordinatorState {
    /// Apply one command, then close connections that fell behind
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Connect { connection, outbox } => self.connect(connection, outbox),
            Command::Event { connection, event } => self.handle_event(connection, event),
            Command::Malformed { connection, reason } => self.malformed(connection, reason),
            Command::Disconnect { connection } => self.disconnect(connection),
            Command::Tick { broadcast } => self.on_tick(broadcast),
            Command::IdentityResolved {
                connection,
                identity,
                result,
            } => self.identity_resolved(connection, identity, result),
            Command::ProfileRefreshed {
                connection,
                identity,
                result,
            } => self.profile_refreshed(connection, identity, result),
            Command::ReapIdle => {
                self.reap_idle();
                self.refresh_profiles();
            }
            Command::Snapshot { reply } => {
                if reply.send(self.snapshot()).is_err() {
                    tracing::debug!("Snapshot requester went away");
                }
            }
        }
        self.close_lagging();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spawn() -> (CoordinatorHandle, JoinHandle<()>, CancellationToken) {
        let cancel = CancellationToken::new();
        let (handle, task) =
            Coordinator::spawn(CoordinatorConfig::default(), Gateways::default(), cancel.clone());
        (handle, task, cancel)
    }

    async fn recv_until<F>(rx: &mut mpsc::Receiver<ServerEvent>, mut wanted: F) -> ServerEvent
    where
        F: FnMut(&ServerEvent) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Some(event) if wanted(&event) => return event,
                    Some(_) => continue,
                    None => panic!("outbox closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn test_connect_and_snapshot() {
        let (handle, _task, cancel) = spawn();
        let (tx, mut rx) = handle.outbox();
        let id = ConnectionId::new();

        handle.connect(id, tx).await.unwrap();
        assert_eq!(
            recv_until(&mut rx, |_| true).await,
            ServerEvent::Welcome { connection: id }
        );

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.online, 1);
        assert_eq!(snapshot.broadcaster, None);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_register_then_go_live() {
        let (handle, _task, cancel) = spawn();
        let (tx, mut rx) = handle.outbox();
        let id = ConnectionId::new();

        handle.connect(id, tx).await.unwrap();
        handle
            .event(
                id,
                ClientEvent::RegisterIdentity {
                    identity: "alice".to_string(),
                },
            )
            .await
            .unwrap();
        handle.event(id, ClientEvent::GoLive).await.unwrap();

        recv_until(&mut rx, |e| {
            *e == ServerEvent::MainFeed {
                identity: Some("alice".to_string()),
            }
        })
        .await;
        assert_eq!(
            handle.snapshot().await.unwrap().broadcaster.as_deref(),
            Some("alice")
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error() {
        let (handle, _task, cancel) = spawn();
        let (tx, mut rx) = handle.outbox();
        let id = ConnectionId::new();

        handle.connect(id, tx).await.unwrap();
        handle.malformed(id, "expected value").await.unwrap();

        let event = recv_until(&mut rx, |e| matches!(e, ServerEvent::Error { .. })).await;
        assert!(matches!(
            event,
            ServerEvent::Error {
                code: onair_protocol::ErrorCode::Malformed,
                ..
            }
        ));
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_stalled_connection_is_closed() {
        let config = CoordinatorConfig {
            outbox_capacity: 16,
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let (handle, _task) = Coordinator::spawn(config, Gateways::default(), cancel.clone());

        let (stalled_tx, mut stalled_rx) = handle.outbox();
        let stalled = ConnectionId::new();
        handle.connect(stalled, stalled_tx).await.unwrap();

        let (tx, mut rx) = handle.outbox();
        let voter = ConnectionId::new();
        handle.connect(voter, tx).await.unwrap();

        for i in 0..32 {
            let position = 20.0 + i as f64;
            handle.event(voter, ClientEvent::Vote { position }).await.unwrap();
            let online = handle.snapshot().await.unwrap().online;
            while rx.try_recv().is_ok() {}
            if online == 1 {
                break;
            }
        }
        assert_eq!(handle.snapshot().await.unwrap().online, 1);

        // Everything queued before the outbox filled is still delivered.
        let mut delivered = 0;
        while stalled_rx.recv().await.is_some() {
            delivered += 1;
        }
        assert_eq!(delivered, 16);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_handle_fails_after_shutdown() {
        let (handle, task, cancel) = spawn();
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(handle.reap_idle().await, Err(CoordinatorClosed));
        assert!(handle.snapshot().await.is_err());
    }
}
