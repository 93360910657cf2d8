//! Coordinator state
//!
//! `CoordinatorState` owns every component of the rotation: the session
//! registry, the queue, the vote meter and the on-air session. It is owned
//! by the coordinator task and mutated by one command at a time, so each
//! handler below runs its mutation and the resulting notifications without
//! interleaving with anything else.
//!
//! Gateway calls never run inline. Identity lookups are spawned and come
//! back as `Command::IdentityResolved`; ledger calls are spawned and only
//! logged.
//!
//! Block status is checked when an identity is bound and again on every
//! sweep, which re-resolves each bound identity and closes connections
//! whose identity has been blocked since.

use std::collections::{HashMap, VecDeque};
use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use onair_core::config::CoordinatorConfig;
use onair_core::time::current_time_millis;
use onair_core::{
    CoordinatorError, GatewayError, Identity, IdentityProfile, Priority, TerminationCause,
};
use onair_protocol::{ClientEvent, ConnectionId, ServerEvent};

use crate::connection::{Outbox, SessionRegistry};
use crate::coordinator::Command;
use crate::gateway::Gateways;
use crate::queue::BroadcastQueue;
use crate::relay::{SignalKind, SignalingRelay};
use crate::session::{ActiveBroadcastSession, BroadcastId, TickOutcome};
use crate::vote::{VoteMeter, VoteOutcome};

/// Events a connection may send while its identity is being resolved
const MAX_DEFERRED_EVENTS: usize = 32;

/// Point-in-time view of the rotation, for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    /// Open connections
    pub online: usize,
    /// Identity on air
    pub broadcaster: Option<String>,
    /// Seconds left for the broadcaster
    pub remaining: Option<u64>,
    /// Queued identities, front first
    pub queue: Vec<Option<String>>,
    /// Vote meter position
    pub vote_position: f64,
    /// Vote meter step
    pub vote_step: f64,
}

/// All mutable state of the coordinator
pub struct CoordinatorState {
    config: CoordinatorConfig,
    registry: SessionRegistry,
    queue: BroadcastQueue,
    vote: VoteMeter,
    session: ActiveBroadcastSession,
    gateways: Gateways,
    /// Events held back until the sender's identity lookup completes
    resolving: HashMap<ConnectionId, VecDeque<ClientEvent>>,
    /// Mailbox of the owning task, for timers and gateway replies
    commands: mpsc::Sender<Command>,
}

impl CoordinatorState {
    /// Create idle state.
    ///
    /// `commands` must feed back into the task that owns this state.
    pub fn new(
        config: CoordinatorConfig,
        gateways: Gateways,
        commands: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            vote: VoteMeter::new(config.vote.clone()),
            config,
            registry: SessionRegistry::new(),
            queue: BroadcastQueue::new(),
            session: ActiveBroadcastSession::new(),
            gateways,
            resolving: HashMap::new(),
            commands,
        }
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Track a new connection and bring it up to date
    pub fn connect(&mut self, connection: ConnectionId, outbox: Outbox) {
        self.registry.connect(connection, outbox);
        tracing::info!("Connection {} opened ({} online)", connection, self.registry.len());

        self.registry
            .send_to(&connection, ServerEvent::Welcome { connection });
        self.send_snapshot(&connection);
        self.broadcast_online_count();
    }

    /// Forget a connection, ending its broadcast or queue place.
    ///
    /// Unknown connections are ignored, so a transport that reports its
    /// close after a forced disconnect does no harm.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let Some(handle) = self.registry.unregister(&connection) else {
            return;
        };
        self.resolving.remove(&connection);

        tracing::info!(
            "Connection {} closed ({}, after {}s, {} online)",
            connection,
            handle
                .identity()
                .map(|identity| identity.to_string())
                .unwrap_or_else(|| "anonymous".to_string()),
            handle.connected_for().as_secs(),
            self.registry.len()
        );

        if self.session.is_broadcaster(&connection) {
            self.terminate(&connection, TerminationCause::Disconnected);
        } else {
            self.remove_from_queue(&connection);
        }

        self.registry
            .broadcast(ServerEvent::PeerDisconnected { peer: connection });
        self.broadcast_online_count();
    }

    /// Tell a connection why it is being closed, then close it
    pub fn force_disconnect(&mut self, connection: ConnectionId, reason: &str) {
        tracing::warn!("Forcing {} off: {}", connection, reason);
        self.registry.send_to(
            &connection,
            ServerEvent::ForcedDisconnect {
                reason: reason.to_string(),
            },
        );
        self.disconnect(connection);
    }

    /// Close anonymous connections silent for longer than the idle timeout
    pub fn reap_idle(&mut self) {
        let idle = self.registry.reap_idle(self.config.idle_timeout);
        if !idle.is_empty() {
            tracing::info!("Reaping {} idle anonymous connection(s)", idle.len());
        }
        for connection in idle {
            self.force_disconnect(connection, "idle timeout");
        }
    }

    /// Re-resolve every bound identity to pick up blocks placed since binding
    pub fn refresh_profiles(&mut self) {
        for (connection, identity) in self.registry.bound() {
            let store = self.gateways.identities.clone();
            let commands = self.commands.clone();
            tokio::spawn(async move {
                let result = store.resolve_identity(&identity).await;
                let refreshed = Command::ProfileRefreshed {
                    connection,
                    identity,
                    result,
                };
                if commands.send(refreshed).await.is_err() {
                    tracing::debug!("Coordinator stopped before profile refresh finished");
                }
            });
        }
    }

    /// Apply a re-resolved profile to a still-bound connection
    pub fn profile_refreshed(
        &mut self,
        connection: ConnectionId,
        identity: Identity,
        result: Result<IdentityProfile, GatewayError>,
    ) {
        let profile = match result {
            Ok(profile) => profile,
            Err(err) => {
                tracing::debug!("Keeping cached profile of {}: {}", identity, err);
                return;
            }
        };
        let blocked = profile.is_blocked_at(current_time_millis());
        if !self.registry.refresh_profile(&connection, &identity, profile) {
            tracing::debug!("{} closed or rebound before {} refreshed", connection, identity);
            return;
        }
        if blocked {
            self.reject(connection, CoordinatorError::BlockedIdentity(identity.into_string()));
        }
    }

    /// Close every connection whose outbox is full
    pub fn close_lagging(&mut self) {
        loop {
            let lagging = self.registry.lagging();
            if lagging.is_empty() {
                return;
            }
            for connection in lagging {
                self.force_disconnect(connection, "not reading notifications");
            }
        }
    }

    // ========================================================================
    // Inbound events
    // ========================================================================

    /// Handle one decoded event from `connection`
    pub fn handle_event(&mut self, connection: ConnectionId, event: ClientEvent) {
        if !self.registry.touch(&connection) {
            tracing::debug!("Dropping {} from closed connection {}", event.name(), connection);
            return;
        }

        if let Some(deferred) = self.resolving.get_mut(&connection) {
            if deferred.len() >= MAX_DEFERRED_EVENTS {
                self.reject(
                    connection,
                    CoordinatorError::Malformed("too many events before identity resolved".into()),
                );
            } else {
                deferred.push_back(event);
            }
            return;
        }

        tracing::debug!("{} from {}", event.name(), connection);
        let result = match event {
            ClientEvent::RegisterIdentity { identity } => self.register_identity(connection, &identity),
            ClientEvent::JoinQueue { identity, priority } => {
                self.join_queue(connection, identity.as_deref(), Priority::from(priority))
            }
            ClientEvent::LeaveQueue => {
                self.remove_from_queue(&connection);
                Ok(())
            }
            ClientEvent::GoLive => self.go_live(connection),
            ClientEvent::StopLive => self.stop_live(connection),
            ClientEvent::SetInitialVote { position } => self.set_initial_vote(connection, position),
            ClientEvent::Vote { position } => self.vote(position),
            ClientEvent::RequestOffer { identity } => {
                self.request_offer(connection, &identity);
                Ok(())
            }
            ClientEvent::Offer { target, payload } => {
                self.signal(SignalKind::Offer, connection, target, payload);
                Ok(())
            }
            ClientEvent::Answer { target, payload } => {
                self.signal(SignalKind::Answer, connection, target, payload);
                Ok(())
            }
            ClientEvent::IceCandidate { target, payload } => {
                self.signal(SignalKind::IceCandidate, connection, target, payload);
                Ok(())
            }
            ClientEvent::NewComment { identity, text } => {
                self.new_comment(connection, identity.as_deref(), &text)
            }
            ClientEvent::CheckUsername { identity } => {
                self.check_username(connection, &identity);
                Ok(())
            }
            ClientEvent::Ping => {
                self.registry.send_to(&connection, ServerEvent::Pong);
                Ok(())
            }
        };

        if let Err(err) = result {
            self.reject(connection, err);
        }
    }

    /// A frame from `connection` could not be decoded
    pub fn malformed(&mut self, connection: ConnectionId, reason: String) {
        self.reject(connection, CoordinatorError::Malformed(reason));
    }

    /// Apply the outcome of an identity lookup
    pub fn identity_resolved(
        &mut self,
        connection: ConnectionId,
        identity: Identity,
        result: Result<IdentityProfile, GatewayError>,
    ) {
        let deferred = self.resolving.remove(&connection).unwrap_or_default();
        if !self.registry.contains(&connection) {
            tracing::debug!("{} left before {} resolved", connection, identity);
            return;
        }

        let profile = match result {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!("Identity lookup for {} failed, using defaults: {}", identity, err);
                IdentityProfile::default()
            }
        };

        let previous = self.registry.identity(&connection).cloned();
        match self
            .registry
            .register(connection, identity.clone(), profile, current_time_millis())
        {
            Ok(()) => tracing::info!("{} registered as {}", connection, identity),
            Err(err) => {
                self.reject(connection, err);
                return;
            }
        }
        if previous.is_some_and(|previous| previous != identity) {
            self.identity_changed(connection, identity);
        }

        for event in deferred {
            self.handle_event(connection, event);
        }
    }

    /// Re-announce a broadcaster or queued connection under its new identity
    fn identity_changed(&mut self, connection: ConnectionId, identity: Identity) {
        if self.session.rebind(&connection, identity.clone()) {
            tracing::info!("Broadcaster {} is now on air as {}", connection, identity);
            let name = identity.into_string();
            self.registry.broadcast(ServerEvent::MainFeed {
                identity: Some(name.clone()),
            });
            self.registry.broadcast(ServerEvent::LiveUsers {
                identities: vec![name],
            });
        } else if self.queue_head() == Some(connection) {
            self.broadcast_queue_views();
        }
    }

    fn register_identity(&mut self, connection: ConnectionId, name: &str) -> Result<(), CoordinatorError> {
        let identity = Identity::new(name)
            .ok_or_else(|| CoordinatorError::Malformed("identity must not be empty".into()))?;

        self.resolving.insert(connection, VecDeque::new());

        let store = self.gateways.identities.clone();
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let result = store.resolve_identity(&identity).await;
            let resolved = Command::IdentityResolved {
                connection,
                identity,
                result,
            };
            if commands.send(resolved).await.is_err() {
                tracing::debug!("Coordinator stopped before identity lookup finished");
            }
        });
        Ok(())
    }

    // ========================================================================
    // Queue and on-air slot
    // ========================================================================

    fn join_queue(
        &mut self,
        connection: ConnectionId,
        claimed: Option<&str>,
        priority: Priority,
    ) -> Result<(), CoordinatorError> {
        let identity = self.bound_identity(&connection)?;
        if let Some(claimed) = claimed.map(str::trim).filter(|c| !c.is_empty()) {
            if identity != *claimed {
                return Err(CoordinatorError::UnknownIdentity(claimed.to_string()));
            }
        }

        let head_before = self.queue_head();
        let position = self
            .queue
            .enqueue(connection, priority, self.session.broadcaster())?;
        tracing::info!("{} joined the queue at {} ({:?})", identity, position, priority);

        self.queue_changed(head_before);
        Ok(())
    }

    fn go_live(&mut self, connection: ConnectionId) -> Result<(), CoordinatorError> {
        let identity = self.bound_identity(&connection)?;

        if self.session.is_broadcaster(&connection) {
            tracing::debug!("{} is already on air", identity);
            return Ok(());
        }
        if let Some(current) = self.session.current() {
            let holder = current.identity.to_string();
            return Err(if self.queue.contains(&connection) {
                CoordinatorError::OutOfTurn(holder)
            } else {
                CoordinatorError::SlotOccupied(holder)
            });
        }

        // A free slot goes to whoever asks first, queued or not.
        self.start_broadcast(connection, identity)
    }

    fn stop_live(&mut self, connection: ConnectionId) -> Result<(), CoordinatorError> {
        if self.terminate(&connection, TerminationCause::Stopped) || self.remove_from_queue(&connection) {
            Ok(())
        } else {
            Err(CoordinatorError::NotOwner)
        }
    }

    /// Put `connection` on air and announce it
    fn start_broadcast(&mut self, connection: ConnectionId, identity: Identity) -> Result<(), CoordinatorError> {
        let (id, remaining) = {
            let state = self.session.start(
                connection,
                identity.clone(),
                self.config.slot_duration,
                self.commands.clone(),
            )?;
            (state.id, state.remaining)
        };
        self.queue.remove(&connection);
        tracing::info!("{} is on air ({}, {}s)", identity, id, remaining);

        self.vote.reset();
        self.broadcast_vote_meter();

        let name = identity.into_string();
        self.registry.broadcast(ServerEvent::MainFeed {
            identity: Some(name.clone()),
        });
        self.registry.broadcast(ServerEvent::LiveUsers {
            identities: vec![name.clone()],
        });
        self.registry.broadcast(ServerEvent::TimerUpdate {
            identity: name,
            remaining,
        });
        self.registry.broadcast(ServerEvent::CleanupConnections);
        self.broadcast_queue_views();
        Ok(())
    }

    /// End the broadcast held by `connection`.
    ///
    /// Returns `false` without side effects if `connection` is not on air,
    /// which makes every termination path safe to repeat.
    fn terminate(&mut self, connection: &ConnectionId, cause: TerminationCause) -> bool {
        let Some(finished) = self.session.finish(connection) else {
            return false;
        };
        let seconds = finished.elapsed.as_secs();
        tracing::info!(
            "{} went off air: {} after {}s ({})",
            finished.identity,
            cause,
            seconds,
            finished.id
        );

        let ledger = self.gateways.ledger.clone();
        let identity = finished.identity.clone();
        spawn_gateway_call("record live seconds", async move {
            ledger.record_live_seconds(&identity, seconds).await
        });

        self.vote.reset_step();
        if cause == TerminationCause::TimedOut {
            self.registry.broadcast(ServerEvent::TimerEnd {
                identity: finished.identity.to_string(),
            });
        }
        self.registry
            .broadcast(ServerEvent::MainFeed { identity: None });
        self.registry
            .broadcast(ServerEvent::LiveUsers { identities: Vec::new() });
        self.registry.broadcast(ServerEvent::CleanupConnections);
        self.registry.broadcast(ServerEvent::CurrentSlideAmount {
            amount: self.vote.step(),
        });

        self.promote_next();
        true
    }

    /// Hand the free slot to the first queued connection still able to take it
    fn promote_next(&mut self) {
        while let Some(entry) = self.queue.dequeue_head() {
            let Some(identity) = self.registry.identity(&entry.connection).cloned() else {
                tracing::debug!("Skipping queue entry {}: gone or anonymous", entry.connection);
                continue;
            };

            self.registry.send_to(&entry.connection, ServerEvent::GoLivePrompt);
            match self.start_broadcast(entry.connection, identity) {
                Ok(()) => return,
                Err(err) => tracing::warn!("Could not promote {}: {}", entry.connection, err),
            }
        }

        tracing::info!("Queue empty, no one is on air");
        self.broadcast_queue_views();
        self.registry.broadcast(ServerEvent::NoOneLive);
    }

    /// Advance the countdown of `broadcast`
    pub fn on_tick(&mut self, broadcast: BroadcastId) {
        match self.session.tick(broadcast) {
            TickOutcome::Stale => tracing::trace!("Ignoring tick from ended {}", broadcast),
            TickOutcome::Running {
                identity,
                remaining,
            } => {
                tracing::trace!("{}: {}s left", identity, remaining);
                self.registry.broadcast(ServerEvent::TimerUpdate {
                    identity: identity.into_string(),
                    remaining,
                });
            }
            TickOutcome::Expired {
                connection,
                identity,
            } => {
                self.registry.broadcast(ServerEvent::TimerUpdate {
                    identity: identity.into_string(),
                    remaining: 0,
                });
                self.terminate(&connection, TerminationCause::TimedOut);
            }
        }
    }

    // ========================================================================
    // Vote meter
    // ========================================================================

    fn set_initial_vote(&mut self, connection: ConnectionId, position: f64) -> Result<(), CoordinatorError> {
        if !position.is_finite() {
            return Err(CoordinatorError::Malformed(format!(
                "vote position must be a finite number, got {}",
                position
            )));
        }
        if !self.registry.mark_vote_seeded(&connection) {
            tracing::debug!("{} already seeded the vote meter", connection);
            return Ok(());
        }

        let position = self.vote.set_initial(position)?;
        self.registry.broadcast(ServerEvent::VoteUpdate { position });
        Ok(())
    }

    fn vote(&mut self, position: f64) -> Result<(), CoordinatorError> {
        match self.vote.apply_vote(position)? {
            VoteOutcome::Moved => {
                self.registry.broadcast(ServerEvent::VoteUpdate {
                    position: self.vote.position(),
                });
            }
            VoteOutcome::Rewarded => {
                self.registry.broadcast(ServerEvent::CurrentSlideAmount {
                    amount: self.vote.step(),
                });
                self.reward_broadcaster();
                self.registry.broadcast(ServerEvent::VoteUpdate {
                    position: self.vote.position(),
                });
            }
            VoteOutcome::VotedOut => {
                self.registry.broadcast(ServerEvent::VoteUpdate {
                    position: self.vote.position(),
                });
                self.registry.broadcast(ServerEvent::CurrentSlideAmount {
                    amount: self.vote.step(),
                });
                if let Some(broadcaster) = self.session.broadcaster() {
                    self.terminate(&broadcaster, TerminationCause::VotedOut);
                }
            }
        }
        Ok(())
    }

    fn reward_broadcaster(&mut self) {
        let Some(remaining) = self.session.extend(self.config.vote_extension) else {
            return;
        };
        let Some(identity) = self.session.current().map(|state| state.identity.clone()) else {
            return;
        };
        tracing::info!("{} rewarded, {}s left", identity, remaining);

        self.registry.broadcast(ServerEvent::TimerUpdate {
            identity: identity.to_string(),
            remaining,
        });

        let ledger = self.gateways.ledger.clone();
        let amount = self.config.reward_tokens;
        spawn_gateway_call("award tokens", async move {
            ledger.award_tokens(&identity, amount).await
        });
    }

    // ========================================================================
    // Signaling and chat
    // ========================================================================

    fn request_offer(&mut self, viewer: ConnectionId, name: &str) {
        let broadcaster = self
            .session
            .current()
            .filter(|state| state.identity == *name.trim())
            .map(|state| state.connection);
        if broadcaster.is_none() {
            tracing::debug!("{} asked for {} who is not on air", viewer, name);
        }
        SignalingRelay::introduce(&self.registry, viewer, broadcaster);
    }

    fn signal(&self, kind: SignalKind, from: ConnectionId, target: ConnectionId, payload: Value) {
        SignalingRelay::forward(&self.registry, kind, from, target, payload);
    }

    fn new_comment(
        &mut self,
        connection: ConnectionId,
        claimed: Option<&str>,
        text: &str,
    ) -> Result<(), CoordinatorError> {
        let handle = self
            .registry
            .get(&connection)
            .ok_or_else(|| CoordinatorError::UnknownIdentity(connection.to_string()))?;
        let identity = handle
            .identity()
            .ok_or_else(|| CoordinatorError::UnknownIdentity(connection.to_string()))?;

        if let Some(claimed) = claimed.map(str::trim).filter(|c| !c.is_empty()) {
            if *identity != *claimed {
                return Err(CoordinatorError::UnknownIdentity(claimed.to_string()));
            }
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(CoordinatorError::Malformed("comment must not be empty".into()));
        }

        let comment = ServerEvent::Comment {
            identity: identity.to_string(),
            text: text.to_string(),
            colors: handle.profile().display_colors.clone(),
        };
        self.registry.broadcast(comment);
        Ok(())
    }

    fn check_username(&self, connection: ConnectionId, name: &str) {
        let name = name.trim();
        let holds = |id: &ConnectionId| self.registry.identity(id).map_or(false, |i| *i == *name);
        let taken = self.session.broadcaster().map_or(false, |b| holds(&b))
            || self.queue.iter().any(|entry| holds(&entry.connection));

        self.registry.send_to(
            &connection,
            ServerEvent::UsernameStatus {
                identity: name.to_string(),
                taken,
            },
        );
    }

    // ========================================================================
    // Error policy and fan-out
    // ========================================================================

    fn reject(&mut self, connection: ConnectionId, err: CoordinatorError) {
        match err {
            CoordinatorError::NotOwner => {
                tracing::warn!("Ignoring request from {}: {}", connection, err);
            }
            CoordinatorError::BlockedIdentity(ref identity) => {
                let reason = format!("identity {} is blocked", identity);
                self.force_disconnect(connection, &reason);
            }
            CoordinatorError::GatewayUnavailable(ref cause) => {
                tracing::warn!("Gateway failure for {}: {}", connection, cause);
            }
            _ => {
                tracing::warn!("Rejected request from {}: {}", connection, err);
                self.registry
                    .send_to(&connection, ServerEvent::error(err.code(), err.to_string()));
            }
        }
    }

    fn bound_identity(&self, connection: &ConnectionId) -> Result<Identity, CoordinatorError> {
        self.registry
            .identity(connection)
            .cloned()
            .ok_or_else(|| CoordinatorError::UnknownIdentity(connection.to_string()))
    }

    fn display_name(&self, connection: &ConnectionId) -> String {
        self.registry
            .identity(connection)
            .map(|identity| identity.to_string())
            .unwrap_or_else(|| connection.to_string())
    }

    fn queue_head(&self) -> Option<ConnectionId> {
        self.queue.head().map(|entry| entry.connection)
    }

    /// Drop `connection` from the queue; returns whether it was queued
    fn remove_from_queue(&mut self, connection: &ConnectionId) -> bool {
        let head_before = self.queue_head();
        if !self.queue.remove(connection) {
            return false;
        }
        tracing::info!("{} left the queue", self.display_name(connection));
        self.queue_changed(head_before);
        true
    }

    /// Publish queue views and prompt a new head while the slot is free
    fn queue_changed(&mut self, head_before: Option<ConnectionId>) {
        self.broadcast_queue_views();

        if self.session.is_live() {
            return;
        }
        if let Some(head) = self.queue_head().filter(|head| Some(*head) != head_before) {
            self.registry.send_to(&head, ServerEvent::GoLivePrompt);
        }
    }

    fn broadcast_queue_views(&self) {
        for (connection, position) in self.queue.positions() {
            self.registry
                .send_to(&connection, ServerEvent::QueuePositionUpdate { position });
        }
        self.registry.broadcast(ServerEvent::QueueLengthUpdate {
            length: self.queue.len(),
        });
        self.registry.broadcast(ServerEvent::UpNextUpdate {
            identity: self.up_next(),
        });
    }

    fn broadcast_vote_meter(&self) {
        self.registry.broadcast(ServerEvent::CurrentPosition {
            position: self.vote.position(),
        });
        self.registry.broadcast(ServerEvent::CurrentSlideAmount {
            amount: self.vote.step(),
        });
    }

    fn broadcast_online_count(&self) {
        self.registry.broadcast(ServerEvent::UpdateOnlineUsers {
            count: self.registry.len(),
        });
    }

    fn up_next(&self) -> Option<String> {
        self.queue_head()
            .and_then(|head| self.registry.identity(&head))
            .map(|identity| identity.to_string())
    }

    fn send_snapshot(&self, connection: &ConnectionId) {
        let current = self.session.current();
        let mut events = vec![
            ServerEvent::CurrentPosition {
                position: self.vote.position(),
            },
            ServerEvent::CurrentSlideAmount {
                amount: self.vote.step(),
            },
            ServerEvent::LiveUsers {
                identities: current.map(|s| s.identity.to_string()).into_iter().collect(),
            },
            ServerEvent::QueueLengthUpdate {
                length: self.queue.len(),
            },
            ServerEvent::UpNextUpdate {
                identity: self.up_next(),
            },
        ];
        if let Some(state) = current {
            events.push(ServerEvent::MainFeed {
                identity: Some(state.identity.to_string()),
            });
            events.push(ServerEvent::TimerUpdate {
                identity: state.identity.to_string(),
                remaining: state.remaining,
            });
        }

        for event in events {
            self.registry.send_to(connection, event);
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Current view of the rotation
    pub fn snapshot(&self) -> StateSnapshot {
        let current = self.session.current();
        StateSnapshot {
            online: self.registry.len(),
            broadcaster: current.map(|state| state.identity.to_string()),
            remaining: current.map(|state| state.remaining),
            queue: self
                .queue
                .iter()
                .map(|entry| self.registry.identity(&entry.connection).map(|i| i.to_string()))
                .collect(),
            vote_position: self.vote.position(),
            vote_step: self.vote.step(),
        }
    }

    /// Connection registry
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Waiting line
    pub fn queue(&self) -> &BroadcastQueue {
        &self.queue
    }

    /// On-air slot
    pub fn session(&self) -> &ActiveBroadcastSession {
        &self.session
    }

    /// Shared vote meter
    pub fn vote_meter(&self) -> &VoteMeter {
        &self.vote
    }
}

/// Run a best-effort gateway call in the background, logging failures
fn spawn_gateway_call<F>(what: &'static str, call: F)
where
    F: Future<Output = Result<(), GatewayError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = call.await {
            tracing::warn!("Failed to {}: {}", what, err);
        }
    });
}
