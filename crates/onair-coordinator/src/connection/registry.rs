//! Session registry implementation
//!
//! Tracks every open transport connection together with its outbound
//! mailbox, the identity it has claimed (if any) and when it was last heard
//! from. The registry is owned by the coordinator task, so plain maps are
//! enough.
//!
//! Outboxes are bounded. Sends never wait: a notification for a connection
//! whose outbox is full is dropped, and the connection is reported by
//! [`SessionRegistry::lagging`] so the coordinator can close it.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use onair_core::{CoordinatorError, Identity, IdentityProfile};
use onair_protocol::{ConnectionId, ServerEvent};

/// Sender half of a connection's outbound mailbox
pub type Outbox = mpsc::Sender<ServerEvent>;

/// Registry of open connections
#[derive(Default)]
pub struct SessionRegistry {
    /// Connections indexed by ID
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

/// A single open connection
pub struct ConnectionHandle {
    /// Connection ID
    pub id: ConnectionId,
    /// Outbound notifications for this connection
    outbox: Outbox,
    /// Claimed identity, once resolved
    identity: Option<Identity>,
    /// Cached store profile for the claimed identity
    profile: IdentityProfile,
    /// Last meaningful inbound event
    last_activity: Instant,
    /// When the connection was opened
    connected_at: Instant,
    /// Whether this connection already seeded the vote meter
    vote_seeded: bool,
}

impl ConnectionHandle {
    fn new(id: ConnectionId, outbox: Outbox) -> Self {
        let now = Instant::now();
        Self {
            id,
            outbox,
            identity: None,
            profile: IdentityProfile::default(),
            last_activity: now,
            connected_at: now,
            vote_seeded: false,
        }
    }

    /// Claimed identity, if any
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Cached store profile
    pub fn profile(&self) -> &IdentityProfile {
        &self.profile
    }

    /// Whether the connection has not claimed an identity
    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    /// Time since the last meaningful inbound event
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Time since the connection was opened
    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Queue a notification; returns `false` if it was not queued
    pub fn send(&self, event: ServerEvent) -> bool {
        match self.outbox.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::trace!("Outbox of {} full, dropping {:?}", self.id, event);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the outbox is full and the transport is not keeping up
    pub fn is_lagging(&self) -> bool {
        !self.outbox.is_closed() && self.outbox.capacity() == 0
    }
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened connection
    pub fn connect(&mut self, id: ConnectionId, outbox: Outbox) {
        if self
            .connections
            .insert(id, ConnectionHandle::new(id, outbox))
            .is_some()
        {
            tracing::warn!("Connection {} registered twice, replacing", id);
        }
    }

    /// Bind `identity` to a connection, replacing any earlier binding.
    ///
    /// A blocked profile is refused and leaves the connection anonymous.
    pub fn register(
        &mut self,
        id: ConnectionId,
        identity: Identity,
        profile: IdentityProfile,
        now_millis: u64,
    ) -> Result<(), CoordinatorError> {
        let handle = self
            .connections
            .get_mut(&id)
            .ok_or_else(|| CoordinatorError::UnknownIdentity(id.to_string()))?;

        if profile.is_blocked_at(now_millis) {
            return Err(CoordinatorError::BlockedIdentity(identity.into_string()));
        }

        if let Some(previous) = handle.identity.as_ref().filter(|p| **p != identity) {
            tracing::debug!("Connection {} rebinding {} -> {}", id, previous, identity);
        }
        handle.identity = Some(identity);
        handle.profile = profile;
        handle.last_activity = Instant::now();
        Ok(())
    }

    /// Record activity on a connection; returns `false` if unknown
    pub fn touch(&mut self, id: &ConnectionId) -> bool {
        match self.connections.get_mut(id) {
            Some(handle) => {
                handle.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Replace the cached profile if `id` is still bound to `identity`.
    ///
    /// Returns `false` when the connection closed or rebound meanwhile.
    pub fn refresh_profile(
        &mut self,
        id: &ConnectionId,
        identity: &Identity,
        profile: IdentityProfile,
    ) -> bool {
        match self.connections.get_mut(id) {
            Some(handle) if handle.identity.as_ref() == Some(identity) => {
                handle.profile = profile;
                true
            }
            _ => false,
        }
    }

    /// Stop tracking a connection, dropping its mailbox
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<ConnectionHandle> {
        self.connections.remove(id)
    }

    /// Anonymous connections silent for longer than `threshold`
    ///
    /// The connections stay registered; the caller decides how to close them.
    pub fn reap_idle(&self, threshold: Duration) -> Vec<ConnectionId> {
        let mut idle: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|handle| handle.is_anonymous() && handle.idle_for() > threshold)
            .map(|handle| handle.id)
            .collect();
        idle.sort();
        idle
    }

    /// Connections with a bound identity
    pub fn bound(&self) -> Vec<(ConnectionId, Identity)> {
        let mut bound: Vec<(ConnectionId, Identity)> = self
            .connections
            .values()
            .filter_map(|handle| handle.identity.clone().map(|identity| (handle.id, identity)))
            .collect();
        bound.sort_by_key(|(id, _)| *id);
        bound
    }

    /// Connections whose outbox is full
    pub fn lagging(&self) -> Vec<ConnectionId> {
        let mut lagging: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|handle| handle.is_lagging())
            .map(|handle| handle.id)
            .collect();
        lagging.sort();
        lagging
    }

    /// Mark the connection's one-time vote seed as used.
    ///
    /// Returns `true` only the first time for each connection.
    pub fn mark_vote_seeded(&mut self, id: &ConnectionId) -> bool {
        match self.connections.get_mut(id) {
            Some(handle) if !handle.vote_seeded => {
                handle.vote_seeded = true;
                true
            }
            _ => false,
        }
    }

    /// Get a connection by ID
    pub fn get(&self, id: &ConnectionId) -> Option<&ConnectionHandle> {
        self.connections.get(id)
    }

    /// Whether a connection is open
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Identity claimed by a connection
    pub fn identity(&self, id: &ConnectionId) -> Option<&Identity> {
        self.connections.get(id).and_then(|handle| handle.identity())
    }

    /// Send to one connection; returns `false` if it is gone
    pub fn send_to(&self, id: &ConnectionId, event: ServerEvent) -> bool {
        self.connections
            .get(id)
            .map(|handle| handle.send(event))
            .unwrap_or(false)
    }

    /// Send to every open connection
    pub fn broadcast(&self, event: ServerEvent) {
        for handle in self.connections.values() {
            handle.send(event.clone());
        }
    }

    /// Number of open connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if no connections are open
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
