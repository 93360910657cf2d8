//! Message types for the onair protocol
//!
//! Browser clients talk to the coordinator with JSON text frames. Each
//! frame carries a `type` tag naming the event, with the payload fields
//! alongside it:
//!
//! ```json
//! {"type": "join-queue", "priority": true}
//! {"type": "vote", "position": 55.0}
//! {"type": "offer", "target": "5f0c…", "payload": {"sdp": "…"}}
//! ```
//!
//! # Message Flow
//!
//! 1. Client connects and receives `welcome` with its connection ID plus a
//!    snapshot of the current vote meter, queue and on-air state
//! 2. Client sends `register-identity` to claim a display name
//! 3. Client joins the queue (`join-queue`) and waits for `go-live-prompt`
//! 4. Client sends `go-live`; everyone receives `main-feed` and
//!    `cleanup-connections`
//! 5. Viewers send `request-offer`; the broadcaster receives `new-peer` and
//!    starts an `offer`/`answer`/`ice-candidate` exchange with each viewer
//! 6. The session ends through `stop-live`, timer expiry, vote-out or
//!    disconnect; everyone receives `main-feed` with no identity

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::ConnectionId;

/// Inbound events (client → coordinator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Claim a display name for this connection
    RegisterIdentity { identity: String },

    /// Join the waiting line for the on-air slot
    JoinQueue {
        /// Optional echo of the claimed identity; must match if present
        #[serde(default)]
        identity: Option<String>,
        /// Fast-pass placement
        #[serde(default)]
        priority: bool,
    },

    /// Leave the waiting line
    LeaveQueue,

    /// Ask to take the on-air slot
    GoLive,

    /// Give up the on-air slot (or the queue place if not live)
    StopLive,

    /// Seed the shared vote meter on first contact
    SetInitialVote { position: f64 },

    /// Move the shared vote meter
    Vote { position: f64 },

    /// Ask to be introduced to the broadcaster with this identity
    RequestOffer { identity: String },

    /// Session description offer for a peer
    Offer { target: ConnectionId, payload: Value },

    /// Session description answer for a peer
    Answer { target: ConnectionId, payload: Value },

    /// ICE candidate for a peer
    IceCandidate { target: ConnectionId, payload: Value },

    /// Chat comment
    NewComment {
        #[serde(default)]
        identity: Option<String>,
        text: String,
    },

    /// Ask whether an identity currently holds a queue or on-air slot
    CheckUsername { identity: String },

    /// Keepalive
    Ping,
}

impl ClientEvent {
    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RegisterIdentity { .. } => "register-identity",
            ClientEvent::JoinQueue { .. } => "join-queue",
            ClientEvent::LeaveQueue => "leave-queue",
            ClientEvent::GoLive => "go-live",
            ClientEvent::StopLive => "stop-live",
            ClientEvent::SetInitialVote { .. } => "set-initial-vote",
            ClientEvent::Vote { .. } => "vote",
            ClientEvent::RequestOffer { .. } => "request-offer",
            ClientEvent::Offer { .. } => "offer",
            ClientEvent::Answer { .. } => "answer",
            ClientEvent::IceCandidate { .. } => "ice-candidate",
            ClientEvent::NewComment { .. } => "new-comment",
            ClientEvent::CheckUsername { .. } => "check-username",
            ClientEvent::Ping => "ping",
        }
    }
}

/// Display color preferences attached to a commenter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayColors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_color: Option<String>,
}

/// Error codes carried by targeted `error` notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The connection has no identity, or the identity does not match
    UnknownIdentity,
    /// The connection already holds a queue or on-air slot
    DuplicateQueueEntry,
    /// The action targets a session the sender does not own
    NotOwner,
    /// The identity is blocked
    BlockedIdentity,
    /// Someone else is on air
    SlotOccupied,
    /// Another contender is ahead in the queue
    OutOfTurn,
    /// The request could not be understood
    Malformed,
}

/// Outbound notifications (coordinator → clients)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First frame on every connection
    Welcome { connection: ConnectionId },

    /// 1-based rank of the receiving connection in the queue
    QueuePositionUpdate { position: usize },

    /// Number of queued contenders
    QueueLengthUpdate { length: usize },

    /// Identity at the head of the queue
    UpNextUpdate { identity: Option<String> },

    /// The receiving connection may send `go-live` now
    GoLivePrompt,

    /// Identity currently on air, or none
    MainFeed { identity: Option<String> },

    /// Identities currently on air
    LiveUsers { identities: Vec<String> },

    /// Countdown for the current broadcaster
    TimerUpdate { identity: String, remaining: u64 },

    /// The current broadcaster's time ran out
    TimerEnd { identity: String },

    /// Shared vote meter moved
    VoteUpdate { position: f64 },

    /// Vote meter snapshot for a new connection
    CurrentPosition { position: f64 },

    /// Vote meter step size
    CurrentSlideAmount { amount: f64 },

    /// Number of open connections
    UpdateOnlineUsers { count: usize },

    /// A viewer wants to negotiate with the broadcaster
    NewPeer { peer: ConnectionId },

    /// A connection went away
    PeerDisconnected { peer: ConnectionId },

    /// The slot is free and nobody is queued
    NoOneLive,

    /// The coordinator is closing this connection
    ForcedDisconnect { reason: String },

    /// Tear down existing peer negotiations
    CleanupConnections,

    /// Relayed offer
    Offer { from: ConnectionId, payload: Value },

    /// Relayed answer
    Answer { from: ConnectionId, payload: Value },

    /// Relayed ICE candidate
    IceCandidate { from: ConnectionId, payload: Value },

    /// Chat comment enriched with the author's colors
    Comment {
        identity: String,
        text: String,
        colors: DisplayColors,
    },

    /// Reply to `check-username`
    UsernameStatus { identity: String, taken: bool },

    /// Targeted error for a rejected request
    Error { code: ErrorCode, message: String },

    /// Reply to `ping`
    Pong,
}

impl ServerEvent {
    /// Build a targeted error notification
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code,
            message: message.into(),
        }
    }
}
