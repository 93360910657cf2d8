//! Core error types for onair

use onair_protocol::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Domain errors raised while handling a client event
///
/// None of these are fatal: each is handled at the point of detection and
/// at most produces a targeted notification to the offending connection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    /// Event references a connection or identity that is not registered
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// Connection already holds a queue or on-air slot
    #[error("Already queued or on air: {0}")]
    DuplicateQueueEntry(String),

    /// Sender does not own the targeted session
    #[error("Not the owner of the current broadcast")]
    NotOwner,

    /// Identity is blocked
    #[error("Identity is blocked: {0}")]
    BlockedIdentity(String),

    /// External gateway call failed
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(#[from] GatewayError),

    /// Another broadcaster holds the slot
    #[error("Slot occupied by {0}")]
    SlotOccupied(String),

    /// Requester is waiting in the queue behind the live broadcast
    #[error("Not your turn: queued behind {0}")]
    OutOfTurn(String),

    /// Request payload is invalid
    #[error("Malformed request: {0}")]
    Malformed(String),
}

impl CoordinatorError {
    /// Wire error code for a targeted notification
    pub fn code(&self) -> ErrorCode {
        match self {
            CoordinatorError::UnknownIdentity(_) => ErrorCode::UnknownIdentity,
            CoordinatorError::DuplicateQueueEntry(_) => ErrorCode::DuplicateQueueEntry,
            CoordinatorError::NotOwner => ErrorCode::NotOwner,
            CoordinatorError::BlockedIdentity(_) => ErrorCode::BlockedIdentity,
            CoordinatorError::GatewayUnavailable(_) => ErrorCode::Malformed,
            CoordinatorError::SlotOccupied(_) => ErrorCode::SlotOccupied,
            CoordinatorError::OutOfTurn(_) => ErrorCode::OutOfTurn,
            CoordinatorError::Malformed(_) => ErrorCode::Malformed,
        }
    }
}

/// External collaborator errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Request never reached the store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Store answered with a failure status
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Store answered with an unreadable body
    #[error("Invalid response: {0}")]
    Decode(String),

    /// No gateway is configured for this operation
    #[error("Gateway not configured")]
    NotConfigured,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
