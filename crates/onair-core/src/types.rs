//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use onair_protocol::DisplayColors;

/// Display name claimed by a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create a new identity, trimming surrounding whitespace.
    ///
    /// Returns `None` for an empty name.
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Get the raw name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw name
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for Identity {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Queue placement class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Appended to the tail
    #[default]
    Standard,
    /// Placed after the fast-pass entries already at the front
    FastPass,
}

impl Priority {
    pub fn is_fast_pass(&self) -> bool {
        matches!(self, Priority::FastPass)
    }
}

impl From<bool> for Priority {
    fn from(fast_pass: bool) -> Self {
        if fast_pass {
            Priority::FastPass
        } else {
            Priority::Standard
        }
    }
}

/// What the identity store knows about a name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfile {
    /// Whether a block has been placed on this identity
    #[serde(default)]
    pub is_blocked: bool,
    /// When the block lifts (Unix millis); `None` means indefinitely
    #[serde(default)]
    pub block_expiry: Option<u64>,
    /// Comment display preferences
    #[serde(default)]
    pub display_colors: DisplayColors,
}

impl IdentityProfile {
    /// Whether the block is in force at `now_millis`
    pub fn is_blocked_at(&self, now_millis: u64) -> bool {
        self.is_blocked && self.block_expiry.map_or(true, |expiry| expiry > now_millis)
    }
}

/// Why an on-air session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    /// Countdown reached zero
    TimedOut,
    /// Broadcaster sent `stop-live`
    Stopped,
    /// Vote meter crossed the lower threshold
    VotedOut,
    /// Broadcaster's connection dropped
    Disconnected,
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationCause::TimedOut => write!(f, "timed out"),
            TerminationCause::Stopped => write!(f, "stopped"),
            TerminationCause::VotedOut => write!(f, "voted out"),
            TerminationCause::Disconnected => write!(f, "disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_trims_and_rejects_empty() {
        assert_eq!(Identity::new("  alice ").unwrap().as_str(), "alice");
        assert!(Identity::new("   ").is_none());
        assert!(Identity::new("").is_none());
    }

    #[test]
    fn test_priority_from_flag() {
        assert_eq!(Priority::from(true), Priority::FastPass);
        assert_eq!(Priority::from(false), Priority::Standard);
        assert!(Priority::FastPass.is_fast_pass());
    }

    #[test]
    fn test_block_expiry() {
        let profile = IdentityProfile {
            is_blocked: true,
            block_expiry: Some(1_000),
            ..Default::default()
        };
        assert!(profile.is_blocked_at(999));
        assert!(!profile.is_blocked_at(1_000));

        let forever = IdentityProfile {
            is_blocked: true,
            block_expiry: None,
            ..Default::default()
        };
        assert!(forever.is_blocked_at(u64::MAX));

        assert!(!IdentityProfile::default().is_blocked_at(0));
    }

    #[test]
    fn test_profile_deserializes_store_document() {
        let json = r##"{"isBlocked":true,"blockExpiry":42,"displayColors":{"usernameColor":"#f00"}}"##;
        let profile: IdentityProfile = serde_json::from_str(json).unwrap();
        assert!(profile.is_blocked);
        assert_eq!(profile.block_expiry, Some(42));
        assert_eq!(
            profile.display_colors.username_color.as_deref(),
            Some("#f00")
        );
    }

    #[test]
    fn test_termination_cause_display() {
        assert_eq!(format!("{}", TerminationCause::VotedOut), "voted out");
    }
}
