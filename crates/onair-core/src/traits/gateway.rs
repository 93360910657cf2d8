//! External collaborator traits
//!
//! The coordinator never owns accounts or balances. It reaches the account
//! service through these two narrow seams, and treats every call as
//! best-effort: a failure is logged and the rotation carries on.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{Identity, IdentityProfile};

/// Identity and block-status lookup
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Resolve what the store knows about `identity`.
    ///
    /// Unknown identities resolve to a default (unblocked) profile.
    async fn resolve_identity(&self, identity: &Identity) -> Result<IdentityProfile, GatewayError>;
}

/// Live-duration accounting and token rewards
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Add `seconds` of on-air time to the identity's total
    async fn record_live_seconds(&self, identity: &Identity, seconds: u64)
        -> Result<(), GatewayError>;

    /// Credit `amount` tokens to the identity
    async fn award_tokens(&self, identity: &Identity, amount: u64) -> Result<(), GatewayError>;
}
