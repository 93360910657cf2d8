//! In-memory gateway
//!
//! Serves the deployment without an account service and doubles as the
//! test gateway. Ledger calls are only logged unless the gateway was built
//! with [`StaticGateway::recording`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use onair_core::traits::{IdentityStore, LedgerGateway};
use onair_core::{GatewayError, Identity, IdentityProfile};

/// A ledger call observed by [`StaticGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    LiveSeconds { identity: Identity, seconds: u64 },
    Tokens { identity: Identity, amount: u64 },
}

/// Gateway that answers from a fixed profile table
#[derive(Default)]
pub struct StaticGateway {
    profiles: Mutex<HashMap<Identity, IdentityProfile>>,
    /// Observed ledger calls; `None` when calls are only logged
    calls: Option<Mutex<Vec<GatewayCall>>>,
    failing: AtomicBool,
}

impl StaticGateway {
    /// Gateway that logs ledger calls and keeps nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway that keeps every ledger call for inspection
    pub fn recording() -> Self {
        Self {
            calls: Some(Mutex::new(Vec::new())),
            ..Self::default()
        }
    }

    /// Answer lookups for `identity` with `profile`
    pub fn set_profile(&self, identity: Identity, profile: IdentityProfile) {
        lock(&self.profiles).insert(identity, profile);
    }

    /// Block `identity` indefinitely
    pub fn block(&self, identity: Identity) {
        self.set_profile(
            identity,
            IdentityProfile {
                is_blocked: true,
                ..Default::default()
            },
        );
    }

    /// Make every call fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Ledger calls seen so far, oldest first; always empty unless recording
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls
            .as_ref()
            .map(|calls| lock(calls).clone())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(GatewayError::Transport("static gateway set to fail".to_string()))
        } else {
            Ok(())
        }
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        self.check()?;
        tracing::info!("Ledger call: {:?}", call);
        if let Some(calls) = &self.calls {
            lock(calls).push(call);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for StaticGateway {
    async fn resolve_identity(&self, identity: &Identity) -> Result<IdentityProfile, GatewayError> {
        self.check()?;
        Ok(lock(&self.profiles)
            .get(identity)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LedgerGateway for StaticGateway {
    async fn record_live_seconds(
        &self,
        identity: &Identity,
        seconds: u64,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::LiveSeconds {
            identity: identity.clone(),
            seconds,
        })
    }

    async fn award_tokens(&self, identity: &Identity, amount: u64) -> Result<(), GatewayError> {
        self.record(GatewayCall::Tokens {
            identity: identity.clone(),
            amount,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_profiles_and_blocks() {
        let gateway = StaticGateway::new();
        gateway.block(ident("mallory"));

        assert!(gateway.resolve_identity(&ident("mallory")).await.unwrap().is_blocked);
        assert!(!gateway.resolve_identity(&ident("alice")).await.unwrap().is_blocked);
    }

    #[tokio::test]
    async fn test_records_ledger_calls() {
        let gateway = StaticGateway::recording();
        gateway.record_live_seconds(&ident("alice"), 30).await.unwrap();
        gateway.award_tokens(&ident("alice"), 10).await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::LiveSeconds {
                    identity: ident("alice"),
                    seconds: 30
                },
                GatewayCall::Tokens {
                    identity: ident("alice"),
                    amount: 10
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_plain_gateway_keeps_no_calls() {
        let gateway = StaticGateway::new();
        for _ in 0..100 {
            gateway.record_live_seconds(&ident("alice"), 60).await.unwrap();
            gateway.award_tokens(&ident("alice"), 10).await.unwrap();
        }
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let gateway = StaticGateway::recording();
        gateway.set_failing(true);

        assert!(gateway.resolve_identity(&ident("alice")).await.is_err());
        assert!(gateway.award_tokens(&ident("alice"), 1).await.is_err());
        assert!(gateway.calls().is_empty());
    }
}
