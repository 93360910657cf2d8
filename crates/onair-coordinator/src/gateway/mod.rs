//! Clients for the external account service
//!
//! [`HttpGateway`] talks to the real service over HTTP. [`StaticGateway`]
//! answers from memory and is used when no service is configured, and by
//! tests (built with [`StaticGateway::recording`]).

mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::{GatewayCall, StaticGateway};

use std::sync::Arc;

use onair_core::config::GatewayConfig;
use onair_core::traits::{IdentityStore, LedgerGateway};
use onair_core::GatewayError;

/// The collaborators the coordinator reaches out to
#[derive(Clone)]
pub struct Gateways {
    /// Identity and block-status lookup
    pub identities: Arc<dyn IdentityStore>,
    /// Live-duration accounting and token awards
    pub ledger: Arc<dyn LedgerGateway>,
}

impl Gateways {
    /// Use one implementation for both seams
    pub fn shared<G>(gateway: Arc<G>) -> Self
    where
        G: IdentityStore + LedgerGateway + 'static,
    {
        Self {
            identities: gateway.clone(),
            ledger: gateway,
        }
    }

    /// Build the gateways described by `config`.
    ///
    /// Without a base URL every identity resolves to a default profile and
    /// ledger calls are only logged.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        match &config.base_url {
            Some(base_url) => {
                tracing::info!("Using account service at {}", base_url);
                Ok(Self::shared(Arc::new(HttpGateway::new(
                    base_url,
                    config.request_timeout,
                    config.api_token.clone(),
                )?)))
            }
            None => {
                tracing::warn!("No account service configured, using in-memory gateway");
                Ok(Self::shared(Arc::new(StaticGateway::new())))
            }
        }
    }
}

impl Default for Gateways {
    fn default() -> Self {
        Self::shared(Arc::new(StaticGateway::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onair_core::Identity;
    use std::time::Duration;

    #[tokio::test]
    async fn test_from_config_without_url_is_static() {
        let gateways = Gateways::from_config(&GatewayConfig::default()).unwrap();
        let profile = gateways
            .identities
            .resolve_identity(&Identity::new("alice").unwrap())
            .await
            .unwrap();
        assert!(!profile.is_blocked);

        gateways
            .ledger
            .record_live_seconds(&Identity::new("alice").unwrap(), 60)
            .await
            .unwrap();
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = GatewayConfig {
            base_url: Some("not a url".to_string()),
            request_timeout: Duration::from_secs(1),
            api_token: None,
        };
        assert!(matches!(
            Gateways::from_config(&config),
            Err(GatewayError::Transport(_))
        ));
    }
}
