//! HTTP client for the account service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::json;

use onair_core::traits::{IdentityStore, LedgerGateway};
use onair_core::{GatewayError, Identity, IdentityProfile};

/// JSON client for the account service
///
/// Routes, relative to the base URL:
///
/// - `GET /identities/{name}` returns the identity's profile; 404 means the
///   store has never heard of it
/// - `POST /identities/{name}/live-seconds` with `{"seconds": n}`
/// - `POST /identities/{name}/tokens` with `{"amount": n}`
#[derive(Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpGateway {
    /// Create a client for the service at `base_url`
    pub fn new(
        base_url: &str,
        timeout: Duration,
        api_token: Option<String>,
    ) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Transport(format!("invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "base URL {} cannot carry a path",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;

        Ok(Self {
            http,
            base_url,
            api_token,
        })
    }

    fn endpoint(&self, identity: &Identity, action: Option<&str>) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| GatewayError::Transport("base URL cannot carry a path".to_string()))?;
            segments.pop_if_empty().push("identities").push(identity.as_str());
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post(&self, url: Url, body: serde_json::Value) -> Result<(), GatewayError> {
        let response = self
            .authorize(self.http.post(url))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        ensure_success(response).await.map(|_| ())
    }
}

#[async_trait]
impl IdentityStore for HttpGateway {
    async fn resolve_identity(&self, identity: &Identity) -> Result<IdentityProfile, GatewayError> {
        let url = self.endpoint(identity, None)?;
        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Identity {} unknown to the store", identity);
            return Ok(IdentityProfile::default());
        }

        ensure_success(response)
            .await?
            .json::<IdentityProfile>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LedgerGateway for HttpGateway {
    async fn record_live_seconds(
        &self,
        identity: &Identity,
        seconds: u64,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(identity, Some("live-seconds"))?;
        self.post(url, json!({ "seconds": seconds })).await
    }

    async fn award_tokens(&self, identity: &Identity, amount: u64) -> Result<(), GatewayError> {
        let url = self.endpoint(identity, Some("tokens"))?;
        self.post(url, json!({ "amount": amount })).await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(GatewayError::Upstream {
        status: status.as_u16(),
        message,
    })
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}
