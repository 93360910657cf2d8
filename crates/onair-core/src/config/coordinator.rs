//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;

/// Configuration for the coordinator daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Address to bind the WebSocket server to
    pub bind_address: String,

    /// Countdown a broadcaster starts with
    #[serde(with = "duration_secs")]
    pub slot_duration: Duration,

    /// Time added when the vote meter reaches the top
    #[serde(with = "duration_secs")]
    pub vote_extension: Duration,

    /// How long an anonymous connection may stay silent before it is closed
    #[serde(with = "duration_secs")]
    pub idle_timeout: Duration,

    /// Tokens awarded to the broadcaster on each upper-threshold crossing
    pub reward_tokens: u64,

    /// Capacity of the coordinator's inbound command channel
    pub mailbox_capacity: usize,

    /// Notifications buffered per connection before it counts as stalled
    pub outbox_capacity: usize,

    /// Vote meter settings
    pub vote: VoteConfig,

    /// External store settings
    pub gateway: GatewayConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            slot_duration: Duration::from_secs(60),
            vote_extension: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(60 * 60),
            reward_tokens: 10,
            mailbox_capacity: 1024,
            outbox_capacity: 256,
            vote: VoteConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Interval between idle sweeps (half the idle timeout)
    pub fn reap_interval(&self) -> Duration {
        (self.idle_timeout / 2).max(Duration::from_secs(1))
    }

    /// Reject settings that would break the rotation invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_duration.as_secs() == 0 {
            return Err(ConfigError::Invalid(
                "slot_duration must be at least one second".to_string(),
            ));
        }
        if self.idle_timeout.as_secs() == 0 {
            return Err(ConfigError::Invalid(
                "idle_timeout must be at least one second".to_string(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "mailbox_capacity must be positive".to_string(),
            ));
        }
        if self.outbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "outbox_capacity must be positive".to_string(),
            ));
        }
        self.vote.validate()
    }
}

/// Vote meter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Position the meter resets to
    pub initial_position: f64,
    /// Step size the meter resets to
    pub initial_step: f64,
    /// Smallest step the meter halves down to
    pub min_step: f64,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            initial_position: 50.0,
            initial_step: 5.0,
            min_step: 0.01,
        }
    }
}

impl VoteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_position > 0.0 && self.initial_position < 100.0) {
            return Err(ConfigError::Invalid(format!(
                "vote.initial_position must lie strictly between 0 and 100, got {}",
                self.initial_position
            )));
        }
        if !(self.min_step > 0.0) || !self.min_step.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "vote.min_step must be positive, got {}",
                self.min_step
            )));
        }
        if !(self.initial_step >= self.min_step) || !self.initial_step.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "vote.initial_step must be at least vote.min_step, got {}",
                self.initial_step
            )));
        }
        Ok(())
    }
}

/// External store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the account service; `None` uses the in-memory gateway
    pub base_url: Option<String>,

    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Bearer token sent with every request
    pub api_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout: Duration::from_secs(5),
            api_token: None,
        }
    }
}
