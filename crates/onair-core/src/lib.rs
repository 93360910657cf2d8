//! onair-core: Core abstractions and configuration for onair
//!
//! This crate provides the domain types, error taxonomy, configuration
//! structures and external-collaborator traits shared by the coordinator
//! library and binary.

pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{ConfigError, CoordinatorError, GatewayError};
pub use types::{Identity, IdentityProfile, Priority, TerminationCause};
