//! Core trait definitions

mod gateway;

pub use gateway::{IdentityStore, LedgerGateway};
