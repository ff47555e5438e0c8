//! Core types for pupcycler
//!
//! # Modules
//!
//! - `auth`: Token allow-list and constant-time authenticator
//! - `config`: Environment file loader
//! - `device`: Device records and the lifecycle state machine
//! - `error`: Error taxonomy and Result alias

pub mod auth;
pub mod config;
pub mod device;
pub mod error;

// Re-exports
pub use auth::{AuthError, AuthTokens, Authenticator};
pub use device::{Device, DeviceState, TransitionError, TransitionRequest};
pub use error::{Error, Result};
