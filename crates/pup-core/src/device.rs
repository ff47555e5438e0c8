//! Device records and the lifecycle state machine
//!
//! A device starts out `Unset`. The first accepted transition moves it to
//! `Set(value)`, and from there no transition is accepted:
//!
//! ```text
//! Unset ──transition("", new)──▶ Set(new)
//! Set(_) ──any transition──▶ InvalidState
//! ```
//!
//! Every transition also carries the caller's view of the current state;
//! a stale view is rejected with `StateMismatch` before the machine rule
//! is consulted.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle state of a device. Stored and sent over the wire as a plain
/// string where `""` means `Unset`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceState {
    #[default]
    Unset,
    Set(String),
}

impl DeviceState {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Unset => "",
            DeviceState::Set(value) => value,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, DeviceState::Unset)
    }
}

impl From<String> for DeviceState {
    fn from(value: String) -> Self {
        if value.is_empty() {
            DeviceState::Unset
        } else {
            DeviceState::Set(value)
        }
    }
}

impl From<&str> for DeviceState {
    fn from(value: &str) -> Self {
        DeviceState::from(value.to_string())
    }
}

impl From<DeviceState> for String {
    fn from(state: DeviceState) -> Self {
        match state {
            DeviceState::Unset => String::new(),
            DeviceState::Set(value) => value,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejections produced by [`Device::transition`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("mismatched current state={expected:?} actual={actual:?}")]
    StateMismatch { expected: String, actual: String },

    #[error("invalid or unknown state {current:?}")]
    InvalidState { current: String },
}

/// Persisted identity and state of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub state: DeviceState,
}

impl Device {
    /// A device that has never been written
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: DeviceState::Unset,
        }
    }

    pub fn with_state(id: impl Into<String>, state: impl Into<DeviceState>) -> Self {
        Self {
            id: id.into(),
            state: state.into(),
        }
    }

    /// Compare-and-swap the device state.
    ///
    /// `expected` must equal the current state exactly. An `Unset` device
    /// accepts any `new` value; a `Set` device accepts nothing. The record
    /// is left untouched on error.
    pub fn transition(&mut self, expected: &str, new: &str) -> Result<(), TransitionError> {
        if self.state.as_str() != expected {
            return Err(TransitionError::StateMismatch {
                expected: expected.to_string(),
                actual: self.state.to_string(),
            });
        }

        match &self.state {
            DeviceState::Unset => {
                self.state = DeviceState::from(new);
                Ok(())
            }
            DeviceState::Set(current) => Err(TransitionError::InvalidState {
                current: current.clone(),
            }),
        }
    }
}

/// Body of `PUT /devices/{id}/state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub cur: String,
    pub new: String,
}
