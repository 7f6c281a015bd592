//! Centralized error types for the netmute core library.
//!
//! Each component defines its own `thiserror` enum next to the code that
//! raises it. This module ties them together:
//! - [`ErrorCode`] gives every error a stable machine-readable code
//! - [`NetmuteError`] is the crate-level error returned by bootstrap and
//!   convertible from every component error

use thiserror::Error;

use crate::connectivity::ConnectivityError;
use crate::services::MonitorError;
use crate::volume::VolumeError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for ConnectivityError {
    fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::AlreadySubscribed => "already_subscribed",
            Self::NotRegistered => "already_unsubscribed",
            Self::Host(_) => "connectivity_host_error",
        }
    }
}

impl ErrorCode for VolumeError {
    fn code(&self) -> &'static str {
        match self {
            Self::AudioUnavailable(_) | Self::PreferencesUnavailable(_) => "store_unavailable",
        }
    }
}

impl ErrorCode for MonitorError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_state",
            Self::UnknownAction(_) => "unknown_action",
            Self::Connectivity(e) => e.code(),
            Self::Volume(e) => e.code(),
        }
    }
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum NetmuteError {
    /// Registering with or deregistering from the connectivity host failed.
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    /// Audio output or preference store unreachable.
    #[error(transparent)]
    StoreUnavailable(#[from] VolumeError),

    /// Operation not valid in the monitor's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl NetmuteError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connectivity(e) => e.code(),
            Self::StoreUnavailable(e) => e.code(),
            Self::InvalidState(_) => "invalid_state",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

impl From<MonitorError> for NetmuteError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Connectivity(e) => Self::Connectivity(e),
            MonitorError::Volume(e) => Self::StoreUnavailable(e),
            other @ (MonitorError::InvalidTransition { .. } | MonitorError::UnknownAction(_)) => {
                Self::InvalidState(other.to_string())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

pub use crate::connectivity::ConnectivityResult;
pub use crate::services::MonitorResult;
pub use crate::volume::VolumeResult;

/// Convenient Result alias for application-wide operations.
pub type NetmuteResult<T> = Result<T, NetmuteError>;
