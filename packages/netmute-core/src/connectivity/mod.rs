//! Connectivity observation.
//!
//! The host connectivity subsystem reports raw [`HostNetworkEvent`]s through a
//! [`ConnectivityHost`]. The [`ConnectivityWatcher`] owns the single
//! registration with the host and normalizes those events into the two
//! semantic [`ConnectivitySignal`]s the monitor reacts to.
//!
//! Two hosts are bundled:
//!
//! - [`ManualConnectivityHost`]: events are pushed by the embedder
//! - [`ProbeConnectivityHost`]: events come from a periodic reachability probe,
//!   with the link described by a [`LinkResolver`] such as
//!   [`NetworkManagerResolver`]

pub mod host;
pub mod network_manager;
pub mod probe;
pub mod types;
pub mod watcher;

use thiserror::Error;

pub use host::{ConnectivityHost, HostCallback, ManualConnectivityHost, RegistrationId};
pub use network_manager::NetworkManagerResolver;
pub use probe::{LinkResolver, ProbeConfig, ProbeConnectivityHost, UnknownLinkResolver};
pub use types::{
    ConnectivitySignal, HostNetworkEvent, NetworkCapabilities, NetworkFilter, NetworkIdentity,
    Transport,
};
pub use watcher::ConnectivityWatcher;

/// Errors raised while registering with or deregistering from the host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    /// The process is not authorized to observe connectivity.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The watcher already has an observer registered.
    #[error("Network callback already registered")]
    AlreadySubscribed,

    /// The host does not know the registration (never made or already removed).
    #[error("Network callback was not registered or already unregistered")]
    NotRegistered,

    /// Any other host failure.
    #[error("Connectivity host error: {0}")]
    Host(String),
}

/// Result alias for connectivity operations.
pub type ConnectivityResult<T> = Result<T, ConnectivityError>;
