//! Netmute Core - mutes media volume while the network is away.
//!
//! The crate watches host connectivity and mutes the media output when the
//! network is lost, restoring a user-saved baseline volume when it returns.
//! It is designed to be embedded by a daemon or any host that can supply the
//! platform collaborators.
//!
//! # Architecture
//!
//! - [`events`]: shared diagnostic [`EventLog`] and status notifications
//! - [`volume`]: [`VolumeStore`], the baseline and the mute/restore transform
//! - [`connectivity`]: host abstraction and the [`ConnectivityWatcher`]
//! - [`services`]: the [`MonitorController`] state machine
//! - [`bootstrap`]: the composition root
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! Core logic is decoupled from the platform through these traits:
//!
//! - [`ConnectivityHost`](connectivity::ConnectivityHost): network state callbacks
//! - [`AudioOutput`](volume::AudioOutput): media volume of the output device
//! - [`PreferenceStore`](volume::PreferenceStore): persisted integer preferences
//! - [`ForegroundService`](lifecycle::ForegroundService): ongoing monitoring indicator
//! - [`StatusNotifier`](events::StatusNotifier): user-visible status messages
//!
//! Each trait has bundled implementations for Linux desktops (PipeWire,
//! NetworkManager and desktop notifications over D-Bus) and in-memory ones
//! for tests.

#![warn(clippy::all)]

pub mod bootstrap;
pub mod config;
pub mod connectivity;
pub mod constants;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod services;
pub mod utils;
pub mod volume;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use connectivity::{
    ConnectivityError, ConnectivityHost, ConnectivitySignal, ConnectivityWatcher,
    ManualConnectivityHost, NetworkFilter, NetworkIdentity, ProbeConfig, ProbeConnectivityHost,
    Transport,
};
pub use error::{
    ConnectivityResult, ErrorCode, MonitorResult, NetmuteError, NetmuteResult, VolumeResult,
};
pub use events::{EventLog, LogEntry, LogSnapshot, StatusNotifier};
pub use lifecycle::{ForegroundService, MonitorCommand};
pub use services::{LifecycleState, MonitorController, MonitorError, MonitorStatus, MuteState};
pub use utils::{Clock, SystemClock};
pub use volume::{AudioOutput, PreferenceStore, VolumeError, VolumeStore};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices, HostBackends};
