//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the one place where the event log,
//! volume store, watcher and monitor are built and wired together. Platform
//! collaborators come in through [`HostBackends`], so an embedder (or a test)
//! swaps any of them without touching the services.

use std::sync::Arc;

use crate::config::Config;
use crate::connectivity::{ConnectivityHost, ConnectivityWatcher};
use crate::error::{NetmuteError, NetmuteResult};
use crate::events::{EventLog, StatusNotifier};
use crate::lifecycle::ForegroundService;
use crate::services::{LifecycleState, MonitorController};
use crate::utils::SystemClock;
use crate::volume::{AudioOutput, PreferenceStore, VolumeStore};

/// Platform collaborators the core services run against.
pub struct HostBackends {
    pub audio: Arc<dyn AudioOutput>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub connectivity: Arc<dyn ConnectivityHost>,
    pub foreground: Arc<dyn ForegroundService>,
    pub notifier: Arc<dyn StatusNotifier>,
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Shared diagnostic log.
    pub event_log: Arc<EventLog>,
    /// Baseline persistence and mute/restore.
    pub volume_store: Arc<VolumeStore>,
    /// Connectivity observer owned by the controller while monitoring.
    pub watcher: Arc<ConnectivityWatcher>,
    /// Monitor lifecycle and signal handling.
    pub controller: Arc<MonitorController>,
}

impl BootstrappedServices {
    /// Stops monitoring if it is running.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning shutdown...");

        if self.controller.lifecycle() != LifecycleState::Stopped {
            if let Err(e) = self.controller.stop() {
                log::warn!("[Bootstrap] Failed to stop monitor: {}", e);
            }
        }

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services with their dependencies.
///
/// # Errors
///
/// Returns [`NetmuteError::Configuration`] if `config` fails validation.
pub fn bootstrap_services(config: &Config, backends: HostBackends) -> NetmuteResult<BootstrappedServices> {
    config.validate().map_err(NetmuteError::Configuration)?;

    let event_log = Arc::new(EventLog::with_clock(
        Arc::new(SystemClock),
        config.event_channel_capacity,
    ));

    let volume_store = Arc::new(VolumeStore::new(
        backends.audio,
        backends.preferences,
        Arc::clone(&event_log),
        config.default_baseline_volume,
    ));

    let watcher = Arc::new(ConnectivityWatcher::new(
        backends.connectivity,
        config.network_filter(),
    ));

    let controller = Arc::new(MonitorController::new(
        Arc::clone(&watcher),
        Arc::clone(&volume_store),
        Arc::clone(&event_log),
        backends.foreground,
        backends.notifier,
        config.notification_title.clone(),
        config.notification_description.clone(),
    ));

    log::info!(
        "[Bootstrap] Services ready (filter: {:?}, default baseline: {})",
        watcher.filter(),
        config.default_baseline_volume
    );

    Ok(BootstrappedServices {
        event_log,
        volume_store,
        watcher,
        controller,
    })
}
