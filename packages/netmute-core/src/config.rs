//! Core configuration.

use serde::{Deserialize, Serialize};

use crate::connectivity::{NetworkFilter, Transport};
use crate::constants::{
    DEFAULT_BASELINE_VOLUME, DEFAULT_NOTIFICATION_DESCRIPTION, DEFAULT_NOTIFICATION_TITLE,
    EVENT_CHANNEL_CAPACITY,
};

/// Configuration for the netmute core services.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Baseline restored when none has been saved yet. Clamped to the audio
    /// device's maximum at use.
    pub default_baseline_volume: u32,

    /// Transport the watcher is scoped to. `None` watches any network.
    pub transport: Option<Transport>,

    /// Only networks with internet access count as connected.
    pub require_internet: bool,

    /// Capacity of the event log's snapshot broadcast channel.
    pub event_channel_capacity: usize,

    /// Title of the ongoing indicator and of status notifications.
    pub notification_title: String,

    /// Body of the ongoing indicator.
    pub notification_description: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_baseline_volume: DEFAULT_BASELINE_VOLUME,
            transport: Some(Transport::Wifi),
            require_internet: true,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            notification_description: DEFAULT_NOTIFICATION_DESCRIPTION.to_string(),
        }
    }
}

impl Config {
    /// Validates configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.notification_title.trim().is_empty() {
            return Err("notification_title must not be empty".to_string());
        }
        Ok(())
    }

    /// Returns the filter the connectivity watcher registers with.
    #[must_use]
    pub fn network_filter(&self) -> NetworkFilter {
        NetworkFilter {
            transport: self.transport,
            require_internet: self.require_internet,
        }
    }
}
