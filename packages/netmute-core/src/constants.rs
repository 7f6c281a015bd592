//! Fixed values shared by the core services.
//!
//! Tunable behavior lives in [`Config`](crate::config::Config); the values
//! here name persisted keys and wire identifiers that must stay stable across
//! releases.

// ─────────────────────────────────────────────────────────────────────────────
// Persisted Preferences
// ─────────────────────────────────────────────────────────────────────────────

/// Namespace of the preference store holding the baseline volume.
///
/// File-backed stores use it as the file stem (`MediaVolume.json`).
pub const PREFERENCES_NAMESPACE: &str = "MediaVolume";

/// Key of the persisted baseline volume inside [`PREFERENCES_NAMESPACE`].
pub const VOLUME_KEY: &str = "volume";

/// Baseline volume restored when none has been saved yet.
pub const DEFAULT_BASELINE_VOLUME: u32 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Foreground Service Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Action identifier that starts connectivity monitoring.
pub const ACTION_START_MONITORING: &str = "START_MONITORING";

/// Action identifier that stops connectivity monitoring.
pub const ACTION_STOP_MONITORING: &str = "STOP_MONITORING";

// ─────────────────────────────────────────────────────────────────────────────
// Status Notifications
// ─────────────────────────────────────────────────────────────────────────────

/// Status message shown after the media volume has been restored.
pub const STATUS_NORMAL: &str = "normal";

/// Status message shown after the media volume has been muted.
pub const STATUS_SILENT: &str = "silent";

/// Default title of the ongoing and status notifications.
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Media Volume Muter";

/// Default body of the ongoing notification shown while monitoring.
pub const DEFAULT_NOTIFICATION_DESCRIPTION: &str =
    "Mutes media volume while the network is unavailable";

// ─────────────────────────────────────────────────────────────────────────────
// Event Log
// ─────────────────────────────────────────────────────────────────────────────

/// Default capacity of the event log's snapshot broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// `chrono` format string for log entry timestamps.
pub const LOG_TIMESTAMP_FORMAT: &str = "%H:%M:%S";

// ─────────────────────────────────────────────────────────────────────────────
// Connectivity
// ─────────────────────────────────────────────────────────────────────────────

/// SSID reported by hosts that are not allowed to reveal the network name.
pub const UNKNOWN_SSID: &str = "<unknown ssid>";
