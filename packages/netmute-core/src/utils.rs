//! General utilities shared across the crate.

use crate::constants::LOG_TIMESTAMP_FORMAT;

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Source of wall-clock timestamps for log entries.
///
/// Injected into [`EventLog`](crate::events::EventLog) so tests can pin the
/// timestamp instead of depending on the system clock.
pub trait Clock: Send + Sync {
    /// Returns the current local time formatted as `HH:MM:SS`.
    fn now_hms(&self) -> String;
}

/// Clock backed by the system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_hms(&self) -> String {
        chrono::Local::now().format(LOG_TIMESTAMP_FORMAT).to_string()
    }
}

/// Clock that always reports the same time.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now_hms(&self) -> String {
        self.0.clone()
    }
}
