//! Foreground service abstraction and monitor commands.
//!
//! While monitoring, the host is told that a long-running service is active
//! (an ongoing notification, a tray entry, a systemd status line). The
//! [`ForegroundService`] trait decouples the monitor from how that is shown.

use std::fmt;
use std::str::FromStr;

use crate::constants::{ACTION_START_MONITORING, ACTION_STOP_MONITORING};

/// Trait for announcing that long-running monitoring is active.
///
/// `begin` is called before the connectivity observer is registered and `end`
/// after it is removed, including when registration fails.
pub trait ForegroundService: Send + Sync {
    /// Shows the ongoing indicator.
    fn begin(&self, title: &str, message: &str);

    /// Removes the ongoing indicator.
    fn end(&self);
}

/// Foreground service that records begin/end in the process log.
pub struct LoggingForeground;

impl ForegroundService for LoggingForeground {
    fn begin(&self, title: &str, message: &str) {
        log::info!("[Foreground] {}: {}", title, message);
    }

    fn end(&self) {
        log::info!("[Foreground] Ended");
    }
}

/// No-op foreground service for tests or embedded use.
pub struct NoopForeground;

impl ForegroundService for NoopForeground {
    fn begin(&self, _title: &str, _message: &str) {
        log::debug!("[Foreground] Begin requested (no-op)");
    }

    fn end(&self) {
        log::debug!("[Foreground] End requested (no-op)");
    }
}

/// Command delivered to the monitor by action identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    StartMonitoring,
    StopMonitoring,
}

impl MonitorCommand {
    /// Returns the opaque action identifier of this command.
    #[must_use]
    pub fn action(self) -> &'static str {
        match self {
            Self::StartMonitoring => ACTION_START_MONITORING,
            Self::StopMonitoring => ACTION_STOP_MONITORING,
        }
    }
}

impl fmt::Display for MonitorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

impl FromStr for MonitorCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ACTION_START_MONITORING => Ok(Self::StartMonitoring),
            ACTION_STOP_MONITORING => Ok(Self::StopMonitoring),
            other => Err(other.to_string()),
        }
    }
}
