//! Diagnostic event log and user-visible status notifications.
//!
//! - [`EventLog`]: the shared, observable record of what the monitor did.
//! - [`StatusNotifier`]: delivery of short status messages to the user.

pub mod event_log;
pub mod notifier;

pub use event_log::{EventLog, LogEntry, LogSnapshot};
pub use notifier::{DesktopNotifier, LoggingNotifier, NoopNotifier, StatusNotifier};
