//! Status notifier abstraction for decoupling the monitor from the desktop.
//!
//! The monitor depends on the [`StatusNotifier`] trait rather than a concrete
//! notification daemon, enabling testing and headless operation.

use std::collections::HashMap;

use parking_lot::Mutex;
use zbus::blocking::{connection, Connection};
use zbus::proxy;
use zbus::zvariant::Value;

/// Trait for showing a user-visible `(title, message)` notification.
///
/// Implementations hold no state the monitor relies on; a failed delivery is
/// logged and otherwise ignored.
pub trait StatusNotifier: Send + Sync {
    /// Shows a status notification.
    fn notify(&self, title: &str, message: &str);
}

/// No-op notifier for tests and embedded use.
pub struct NoopNotifier;

impl StatusNotifier for NoopNotifier {
    fn notify(&self, _title: &str, _message: &str) {
        // No-op
    }
}

/// Notifier that writes status changes to the process log.
///
/// Used by the daemon when desktop notifications are disabled.
pub struct LoggingNotifier;

impl StatusNotifier for LoggingNotifier {
    fn notify(&self, title: &str, message: &str) {
        log::info!("[Notify] {}: {}", title, message);
    }
}

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, &Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Bus the desktop notifier talks to.
#[derive(Debug, Clone)]
enum NotificationBus {
    Session,
    Address(String),
}

/// Desktop notifier for the freedesktop notification service on D-Bus.
///
/// Each status replaces the previous one, so the desktop shows a single
/// up-to-date status entry. The bus connection is opened on first use and
/// reopened after a failed call; failures are logged at warn level.
pub struct DesktopNotifier {
    app_name: String,
    bus: NotificationBus,
    proxy: Mutex<Option<NotificationsProxyBlocking<'static>>>,
    last_id: Mutex<u32>,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("netmute")
    }
}

impl DesktopNotifier {
    /// Creates a notifier on the session bus.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::with_bus(app_name.into(), NotificationBus::Session)
    }

    /// Creates a notifier on the bus at `address` (a D-Bus address string).
    pub fn with_address(app_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self::with_bus(app_name.into(), NotificationBus::Address(address.into()))
    }

    fn with_bus(app_name: String, bus: NotificationBus) -> Self {
        Self {
            app_name,
            bus,
            proxy: Mutex::new(None),
            last_id: Mutex::new(0),
        }
    }

    fn connect(&self) -> zbus::Result<NotificationsProxyBlocking<'static>> {
        let connection = match &self.bus {
            NotificationBus::Session => Connection::session()?,
            NotificationBus::Address(address) => {
                connection::Builder::address(address.as_str())?.build()?
            }
        };
        NotificationsProxyBlocking::new(&connection)
    }

    /// Shows a notification and returns the id the service assigned to it.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the service cannot be reached.
    pub fn try_notify(&self, title: &str, message: &str) -> zbus::Result<u32> {
        let mut proxy = self.proxy.lock();
        let notifications = match proxy.take() {
            Some(notifications) => notifications,
            None => self.connect()?,
        };

        let mut last_id = self.last_id.lock();
        let id = notifications.notify(
            &self.app_name,
            *last_id,
            "",
            title,
            message,
            &[],
            HashMap::new(),
            -1,
        )?;

        *last_id = id;
        *proxy = Some(notifications);
        Ok(id)
    }
}

impl StatusNotifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) {
        match self.try_notify(title, message) {
            Ok(id) => log::debug!("[Notify] Status notification {} shown: {}", id, message),
            Err(e) => log::warn!("[Notify] Failed to show notification: {}", e),
        }
    }
}
