//! Single-observer adapter over a [`ConnectivityHost`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use super::host::{ConnectivityHost, HostCallback, RegistrationId};
use super::types::{ConnectivitySignal, HostNetworkEvent, NetworkFilter, NetworkIdentity};
use super::{ConnectivityError, ConnectivityResult};

// Observer panics are caught in `subscribe`; with `panic = "abort"` they would
// end the process instead.
#[cfg(panic = "abort")]
compile_error!("netmute-core must be built with panic = \"unwind\"");

/// Owns at most one host registration and turns raw host events into
/// [`ConnectivitySignal`]s.
///
/// Dropping the watcher unsubscribes.
pub struct ConnectivityWatcher {
    host: Arc<dyn ConnectivityHost>,
    filter: NetworkFilter,
    registration: Mutex<Option<RegistrationId>>,
}

impl ConnectivityWatcher {
    pub fn new(host: Arc<dyn ConnectivityHost>, filter: NetworkFilter) -> Self {
        Self {
            host,
            filter,
            registration: Mutex::new(None),
        }
    }

    /// Returns the filter the watcher registers with.
    #[must_use]
    pub fn filter(&self) -> &NetworkFilter {
        &self.filter
    }

    /// Returns true while an observer is registered.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.registration.lock().is_some()
    }

    /// Registers `on_signal` with the host.
    ///
    /// A panic inside `on_signal` is caught and logged so it never unwinds into
    /// the host's delivery thread.
    ///
    /// # Errors
    ///
    /// - [`ConnectivityError::AlreadySubscribed`] if an observer is registered
    /// - [`ConnectivityError::PermissionDenied`] if the host refuses access
    pub fn subscribe<F>(&self, on_signal: F) -> ConnectivityResult<()>
    where
        F: Fn(ConnectivitySignal) + Send + Sync + 'static,
    {
        let mut registration = self.registration.lock();
        if registration.is_some() {
            return Err(ConnectivityError::AlreadySubscribed);
        }

        let filter = self.filter.clone();
        let callback: HostCallback = Arc::new(move |event: HostNetworkEvent| {
            let Some(signal) = normalize(&filter, event) else {
                return;
            };
            if catch_unwind(AssertUnwindSafe(|| on_signal(signal))).is_err() {
                log::error!("[ConnectivityWatcher] Signal observer panicked");
            }
        });

        let id = self.host.register(&self.filter, callback)?;
        *registration = Some(id);
        log::info!("[ConnectivityWatcher] Network callback registered");
        Ok(())
    }

    /// Removes the registration, if any.
    ///
    /// Never fails: a registration the host no longer knows is logged and
    /// treated as removed. Calling this twice is harmless.
    pub fn unsubscribe(&self) {
        let Some(id) = self.registration.lock().take() else {
            log::info!("[ConnectivityWatcher] No network callback to unregister");
            return;
        };

        match self.host.unregister(id) {
            Ok(()) => log::info!("[ConnectivityWatcher] Network callback unregistered"),
            Err(ConnectivityError::NotRegistered) => {
                log::warn!("[ConnectivityWatcher] NetworkCallback was not registered or already unregistered");
            }
            Err(e) => log::warn!("[ConnectivityWatcher] Failed to unregister: {}", e),
        }
    }
}

impl Drop for ConnectivityWatcher {
    fn drop(&mut self) {
        if self.registration.get_mut().is_some() {
            self.unsubscribe();
        }
    }
}

/// Maps a raw host event onto a semantic signal.
///
/// - `Lost` is always forwarded.
/// - Without a transport scope, `Available` is an anonymous connection and
///   capability updates carry nothing new.
/// - With a transport scope, `Available` is pending until a capability update
///   the filter accepts supplies the network's identity.
pub(crate) fn normalize(
    filter: &NetworkFilter,
    event: HostNetworkEvent,
) -> Option<ConnectivitySignal> {
    match event {
        HostNetworkEvent::Lost => Some(ConnectivitySignal::Lost),
        HostNetworkEvent::Available if !filter.is_transport_scoped() => {
            Some(ConnectivitySignal::Connected {
                network: NetworkIdentity::Anonymous,
            })
        }
        HostNetworkEvent::Available => Some(ConnectivitySignal::Connected {
            network: NetworkIdentity::Unresolved,
        }),
        HostNetworkEvent::CapabilitiesChanged(_) if !filter.is_transport_scoped() => None,
        HostNetworkEvent::CapabilitiesChanged(capabilities) => {
            if !filter.accepts(&capabilities) {
                log::debug!(
                    "[ConnectivityWatcher] Ignoring capabilities outside filter: {:?}",
                    capabilities
                );
                return None;
            }
            let network = capabilities
                .known_ssid()
                .map_or(NetworkIdentity::Unresolved, |ssid| {
                    NetworkIdentity::Named(ssid.to_string())
                });
            Some(ConnectivitySignal::Connected { network })
        }
    }
}
