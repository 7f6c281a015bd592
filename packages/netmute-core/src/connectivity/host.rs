//! Host connectivity subsystem abstraction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::types::{HostNetworkEvent, NetworkFilter};
use super::{ConnectivityError, ConnectivityResult};

/// Callback invoked by the host for every raw event of a registration.
pub type HostCallback = Arc<dyn Fn(HostNetworkEvent) + Send + Sync>;

/// Handle of one observer registration with a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

/// Host connectivity subsystem.
///
/// Implementations deliver events asynchronously: a callback must never run on
/// the thread that is inside `register` or `unregister`. The monitor holds its
/// state lock across both calls, so a synchronous delivery would deadlock.
pub trait ConnectivityHost: Send + Sync {
    /// Registers `callback` for networks matching `filter`.
    ///
    /// Returns [`ConnectivityError::PermissionDenied`] when the process may not
    /// observe connectivity.
    fn register(
        &self,
        filter: &NetworkFilter,
        callback: HostCallback,
    ) -> ConnectivityResult<RegistrationId>;

    /// Removes a registration.
    ///
    /// Returns [`ConnectivityError::NotRegistered`] if `id` is unknown. Events
    /// already in flight may still be delivered after this returns.
    fn unregister(&self, id: RegistrationId) -> ConnectivityResult<()>;
}

/// Host whose events are pushed by the embedder.
///
/// Platform glue that already receives connectivity callbacks (or a test)
/// forwards them through [`emit`](Self::emit). Permission can be withdrawn to
/// exercise the startup failure path.
pub struct ManualConnectivityHost {
    registrations: DashMap<RegistrationId, HostCallback>,
    next_id: AtomicU64,
    permission_granted: AtomicBool,
}

impl Default for ManualConnectivityHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualConnectivityHost {
    pub fn new() -> Self {
        Self {
            registrations: DashMap::new(),
            next_id: AtomicU64::new(1),
            permission_granted: AtomicBool::new(true),
        }
    }

    /// Controls whether subsequent registrations are allowed.
    pub fn set_permission_granted(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// Returns the number of live registrations.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// Delivers `event` to every registration on the calling thread.
    ///
    /// Callbacks run after the registration table is released, so a callback
    /// may itself unregister.
    pub fn emit(&self, event: HostNetworkEvent) {
        let callbacks: Vec<HostCallback> = self
            .registrations
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        log::debug!(
            "[ManualHost] Delivering {:?} to {} observer(s)",
            event,
            callbacks.len()
        );
        for callback in callbacks {
            callback(event.clone());
        }
    }
}

impl ConnectivityHost for ManualConnectivityHost {
    fn register(
        &self,
        filter: &NetworkFilter,
        callback: HostCallback,
    ) -> ConnectivityResult<RegistrationId> {
        if !self.permission_granted.load(Ordering::SeqCst) {
            return Err(ConnectivityError::PermissionDenied(
                "network state access not granted".to_string(),
            ));
        }

        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.registrations.insert(id, callback);
        log::debug!("[ManualHost] Registered {:?} with {:?}", id, filter);
        Ok(id)
    }

    fn unregister(&self, id: RegistrationId) -> ConnectivityResult<()> {
        self.registrations
            .remove(&id)
            .map(|_| ())
            .ok_or(ConnectivityError::NotRegistered)
    }
}
