//! Monitor controller: connectivity signals in, mute/restore out.
//!
//! The controller owns the watcher's registration for as long as monitoring
//! runs and turns every [`ConnectivitySignal`] into a volume change, an event
//! log entry and a status notification.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::connectivity::{ConnectivityError, ConnectivitySignal, ConnectivityWatcher, NetworkIdentity};
use crate::constants::{STATUS_NORMAL, STATUS_SILENT};
use crate::events::{EventLog, StatusNotifier};
use crate::lifecycle::{ForegroundService, MonitorCommand};
use crate::volume::{VolumeError, VolumeStore};

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a [`MonitorController`].
///
/// `Stopped → Starting → Monitoring → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Monitoring,
    Stopping,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Monitoring => "monitoring",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Mute state last applied to the device by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteState {
    Muted,
    Unmuted,
}

/// Point-in-time view of the monitor, for status reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStatus {
    pub lifecycle: LifecycleState,
    /// `None` until a signal has been applied in the current monitoring run.
    pub mute: Option<MuteState>,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleState::Stopped,
            mute: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by [`MonitorController`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// The requested operation is not valid in the current lifecycle state.
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: LifecycleState,
        action: &'static str,
    },

    /// An action identifier that maps to no command.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// Result alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

/// Drives mute/restore from connectivity signals.
///
/// # Concurrency design
///
/// One `status` lock is held for the whole of `start`, `stop` and each
/// signal's handling. A signal therefore sees the lifecycle either before or
/// after a transition, never in between, and a signal arriving after `stop`
/// returns is discarded.
///
/// The registered callback holds a `Weak` reference, so the host's
/// registration table never keeps the controller alive.
pub struct MonitorController {
    watcher: Arc<ConnectivityWatcher>,
    volume_store: Arc<VolumeStore>,
    event_log: Arc<EventLog>,
    foreground: Arc<dyn ForegroundService>,
    notifier: Arc<dyn StatusNotifier>,
    title: String,
    description: String,
    status: Mutex<MonitorStatus>,
}

impl MonitorController {
    /// Creates a stopped controller.
    ///
    /// `title` and `description` are used for the ongoing foreground indicator;
    /// `title` also heads every status notification.
    pub fn new(
        watcher: Arc<ConnectivityWatcher>,
        volume_store: Arc<VolumeStore>,
        event_log: Arc<EventLog>,
        foreground: Arc<dyn ForegroundService>,
        notifier: Arc<dyn StatusNotifier>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            watcher,
            volume_store,
            event_log,
            foreground,
            notifier,
            title: title.into(),
            description: description.into(),
            status: Mutex::new(MonitorStatus::default()),
        }
    }

    /// Returns the current lifecycle and last applied mute state.
    #[must_use]
    pub fn status(&self) -> MonitorStatus {
        *self.status.lock()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleState {
        self.status.lock().lifecycle
    }

    /// Starts monitoring.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::InvalidTransition`] unless stopped
    /// - [`MonitorError::Connectivity`] if the watcher could not register; the
    ///   controller is back in `Stopped` and the foreground indicator removed
    pub fn start(self: &Arc<Self>) -> MonitorResult<()> {
        let mut status = self.status.lock();
        if status.lifecycle != LifecycleState::Stopped {
            return Err(MonitorError::InvalidTransition {
                from: status.lifecycle,
                action: "start",
            });
        }

        status.lifecycle = LifecycleState::Starting;
        self.foreground.begin(&self.title, &self.description);

        let controller = Arc::downgrade(self);
        let subscribed = self.watcher.subscribe(move |signal| {
            if let Some(controller) = controller.upgrade() {
                controller.handle_signal(signal);
            }
        });

        match subscribed {
            Ok(()) => {
                status.lifecycle = LifecycleState::Monitoring;
                log::info!("[Monitor] Network monitoring started");
                self.event_log.append("Network monitoring started");
                Ok(())
            }
            Err(e) => {
                self.foreground.end();
                status.lifecycle = LifecycleState::Stopped;
                log::error!("[Monitor] Failed to start network monitoring: {}", e);
                self.event_log
                    .append(format!("Failed to start network monitoring: {e}"));
                Err(e.into())
            }
        }
    }

    /// Stops monitoring.
    ///
    /// Valid while starting or monitoring. The device volume is left as it is.
    pub fn stop(&self) -> MonitorResult<()> {
        let mut status = self.status.lock();
        match status.lifecycle {
            LifecycleState::Monitoring | LifecycleState::Starting => {}
            from => {
                return Err(MonitorError::InvalidTransition {
                    from,
                    action: "stop",
                })
            }
        }

        status.lifecycle = LifecycleState::Stopping;
        self.watcher.unsubscribe();
        self.foreground.end();

        log::info!("[Monitor] Network monitoring stopped");
        self.event_log.append("Network monitoring stopped");
        *status = MonitorStatus::default();
        Ok(())
    }

    /// Applies one connectivity signal.
    ///
    /// Discarded unless monitoring. Volume failures are recorded in the event
    /// log and do not stop monitoring.
    pub fn handle_signal(&self, signal: ConnectivitySignal) {
        let mut status = self.status.lock();
        if status.lifecycle != LifecycleState::Monitoring {
            log::debug!(
                "[Monitor] Discarding {:?} while {}",
                signal,
                status.lifecycle
            );
            return;
        }

        let (muted, message) = match signal {
            ConnectivitySignal::Connected {
                network: NetworkIdentity::Named(name),
            } => (false, format!("Network Available: {name}")),
            ConnectivitySignal::Connected {
                network: NetworkIdentity::Anonymous,
            } => (false, "Network Available".to_string()),
            ConnectivitySignal::Connected {
                network: NetworkIdentity::Unresolved,
            } => (
                true,
                "Network Available, waiting for network details".to_string(),
            ),
            ConnectivitySignal::Lost => (true, "Network Lost".to_string()),
        };

        log::info!("[Monitor] {}", message);
        self.event_log.append(message);

        let applied = self
            .volume_store
            .current_volume()
            .and_then(|current| self.volume_store.apply_mute(muted, current));

        match applied {
            Ok(volume) => {
                log::debug!("[Monitor] Media volume now {}", volume);
                let (state, text) = if muted {
                    (MuteState::Muted, STATUS_SILENT)
                } else {
                    (MuteState::Unmuted, STATUS_NORMAL)
                };
                status.mute = Some(state);
                self.notifier.notify(&self.title, text);
            }
            Err(e) => {
                log::warn!("[Monitor] Failed to change media volume: {}", e);
                self.event_log
                    .append(format!("Failed to change media volume: {e}"));
            }
        }
    }

    /// Saves the live device volume as the new baseline.
    ///
    /// Allowed in any lifecycle state. Returns `(saved, previous)`.
    pub fn save_volume(&self) -> MonitorResult<(u32, u32)> {
        let (saved, previous) = self.volume_store.save_current_volume().map_err(|e| {
            log::warn!("[Monitor] Failed to save volume: {}", e);
            e
        })?;

        self.notifier.notify(
            &self.title,
            &format!("Saved volume {saved} (previous {previous})"),
        );
        Ok((saved, previous))
    }

    /// Dispatches a start or stop command.
    pub fn handle_command(self: &Arc<Self>, command: MonitorCommand) -> MonitorResult<()> {
        log::debug!("[Monitor] Command {}", command);
        match command {
            MonitorCommand::StartMonitoring => self.start(),
            MonitorCommand::StopMonitoring => self.stop(),
        }
    }

    /// Dispatches a command given by its action identifier.
    ///
    /// # Errors
    ///
    /// [`MonitorError::UnknownAction`] for identifiers other than
    /// `START_MONITORING` and `STOP_MONITORING`.
    pub fn handle_action(self: &Arc<Self>, action: &str) -> MonitorResult<()> {
        let command = action
            .parse::<MonitorCommand>()
            .map_err(MonitorError::UnknownAction)?;
        self.handle_command(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{
        ConnectivityHost, ConnectivityResult, HostCallback, HostNetworkEvent,
        ManualConnectivityHost, NetworkCapabilities, NetworkFilter, RegistrationId, Transport,
    };
    use crate::events::notifier::tests::RecordingNotifier;
    use crate::lifecycle::tests::RecordingForeground;
    use crate::utils::FixedClock;
    use crate::volume::{AudioOutput, InMemoryPreferences, PreferenceStore, VirtualAudioOutput};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicBool, Ordering};

    const TITLE: &str = "Media Volume Muter";

    struct Harness {
        host: Arc<ManualConnectivityHost>,
        audio: Arc<VirtualAudioOutput>,
        store: Arc<VolumeStore>,
        log: Arc<EventLog>,
        notifier: Arc<RecordingNotifier>,
        foreground: Arc<RecordingForeground>,
        controller: Arc<MonitorController>,
    }

    impl Harness {
        fn new(filter: NetworkFilter, initial_volume: u32) -> Self {
            Self::with_notifier(filter, initial_volume, Arc::new(RecordingNotifier::default()))
        }

        fn with_notifier(
            filter: NetworkFilter,
            initial_volume: u32,
            notifier: Arc<RecordingNotifier>,
        ) -> Self {
            let host = Arc::new(ManualConnectivityHost::new());
            let audio = Arc::new(VirtualAudioOutput::new(initial_volume, 15));
            let log = Arc::new(EventLog::with_clock(
                Arc::new(FixedClock("12:00:00".into())),
                64,
            ));
            let store = Arc::new(VolumeStore::new(
                Arc::clone(&audio) as Arc<dyn AudioOutput>,
                Arc::new(InMemoryPreferences::new()) as Arc<dyn PreferenceStore>,
                Arc::clone(&log),
                10,
            ));
            let watcher = Arc::new(ConnectivityWatcher::new(
                Arc::clone(&host) as Arc<dyn ConnectivityHost>,
                filter,
            ));
            let foreground = Arc::new(RecordingForeground::default());
            let controller = Arc::new(MonitorController::new(
                watcher,
                Arc::clone(&store),
                Arc::clone(&log),
                Arc::clone(&foreground) as Arc<dyn ForegroundService>,
                Arc::clone(&notifier) as Arc<dyn StatusNotifier>,
                TITLE,
                "watching",
            ));
            Self {
                host,
                audio,
                store,
                log,
                notifier,
                foreground,
                controller,
            }
        }

        fn volume(&self) -> u32 {
            self.audio.volume().unwrap()
        }

        fn messages(&self) -> Vec<String> {
            self.log
                .snapshot()
                .iter()
                .map(|e| e.message.clone())
                .collect()
        }

        fn wifi(&self, ssid: &str) {
            self.host.emit(HostNetworkEvent::Available);
            self.host
                .emit(HostNetworkEvent::CapabilitiesChanged(NetworkCapabilities {
                    transport: Transport::Wifi,
                    has_internet: true,
                    ssid: Some(ssid.to_string()),
                }));
        }
    }

    #[test]
    fn save_and_restore_scenario() {
        let h = Harness::new(NetworkFilter::wifi_internet(), 4);
        h.controller.start().unwrap();

        h.host.emit(HostNetworkEvent::Lost);
        assert_eq!(h.volume(), 0);
        assert!(h.messages().contains(&"Network Lost".to_string()));

        h.wifi("Home");
        assert_eq!(h.volume(), 10);
        assert!(h.messages().iter().any(|m| m.contains("Home")));

        h.audio.set_volume(7).unwrap();
        assert_eq!(h.controller.save_volume().unwrap(), (7, 10));
        assert_eq!(h.store.baseline().unwrap(), 7);

        h.host.emit(HostNetworkEvent::Lost);
        assert_eq!(h.volume(), 0);
        h.wifi("Home");
        assert_eq!(h.volume(), 7);

        assert_eq!(
            h.notifier.messages(),
            vec![
                "silent",
                "silent",
                "normal",
                "Saved volume 7 (previous 10)",
                "silent",
                "silent",
                "normal",
            ]
        );
    }

    #[test]
    fn start_and_stop_drive_foreground_and_log() {
        let h = Harness::new(NetworkFilter::default(), 5);

        h.controller.start().unwrap();
        assert_eq!(h.controller.lifecycle(), LifecycleState::Monitoring);
        assert_eq!(h.host.registration_count(), 1);

        h.controller.stop().unwrap();
        assert_eq!(h.controller.status(), MonitorStatus::default());
        assert_eq!(h.host.registration_count(), 0);

        assert_eq!(
            h.foreground.calls(),
            vec![format!("begin {TITLE}: watching"), "end".to_string()]
        );
        assert_eq!(
            h.messages(),
            vec!["Network monitoring started", "Network monitoring stopped"]
        );
    }

    #[test]
    fn permission_denied_aborts_start() {
        let h = Harness::new(NetworkFilter::default(), 5);
        h.host.set_permission_granted(false);

        let err = h.controller.start().unwrap_err();

        assert!(matches!(
            err,
            MonitorError::Connectivity(ConnectivityError::PermissionDenied(_))
        ));
        assert_eq!(h.controller.lifecycle(), LifecycleState::Stopped);
        assert_eq!(h.foreground.calls().last().map(String::as_str), Some("end"));
        assert!(h.messages()[0].starts_with("Failed to start network monitoring: "));

        h.host.set_permission_granted(true);
        h.controller.start().unwrap();
        assert_eq!(h.controller.lifecycle(), LifecycleState::Monitoring);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let h = Harness::new(NetworkFilter::default(), 5);

        assert_eq!(
            h.controller.stop(),
            Err(MonitorError::InvalidTransition {
                from: LifecycleState::Stopped,
                action: "stop"
            })
        );

        h.controller.start().unwrap();
        assert_eq!(
            h.controller.start(),
            Err(MonitorError::InvalidTransition {
                from: LifecycleState::Monitoring,
                action: "start"
            })
        );
        assert_eq!(h.host.registration_count(), 1);
    }

    #[test]
    fn signals_outside_monitoring_are_discarded() {
        let h = Harness::new(NetworkFilter::default(), 5);

        h.controller.handle_signal(ConnectivitySignal::Lost);
        assert_eq!(h.volume(), 5);
        assert!(h.messages().is_empty());

        h.controller.start().unwrap();
        h.controller.stop().unwrap();
        h.controller.handle_signal(ConnectivitySignal::Lost);
        assert_eq!(h.volume(), 5);
        assert!(h.notifier.messages().is_empty());
    }

    #[test]
    fn unresolved_network_keeps_volume_muted() {
        let h = Harness::new(NetworkFilter::wifi_internet(), 6);
        h.controller.start().unwrap();

        h.host.emit(HostNetworkEvent::Available);
        assert_eq!(h.volume(), 0);
        assert_eq!(h.controller.status().mute, Some(MuteState::Muted));

        h.host
            .emit(HostNetworkEvent::CapabilitiesChanged(NetworkCapabilities {
                transport: Transport::Wifi,
                has_internet: true,
                ssid: Some("<unknown ssid>".to_string()),
            }));
        assert_eq!(h.volume(), 0);
        assert!(h
            .messages()
            .contains(&"Network Available, waiting for network details".to_string()));
    }

    #[test]
    fn unscoped_filter_restores_on_available() {
        let h = Harness::new(NetworkFilter::any_internet(), 0);
        h.controller.start().unwrap();

        h.host.emit(HostNetworkEvent::Available);

        assert_eq!(h.volume(), 10);
        assert_eq!(h.controller.status().mute, Some(MuteState::Unmuted));
        assert!(h.messages().contains(&"Network Available".to_string()));
    }

    /// Host that keeps every callback it was given, so events can be delivered
    /// after the registration is gone.
    #[derive(Default)]
    struct LateDeliveryHost {
        inner: ManualConnectivityHost,
        callbacks: parking_lot::Mutex<Vec<HostCallback>>,
    }

    impl LateDeliveryHost {
        fn deliver_late(&self, event: HostNetworkEvent) {
            let callbacks: Vec<HostCallback> = self.callbacks.lock().clone();
            for callback in callbacks {
                callback(event.clone());
            }
        }
    }

    impl ConnectivityHost for LateDeliveryHost {
        fn register(
            &self,
            filter: &NetworkFilter,
            callback: HostCallback,
        ) -> ConnectivityResult<RegistrationId> {
            self.callbacks.lock().push(Arc::clone(&callback));
            self.inner.register(filter, callback)
        }

        fn unregister(&self, id: RegistrationId) -> ConnectivityResult<()> {
            self.inner.unregister(id)
        }
    }

    #[test]
    fn events_delivered_after_stop_are_discarded() {
        let h = Harness::new(NetworkFilter::wifi_internet(), 5);
        let host = Arc::new(LateDeliveryHost::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let controller = Arc::new(MonitorController::new(
            Arc::new(ConnectivityWatcher::new(
                Arc::clone(&host) as Arc<dyn ConnectivityHost>,
                NetworkFilter::wifi_internet(),
            )),
            Arc::clone(&h.store),
            Arc::clone(&h.log),
            Arc::clone(&h.foreground) as Arc<dyn ForegroundService>,
            Arc::clone(&notifier) as Arc<dyn StatusNotifier>,
            TITLE,
            "watching",
        ));

        controller.start().unwrap();
        controller.stop().unwrap();
        assert_eq!(host.inner.registration_count(), 0);
        let logged = h.messages();

        host.deliver_late(HostNetworkEvent::Lost);
        host.deliver_late(HostNetworkEvent::Available);

        assert_eq!(h.volume(), 5);
        assert_eq!(h.messages(), logged);
        assert!(notifier.messages().is_empty());
        assert_eq!(controller.status(), MonitorStatus::default());
    }

    #[test]
    fn volume_failure_is_logged_and_monitoring_continues() {
        let h = Harness::new(NetworkFilter::default(), 5);
        h.controller.start().unwrap();

        h.audio.set_available(false);
        h.host.emit(HostNetworkEvent::Lost);
        assert_eq!(h.controller.lifecycle(), LifecycleState::Monitoring);
        assert!(h
            .messages()
            .last()
            .is_some_and(|m| m.starts_with("Failed to change media volume: ")));

        h.audio.set_available(true);
        h.host.emit(HostNetworkEvent::Lost);
        assert_eq!(h.volume(), 0);
    }

    #[test]
    fn observer_panic_does_not_stop_monitoring() {
        struct PanicOnce {
            inner: RecordingNotifier,
            armed: AtomicBool,
        }

        impl StatusNotifier for PanicOnce {
            fn notify(&self, title: &str, message: &str) {
                if self.armed.swap(false, Ordering::SeqCst) {
                    panic!("notification backend crashed");
                }
                self.inner.notify(title, message);
            }
        }

        let notifier = Arc::new(PanicOnce {
            inner: RecordingNotifier::default(),
            armed: AtomicBool::new(true),
        });
        let h = Harness::new(NetworkFilter::default(), 5);
        let controller = Arc::new(MonitorController::new(
            Arc::new(ConnectivityWatcher::new(
                Arc::clone(&h.host) as Arc<dyn ConnectivityHost>,
                NetworkFilter::default(),
            )),
            Arc::clone(&h.store),
            Arc::clone(&h.log),
            Arc::clone(&h.foreground) as Arc<dyn ForegroundService>,
            Arc::clone(&notifier) as Arc<dyn StatusNotifier>,
            TITLE,
            "watching",
        ));
        controller.start().unwrap();

        h.host.emit(HostNetworkEvent::Lost);
        h.wifi("Home");

        assert_eq!(controller.lifecycle(), LifecycleState::Monitoring);
        assert_eq!(h.volume(), 10);
        assert_eq!(notifier.inner.messages(), vec!["silent", "normal"]);
    }

    #[test]
    fn dropping_controller_releases_registration() {
        let h = Harness::new(NetworkFilter::default(), 5);
        h.controller.start().unwrap();
        assert_eq!(h.host.registration_count(), 1);

        let Harness { host, controller, .. } = h;
        drop(controller);

        assert_eq!(host.registration_count(), 0);
        host.emit(HostNetworkEvent::Lost);
    }

    #[test]
    fn actions_dispatch_commands() {
        let h = Harness::new(NetworkFilter::default(), 5);

        h.controller.handle_action("START_MONITORING").unwrap();
        assert_eq!(h.controller.lifecycle(), LifecycleState::Monitoring);

        assert_eq!(
            h.controller.handle_action("PAUSE"),
            Err(MonitorError::UnknownAction("PAUSE".to_string()))
        );

        h.controller
            .handle_command(MonitorCommand::StopMonitoring)
            .unwrap();
        assert_eq!(h.controller.lifecycle(), LifecycleState::Stopped);
    }

    #[test]
    fn random_signals_never_change_baseline() {
        let h = Harness::new(NetworkFilter::wifi_internet(), 6);
        h.controller.save_volume().unwrap();
        h.controller.start().unwrap();

        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            match rng.gen_range(0..4) {
                0 => h.host.emit(HostNetworkEvent::Lost),
                1 => h.host.emit(HostNetworkEvent::Available),
                2 => h.wifi("Home"),
                _ => h.wifi("<unknown ssid>"),
            }
            assert_eq!(h.store.baseline().unwrap(), 6);
            assert!(h.volume() == 0 || h.volume() == 6);
        }

        h.wifi("Cafe");
        assert_eq!(h.volume(), 6);
    }
}
