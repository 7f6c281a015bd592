//! Reachability-probe connectivity host.
//!
//! Desktop hosts have no callback API equivalent to a mobile network monitor,
//! so this host polls: every `interval` it opens a TCP connection to `target`
//! and asks a [`LinkResolver`] which link carries the traffic. Like a platform
//! callback, a registration only hears about links its filter accepts:
//! `Available`/`Lost` follow the accepted link, and `CapabilitiesChanged`
//! reports its transport and SSID.

use std::io::{self, ErrorKind};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::host::{ConnectivityHost, HostCallback, RegistrationId};
use super::types::{HostNetworkEvent, NetworkCapabilities, NetworkFilter, Transport};
use super::{ConnectivityError, ConnectivityResult};

/// Probe settings.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// `host:port` that must accept a TCP connection for the network to count
    /// as online.
    pub target: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target: "1.1.1.1:443".to_string(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Describes the link the host is currently connected through.
pub trait LinkResolver: Send + Sync {
    /// Returns the primary link, or `None` if there is none or it cannot be
    /// determined.
    fn current_link(&self) -> Option<NetworkCapabilities>;
}

/// Resolver for hosts without a network management service.
///
/// Every link is reported as [`Transport::Other`] without an SSID, so only
/// an unscoped filter sees it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownLinkResolver;

impl LinkResolver for UnknownLinkResolver {
    fn current_link(&self) -> Option<NetworkCapabilities> {
        None
    }
}

/// Combines a probe result with the resolved link.
///
/// A reachable target without a resolved link still counts as an
/// [`Transport::Other`] link. A resolved link only has internet access while
/// the target is reachable.
fn observed_link(reachable: bool, resolved: Option<NetworkCapabilities>) -> Option<NetworkCapabilities> {
    match resolved {
        Some(mut link) => {
            link.has_internet &= reachable;
            Some(link)
        }
        None if reachable => Some(NetworkCapabilities {
            transport: Transport::Other,
            has_internet: true,
            ssid: None,
        }),
        None => None,
    }
}

/// Link tracked by one probe loop: the last observed link the filter accepted.
#[derive(Debug, Default)]
struct ProbeState {
    link: Option<NetworkCapabilities>,
}

impl ProbeState {
    /// Folds one observation into the state and returns the events to emit.
    ///
    /// Links the filter rejects count as no link. Starting without one emits
    /// nothing: `Lost` is only reported for a link that was available.
    fn advance(
        &mut self,
        observed: Option<NetworkCapabilities>,
        filter: &NetworkFilter,
    ) -> Vec<HostNetworkEvent> {
        let next = observed.filter(|link| filter.accepts(link));

        let events = match (&self.link, &next) {
            (None, Some(link)) => vec![
                HostNetworkEvent::Available,
                HostNetworkEvent::CapabilitiesChanged(link.clone()),
            ],
            (Some(previous), Some(link)) if previous != link => {
                vec![HostNetworkEvent::CapabilitiesChanged(link.clone())]
            }
            (Some(_), None) => vec![HostNetworkEvent::Lost],
            _ => Vec::new(),
        };

        self.link = next;
        events
    }
}

/// Connectivity host backed by a periodic TCP reachability probe.
///
/// Each registration gets its own probe task on the given runtime. Callbacks
/// run on the blocking pool, one at a time per registration, in event order.
pub struct ProbeConnectivityHost {
    config: ProbeConfig,
    resolver: Arc<dyn LinkResolver>,
    runtime: Handle,
    probes: DashMap<RegistrationId, CancellationToken>,
    next_id: AtomicU64,
}

impl ProbeConnectivityHost {
    pub fn new(config: ProbeConfig, resolver: Arc<dyn LinkResolver>, runtime: Handle) -> Self {
        Self {
            config,
            resolver,
            runtime,
            probes: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a host on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectivityError::Host`] outside a tokio runtime.
    pub fn current(config: ProbeConfig, resolver: Arc<dyn LinkResolver>) -> ConnectivityResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| ConnectivityError::Host(format!("no async runtime: {e}")))?;
        Ok(Self::new(config, resolver, runtime))
    }
}

/// Fails when the process may not open sockets at all (sandboxed or
/// network-restricted).
fn check_network_permission() -> ConnectivityResult<()> {
    socket_permission(UdpSocket::bind(("0.0.0.0", 0)).map(drop))
}

fn socket_permission(bind: io::Result<()>) -> ConnectivityResult<()> {
    match bind {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(ConnectivityError::PermissionDenied(e.to_string()))
        }
        Err(e) => Err(ConnectivityError::Host(e.to_string())),
    }
}

async fn probe_once(target: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(target)).await,
        Ok(Ok(_))
    )
}

async fn run_probe(
    config: ProbeConfig,
    filter: NetworkFilter,
    resolver: Arc<dyn LinkResolver>,
    callback: HostCallback,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut state = ProbeState::default();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let reachable = probe_once(&config.target, config.timeout).await;
        let resolver = Arc::clone(&resolver);
        let resolved = tokio::task::spawn_blocking(move || resolver.current_link())
            .await
            .unwrap_or_else(|e| {
                log::warn!("[ProbeHost] Link resolver failed: {}", e);
                None
            });

        for event in state.advance(observed_link(reachable, resolved), &filter) {
            if token.is_cancelled() {
                break;
            }
            let callback = Arc::clone(&callback);
            if let Err(e) = tokio::task::spawn_blocking(move || callback(event)).await {
                log::error!("[ProbeHost] Network callback failed: {}", e);
            }
        }
    }

    log::debug!("[ProbeHost] Probe for {} stopped", config.target);
}

impl ConnectivityHost for ProbeConnectivityHost {
    fn register(
        &self,
        filter: &NetworkFilter,
        callback: HostCallback,
    ) -> ConnectivityResult<RegistrationId> {
        check_network_permission()?;

        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let token = CancellationToken::new();
        self.probes.insert(id, token.clone());

        log::info!(
            "[ProbeHost] Probing {} every {:?} for {:?}",
            self.config.target,
            self.config.interval,
            filter
        );
        self.runtime.spawn(run_probe(
            self.config.clone(),
            filter.clone(),
            Arc::clone(&self.resolver),
            callback,
            token,
        ));
        Ok(id)
    }

    fn unregister(&self, id: RegistrationId) -> ConnectivityResult<()> {
        let (_, token) = self
            .probes
            .remove(&id)
            .ok_or(ConnectivityError::NotRegistered)?;
        token.cancel();
        Ok(())
    }
}

impl Drop for ProbeConnectivityHost {
    fn drop(&mut self) {
        for entry in self.probes.iter() {
            entry.value().cancel();
        }
    }
}
