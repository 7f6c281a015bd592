//! Connectivity data types shared by hosts, the watcher and the monitor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_SSID;

/// Link technology of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Wifi,
    Ethernet,
    Cellular,
    Other,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wifi => "wifi",
            Self::Ethernet => "ethernet",
            Self::Cellular => "cellular",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Which networks a watcher cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFilter {
    /// Restrict to one transport. `None` observes any network.
    pub transport: Option<Transport>,
    /// Only consider networks that provide internet access.
    pub require_internet: bool,
}

impl Default for NetworkFilter {
    fn default() -> Self {
        Self::wifi_internet()
    }
}

impl NetworkFilter {
    /// Any network with internet access.
    #[must_use]
    pub fn any_internet() -> Self {
        Self {
            transport: None,
            require_internet: true,
        }
    }

    /// Wireless LAN networks with internet access.
    #[must_use]
    pub fn wifi_internet() -> Self {
        Self {
            transport: Some(Transport::Wifi),
            require_internet: true,
        }
    }

    /// Returns true if the filter is narrowed to a specific transport.
    #[must_use]
    pub fn is_transport_scoped(&self) -> bool {
        self.transport.is_some()
    }

    /// Returns true if capabilities with this transport and internet state pass.
    #[must_use]
    pub fn accepts(&self, capabilities: &NetworkCapabilities) -> bool {
        let transport_ok = self
            .transport
            .map_or(true, |t| t == capabilities.transport);
        transport_ok && (!self.require_internet || capabilities.has_internet)
    }
}

/// Capability details the host reports for an available network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCapabilities {
    pub transport: Transport,
    pub has_internet: bool,
    /// Network name, if the host can and may reveal it.
    pub ssid: Option<String>,
}

impl NetworkCapabilities {
    /// Returns the SSID if it identifies a network.
    ///
    /// Empty names and the placeholder hosts report when the name is withheld
    /// do not count.
    #[must_use]
    pub fn known_ssid(&self) -> Option<&str> {
        self.ssid
            .as_deref()
            .map(|s| s.trim_matches('"'))
            .filter(|s| !s.is_empty() && *s != UNKNOWN_SSID)
    }
}

/// Raw event delivered by the host connectivity subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNetworkEvent {
    /// A network matching the registration filter became available.
    Available,
    /// The network matching the registration filter went away.
    Lost,
    /// Capability or transport details of the available network changed.
    CapabilitiesChanged(NetworkCapabilities),
}

/// What is known about the network behind a [`ConnectivitySignal::Connected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkIdentity {
    /// The network was identified, e.g. by SSID.
    Named(String),
    /// The watcher is not transport-scoped, so no identity is expected.
    Anonymous,
    /// An identity is expected but not yet available.
    Unresolved,
}

impl NetworkIdentity {
    /// Returns true if the connection should be treated as established.
    ///
    /// [`Unresolved`](Self::Unresolved) is pending: the volume stays muted
    /// until the network details arrive.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// Normalized connectivity transition consumed by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivitySignal {
    Connected { network: NetworkIdentity },
    Lost,
}

impl ConnectivitySignal {
    /// Shorthand for a connection to a named network.
    pub fn connected_to(name: impl Into<String>) -> Self {
        Self::Connected {
            network: NetworkIdentity::Named(name.into()),
        }
    }
}
