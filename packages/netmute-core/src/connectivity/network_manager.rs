//! NetworkManager link resolver over the system D-Bus.
//!
//! Reads the primary connection from `org.freedesktop.NetworkManager`: its
//! type gives the transport, the global `State` tells whether the link has
//! internet access, and for Wi-Fi the active access point gives the SSID.

use parking_lot::Mutex;
use zbus::blocking::Connection;
use zbus::proxy;
use zbus::proxy::CacheProperties;
use zbus::zvariant::OwnedObjectPath;

use super::probe::LinkResolver;
use super::types::{NetworkCapabilities, Transport};

/// `NM_STATE_CONNECTED_LOCAL`: lowest state with an active connection.
const NM_STATE_CONNECTED_LOCAL: u32 = 50;
/// `NM_STATE_CONNECTED_GLOBAL`: connected with internet access.
const NM_STATE_CONNECTED_GLOBAL: u32 = 70;

#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
trait NetworkManager {
    #[zbus(property)]
    fn state(&self) -> zbus::Result<u32>;

    #[zbus(property)]
    fn primary_connection(&self) -> zbus::Result<OwnedObjectPath>;
}

#[proxy(
    interface = "org.freedesktop.NetworkManager.Connection.Active",
    default_service = "org.freedesktop.NetworkManager"
)]
trait ActiveConnection {
    #[zbus(property, name = "Type")]
    fn connection_type(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;
}

#[proxy(
    interface = "org.freedesktop.NetworkManager.Device.Wireless",
    default_service = "org.freedesktop.NetworkManager"
)]
trait WirelessDevice {
    #[zbus(property)]
    fn active_access_point(&self) -> zbus::Result<OwnedObjectPath>;
}

#[proxy(
    interface = "org.freedesktop.NetworkManager.AccessPoint",
    default_service = "org.freedesktop.NetworkManager"
)]
trait AccessPoint {
    #[zbus(property)]
    fn ssid(&self) -> zbus::Result<Vec<u8>>;
}

/// Resolves the primary link through NetworkManager.
///
/// The system bus connection is opened on first use and reopened after a
/// failed query. When NetworkManager is not running every query yields `None`.
#[derive(Default)]
pub struct NetworkManagerResolver {
    connection: Mutex<Option<Connection>>,
}

impl NetworkManagerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn query(&self, connection: &Connection) -> zbus::Result<Option<NetworkCapabilities>> {
        let manager = NetworkManagerProxyBlocking::builder(connection)
            .cache_properties(CacheProperties::No)
            .build()?;

        let Some(has_internet) = internet_access(manager.state()?) else {
            return Ok(None);
        };

        let primary = manager.primary_connection()?;
        if primary.as_str() == "/" {
            return Ok(None);
        }

        let active = ActiveConnectionProxyBlocking::builder(connection)
            .path(primary.as_str())?
            .cache_properties(CacheProperties::No)
            .build()?;

        let transport = transport_from_connection_type(&active.connection_type()?);
        let ssid = if transport == Transport::Wifi {
            active
                .devices()?
                .first()
                .map(|device| active_ssid(connection, device))
                .transpose()?
                .flatten()
        } else {
            None
        };

        Ok(Some(NetworkCapabilities {
            transport,
            has_internet,
            ssid,
        }))
    }
}

fn active_ssid(connection: &Connection, device: &OwnedObjectPath) -> zbus::Result<Option<String>> {
    let wireless = WirelessDeviceProxyBlocking::builder(connection)
        .path(device.as_str())?
        .cache_properties(CacheProperties::No)
        .build()?;

    let access_point = wireless.active_access_point()?;
    if access_point.as_str() == "/" {
        return Ok(None);
    }

    let access_point = AccessPointProxyBlocking::builder(connection)
        .path(access_point.as_str())?
        .cache_properties(CacheProperties::No)
        .build()?;

    let ssid = access_point.ssid()?;
    Ok((!ssid.is_empty()).then(|| String::from_utf8_lossy(&ssid).into_owned()))
}

/// Returns whether a connected `NMState` has internet access, or `None`
/// while there is no active connection.
fn internet_access(state: u32) -> Option<bool> {
    (state >= NM_STATE_CONNECTED_LOCAL).then_some(state == NM_STATE_CONNECTED_GLOBAL)
}

/// Maps a NetworkManager connection type to a transport.
fn transport_from_connection_type(connection_type: &str) -> Transport {
    match connection_type {
        "802-11-wireless" => Transport::Wifi,
        "802-3-ethernet" => Transport::Ethernet,
        "gsm" | "cdma" => Transport::Cellular,
        _ => Transport::Other,
    }
}

impl LinkResolver for NetworkManagerResolver {
    fn current_link(&self) -> Option<NetworkCapabilities> {
        let mut connection = self.connection.lock();

        if connection.is_none() {
            match Connection::system() {
                Ok(conn) => *connection = Some(conn),
                Err(e) => {
                    log::debug!("[NetworkManager] System bus unavailable: {}", e);
                    return None;
                }
            }
        }

        let result = connection.as_ref().map(|conn| self.query(conn))?;
        match result {
            Ok(link) => link,
            Err(e) => {
                log::debug!("[NetworkManager] Query failed: {}", e);
                *connection = None;
                None
            }
        }
    }
}
