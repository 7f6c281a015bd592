//! Daemon configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use netmute_core::volume::audio::DEFAULT_SINK;
use netmute_core::{ProbeConfig, Transport};
use serde::Deserialize;

/// Daemon configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Volume restored when no baseline has been saved.
    /// Override: `NETMUTE_DEFAULT_BASELINE_VOLUME`
    pub default_baseline_volume: u32,

    /// Transport to watch (`wifi`, `ethernet`, `cellular`, `other`); `null`
    /// watches any network.
    /// Override: `NETMUTE_TRANSPORT` (`any` for no restriction)
    pub transport: Option<Transport>,

    /// Only networks with internet access count as connected.
    /// Override: `NETMUTE_REQUIRE_INTERNET`
    pub require_internet: bool,

    /// `host:port` probed to decide whether the network is up.
    /// Override: `NETMUTE_PROBE_TARGET`
    pub probe_target: String,

    /// Seconds between reachability probes.
    /// Override: `NETMUTE_PROBE_INTERVAL_SECS`
    pub probe_interval_secs: u64,

    /// Seconds before a probe counts as failed.
    /// Override: `NETMUTE_PROBE_TIMEOUT_SECS`
    pub probe_timeout_secs: u64,

    /// Directory holding the persisted baseline (`MediaVolume.json`).
    /// Override: `NETMUTE_DATA_DIR`
    pub data_dir: Option<PathBuf>,

    /// PipeWire sink whose volume is controlled.
    /// Override: `NETMUTE_AUDIO_SINK`
    pub audio_sink: String,

    /// Number of volume steps the sink is divided into.
    /// Override: `NETMUTE_AUDIO_MAX_VOLUME`
    pub audio_max_volume: u32,

    /// Show status changes as desktop notifications instead of log lines.
    /// Override: `NETMUTE_DESKTOP_NOTIFICATIONS`
    pub desktop_notifications: bool,

    /// Capacity of the event log broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let core = netmute_core::Config::default();
        let probe = ProbeConfig::default();
        Self {
            default_baseline_volume: core.default_baseline_volume,
            transport: core.transport,
            require_internet: core.require_internet,
            probe_target: probe.target,
            probe_interval_secs: probe.interval.as_secs(),
            probe_timeout_secs: probe.timeout.as_secs(),
            data_dir: None,
            audio_sink: DEFAULT_SINK.to_string(),
            audio_max_volume: 15,
            desktop_notifications: false,
            event_channel_capacity: core.event_channel_capacity,
        }
    }
}

impl DaemonConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
        // Note: NETMUTE_DATA_DIR is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Applies overrides from `lookup`. Unparseable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = &lookup;

        if let Some(volume) = parse_override(lookup, "NETMUTE_DEFAULT_BASELINE_VOLUME") {
            self.default_baseline_volume = volume;
        }

        if let Some(val) = lookup("NETMUTE_TRANSPORT") {
            match parse_transport(&val) {
                Some(transport) => self.transport = transport,
                None => log::warn!("Ignoring invalid NETMUTE_TRANSPORT: {}", val),
            }
        }

        if let Some(required) = parse_override(lookup, "NETMUTE_REQUIRE_INTERNET") {
            self.require_internet = required;
        }

        if let Some(target) = lookup("NETMUTE_PROBE_TARGET") {
            self.probe_target = target;
        }

        if let Some(secs) = parse_override(lookup, "NETMUTE_PROBE_INTERVAL_SECS") {
            self.probe_interval_secs = secs;
        }

        if let Some(secs) = parse_override(lookup, "NETMUTE_PROBE_TIMEOUT_SECS") {
            self.probe_timeout_secs = secs;
        }

        if let Some(sink) = lookup("NETMUTE_AUDIO_SINK") {
            self.audio_sink = sink;
        }

        if let Some(max) = parse_override(lookup, "NETMUTE_AUDIO_MAX_VOLUME") {
            self.audio_max_volume = max;
        }

        if let Some(enabled) = parse_override(lookup, "NETMUTE_DESKTOP_NOTIFICATIONS") {
            self.desktop_notifications = enabled;
        }
    }

    /// Checks values the core cannot check itself.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.audio_max_volume >= 1, "audio_max_volume must be >= 1");
        ensure!(self.probe_interval_secs >= 1, "probe_interval_secs must be >= 1");
        ensure!(self.probe_timeout_secs >= 1, "probe_timeout_secs must be >= 1");
        ensure!(!self.probe_target.is_empty(), "probe_target must not be empty");
        Ok(())
    }

    /// Converts to netmute-core's Config type.
    pub fn to_core_config(&self) -> netmute_core::Config {
        netmute_core::Config {
            default_baseline_volume: self.default_baseline_volume,
            transport: self.transport,
            require_internet: self.require_internet,
            event_channel_capacity: self.event_channel_capacity,
            ..Default::default()
        }
    }

    /// Builds the reachability probe settings.
    pub fn to_probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            target: self.probe_target.clone(),
            interval: Duration::from_secs(self.probe_interval_secs),
            timeout: Duration::from_secs(self.probe_timeout_secs),
        }
    }
}

fn parse_override<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|val| val.trim().parse().ok())
}

/// Parses a transport name. `Some(None)` means "any network".
fn parse_transport(value: &str) -> Option<Option<Transport>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "any" | "" => Some(None),
        "wifi" => Some(Some(Transport::Wifi)),
        "ethernet" => Some(Some(Transport::Ethernet)),
        "cellular" => Some(Some(Transport::Cellular)),
        "other" => Some(Some(Transport::Other)),
        _ => None,
    }
}
