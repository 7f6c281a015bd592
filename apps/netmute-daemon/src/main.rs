//! Netmute - background daemon that mutes media volume while offline.
//!
//! Probes network reachability and drives the PipeWire default sink through
//! netmute-core: muted while the network is gone, back to the saved baseline
//! when it returns. Sending `SIGUSR1` saves the current volume as the new
//! baseline; `SIGUSR2` clears the event log.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use netmute_core::connectivity::NetworkManagerResolver;
use netmute_core::events::{DesktopNotifier, LoggingNotifier};
use netmute_core::lifecycle::LoggingForeground;
use netmute_core::volume::{InMemoryPreferences, JsonFilePreferences, VirtualAudioOutput, WpctlAudioOutput};
use netmute_core::{
    bootstrap_services, AudioOutput, ConnectivityHost, EventLog, HostBackends, LogEntry,
    ManualConnectivityHost, MonitorController, PreferenceStore, ProbeConnectivityHost,
    StatusNotifier,
};
use tokio::signal;
use tokio::task::JoinHandle;

use crate::config::DaemonConfig;

/// Netmute - mutes media volume while the network is unavailable.
#[derive(Parser, Debug)]
#[command(name = "netmute")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "NETMUTE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Data directory for the persisted baseline volume (overrides config file).
    #[arg(short = 'd', long, env = "NETMUTE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Use an in-memory audio device instead of PipeWire.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Monitor connectivity until interrupted (default).
    Run,
    /// Save the current media volume as the baseline and exit.
    SaveVolume,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Netmute v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        DaemonConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }
    config.validate().context("Invalid configuration")?;

    let command = args.command.unwrap_or(Command::Run);
    if command == Command::SaveVolume && config.data_dir.is_none() {
        bail!("save-volume needs a data directory: pass --data-dir or set NETMUTE_DATA_DIR");
    }

    log::info!(
        "Configuration: transport={}, probe_target={}, sink={}{}",
        config
            .transport
            .map_or_else(|| "any".to_string(), |t| t.to_string()),
        config.probe_target,
        config.audio_sink,
        if args.dry_run { " (dry run)" } else { "" }
    );

    let connectivity: Arc<dyn ConnectivityHost> = match command {
        Command::Run => Arc::new(
            ProbeConnectivityHost::current(
                config.to_probe_config(),
                Arc::new(NetworkManagerResolver::new()),
            )
                .context("Failed to create connectivity probe")?,
        ),
        Command::SaveVolume => Arc::new(ManualConnectivityHost::new()),
    };

    let backends = HostBackends {
        audio: audio_output(&config, args.dry_run),
        preferences: preference_store(&config),
        connectivity,
        foreground: Arc::new(LoggingForeground),
        notifier: status_notifier(&config),
    };

    let services = bootstrap_services(&config.to_core_config(), backends)
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    if command == Command::SaveVolume {
        let (saved, previous) = services
            .controller
            .save_volume()
            .context("Failed to save volume")?;
        log::info!("Saved volume {} (previous {})", saved, previous);
        return Ok(());
    }

    let mirror = spawn_event_mirror(&services.event_log);

    services
        .controller
        .start()
        .context("Failed to start network monitoring")?;

    wait_for_shutdown(&services.controller, &services.event_log)
        .await
        .context("Failed to install signal handlers")?;

    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown();
    drop(services);

    // The mirror ends once the event log is dropped; don't wait forever for it.
    if tokio::time::timeout(Duration::from_secs(1), mirror)
        .await
        .is_err()
    {
        log::debug!("Event log mirror still running at exit");
    }

    log::info!("Shutdown complete");
    Ok(())
}

fn audio_output(config: &DaemonConfig, dry_run: bool) -> Arc<dyn AudioOutput> {
    if dry_run {
        Arc::new(VirtualAudioOutput::new(
            config.default_baseline_volume,
            config.audio_max_volume,
        ))
    } else {
        Arc::new(WpctlAudioOutput::new(
            config.audio_sink.clone(),
            config.audio_max_volume,
        ))
    }
}

fn preference_store(config: &DaemonConfig) -> Arc<dyn PreferenceStore> {
    if let Some(ref data_dir) = config.data_dir {
        log::info!("Using data directory: {}", data_dir.display());
        Arc::new(JsonFilePreferences::new(data_dir))
    } else {
        log::warn!("No data directory configured - the saved volume will not persist");
        Arc::new(InMemoryPreferences::new())
    }
}

fn status_notifier(config: &DaemonConfig) -> Arc<dyn StatusNotifier> {
    if config.desktop_notifications {
        Arc::new(DesktopNotifier::default())
    } else {
        Arc::new(LoggingNotifier)
    }
}

/// Tracks which event log entries have already been written out.
#[derive(Debug, Default)]
struct MirrorCursor {
    printed: usize,
    last: Option<LogEntry>,
}

impl MirrorCursor {
    /// Returns the entries of `snapshot` that have not been written yet.
    ///
    /// A clear shows up as a shorter snapshot or, when snapshots were skipped,
    /// as a different entry at the last written position. Either restarts the
    /// output from the first entry.
    fn unseen<'a>(&mut self, snapshot: &'a [LogEntry]) -> &'a [LogEntry] {
        let continues = self.printed <= snapshot.len()
            && self
                .printed
                .checked_sub(1)
                .map_or(true, |i| self.last.as_ref() == snapshot.get(i));
        let start = if continues { self.printed } else { 0 };

        self.printed = snapshot.len();
        self.last = snapshot.last().cloned();
        &snapshot[start..]
    }
}

/// Writes every new event log entry to the process log.
fn spawn_event_mirror(event_log: &EventLog) -> JoinHandle<()> {
    let mut snapshots = Box::pin(event_log.subscribe());
    tokio::spawn(async move {
        let mut cursor = MirrorCursor::default();
        while let Some(snapshot) = snapshots.next().await {
            for entry in cursor.unseen(&snapshot) {
                log::info!("[{}] #{} {}", entry.timestamp, entry.id, entry.message);
            }
        }
    })
}

/// Runs until Ctrl+C or SIGTERM. SIGUSR1 saves the current volume, SIGUSR2
/// clears the event log.
#[cfg(unix)]
async fn wait_for_shutdown(
    controller: &Arc<MonitorController>,
    event_log: &EventLog,
) -> std::io::Result<()> {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let mut terminate = unix_signal(SignalKind::terminate())?;
    let mut save = unix_signal(SignalKind::user_defined1())?;
    let mut clear = unix_signal(SignalKind::user_defined2())?;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => return Ok(()),
            _ = terminate.recv() => return Ok(()),
            _ = save.recv() => save_volume(controller),
            _ = clear.recv() => clear_event_log(event_log),
        }
    }
}

/// Runs until Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_shutdown(
    _controller: &Arc<MonitorController>,
    _event_log: &EventLog,
) -> std::io::Result<()> {
    signal::ctrl_c().await
}

#[cfg_attr(not(unix), allow(dead_code))]
fn clear_event_log(event_log: &EventLog) {
    let cleared = event_log.len();
    event_log.clear();
    log::info!("Cleared {} event log entries", cleared);
}

#[cfg(unix)]
fn save_volume(controller: &MonitorController) {
    match controller.save_volume() {
        Ok((saved, previous)) => log::info!("Saved volume {} (previous {})", saved, previous),
        Err(e) => log::warn!("Failed to save volume: {}", e),
    }
}
