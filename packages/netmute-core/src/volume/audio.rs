//! Audio output backends.
//!
//! - [`WpctlAudioOutput`]: the default PipeWire sink, driven through `wpctl`
//! - [`VirtualAudioOutput`]: an in-memory device for tests and dry runs

use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::traits::AudioOutput;
use super::{VolumeError, VolumeResult};

/// Sink identifier that always resolves to the default audio output.
pub const DEFAULT_SINK: &str = "@DEFAULT_AUDIO_SINK@";

/// PipeWire/WirePlumber media output controlled through the `wpctl` CLI.
///
/// PipeWire expresses volume as a linear factor (1.0 = 100%). This backend
/// maps that factor onto integer steps `0..=max_volume` so the baseline is
/// stored the same way regardless of the sound server.
pub struct WpctlAudioOutput {
    sink: String,
    max_volume: u32,
}

impl WpctlAudioOutput {
    /// Creates a backend for `sink` with `max_volume` steps (at least 1).
    pub fn new(sink: impl Into<String>, max_volume: u32) -> Self {
        Self {
            sink: sink.into(),
            max_volume: max_volume.max(1),
        }
    }

    fn run(&self, args: &[&str]) -> VolumeResult<String> {
        let output = Command::new("wpctl")
            .args(args)
            .output()
            .map_err(|e| VolumeError::AudioUnavailable(format!("failed to run wpctl: {e}")))?;

        if !output.status.success() {
            return Err(VolumeError::AudioUnavailable(format!(
                "wpctl {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parses `wpctl get-volume` output (`"Volume: 0.45"` or `"Volume: 0.45 [MUTED]"`)
/// into the linear volume factor.
fn parse_volume_factor(output: &str) -> Option<f32> {
    let mut parts = output.split_whitespace();
    if parts.next()? != "Volume:" {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Maps a linear factor onto `0..=max_volume` steps.
fn factor_to_steps(factor: f32, max_volume: u32) -> u32 {
    let steps = (factor.max(0.0) * max_volume as f32).round() as u32;
    steps.min(max_volume)
}

impl AudioOutput for WpctlAudioOutput {
    fn volume(&self) -> VolumeResult<u32> {
        let output = self.run(&["get-volume", &self.sink])?;
        let factor = parse_volume_factor(&output).ok_or_else(|| {
            VolumeError::AudioUnavailable(format!(
                "unexpected wpctl output: {:?}",
                output.trim()
            ))
        })?;
        Ok(factor_to_steps(factor, self.max_volume))
    }

    /// Sets the sink level. A non-zero level also clears the sink's mute flag
    /// so a sink muted elsewhere becomes audible on restore.
    fn set_volume(&self, volume: u32) -> VolumeResult<()> {
        let volume = volume.min(self.max_volume);
        let factor = format!("{:.3}", volume as f32 / self.max_volume as f32);
        self.run(&["set-volume", &self.sink, &factor])?;

        if volume > 0 {
            self.run(&["set-mute", &self.sink, "0"])?;
        }
        log::debug!("[Audio] {} set to {} ({})", self.sink, volume, factor);
        Ok(())
    }

    fn max_volume(&self) -> u32 {
        self.max_volume
    }
}

/// In-memory audio device.
///
/// Used by tests and by the daemon's `--dry-run` mode. Can be marked
/// unavailable to exercise the "audio subsystem gone" path.
pub struct VirtualAudioOutput {
    volume: AtomicU32,
    max_volume: u32,
    available: AtomicBool,
    writes: AtomicU32,
}

impl VirtualAudioOutput {
    /// Creates a device at `volume` (clamped) with `max_volume` steps.
    pub fn new(volume: u32, max_volume: u32) -> Self {
        Self {
            volume: AtomicU32::new(volume.min(max_volume)),
            max_volume,
            available: AtomicBool::new(true),
            writes: AtomicU32::new(0),
        }
    }

    /// Makes every subsequent read and write succeed or fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of successful `set_volume` calls so far.
    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> VolumeResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(VolumeError::AudioUnavailable(
                "virtual device is offline".to_string(),
            ))
        }
    }
}

impl AudioOutput for VirtualAudioOutput {
    fn volume(&self) -> VolumeResult<u32> {
        self.check_available()?;
        Ok(self.volume.load(Ordering::SeqCst))
    }

    fn set_volume(&self, volume: u32) -> VolumeResult<()> {
        self.check_available()?;
        self.volume
            .store(volume.min(self.max_volume), Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn max_volume(&self) -> u32 {
        self.max_volume
    }
}
