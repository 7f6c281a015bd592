//! Trait abstractions over the host audio and preference subsystems.
//!
//! [`VolumeStore`](super::VolumeStore) only talks to these traits, so the
//! mute/restore logic is testable without a sound server or a data directory.

use super::VolumeResult;

/// One logical media output stream of the device.
pub trait AudioOutput: Send + Sync {
    /// Returns the current volume in `[0, max_volume()]`.
    fn volume(&self) -> VolumeResult<u32>;

    /// Sets the volume. Values above `max_volume()` are clamped.
    fn set_volume(&self, volume: u32) -> VolumeResult<()>;

    /// Returns the device-defined maximum volume step.
    fn max_volume(&self) -> u32;
}

/// Synchronous, durable key-value store with integer values.
///
/// A store instance is bound to a single namespace.
pub trait PreferenceStore: Send + Sync {
    /// Reads an integer, `None` if the key was never written.
    fn get_int(&self, key: &str) -> VolumeResult<Option<u32>>;

    /// Writes an integer, replacing any previous value.
    fn put_int(&self, key: &str, value: u32) -> VolumeResult<()>;
}
