//! Media volume control and baseline persistence.
//!
//! - [`traits`]: host collaborator traits ([`AudioOutput`], [`PreferenceStore`])
//! - [`store`]: [`VolumeStore`], the mute/restore transform over the baseline
//! - [`audio`]: audio output backends (PipeWire, virtual)
//! - [`preferences`]: preference store backends (JSON file, in-memory)

pub mod audio;
pub mod preferences;
pub mod store;
pub mod traits;

use thiserror::Error;

pub use audio::{VirtualAudioOutput, WpctlAudioOutput};
pub use preferences::{InMemoryPreferences, JsonFilePreferences};
pub use store::VolumeStore;
pub use traits::{AudioOutput, PreferenceStore};

/// Errors raised when the audio or preference subsystem cannot be reached.
///
/// Both variants belong to the "store unavailable" class: the operation that
/// hit them had no effect on persisted state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VolumeError {
    /// The device audio subsystem could not be read or written.
    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),

    /// The persistent preference store could not be read or written.
    #[error("Preference store unavailable: {0}")]
    PreferencesUnavailable(String),
}

/// Result alias for volume operations.
pub type VolumeResult<T> = Result<T, VolumeError>;
