//! Baseline volume persistence and the mute/restore transform.

use std::sync::Arc;

use parking_lot::Mutex;

use super::traits::{AudioOutput, PreferenceStore};
use super::VolumeResult;
use crate::constants::VOLUME_KEY;
use crate::events::EventLog;

/// Bridge between the live device volume and the persisted baseline.
///
/// The baseline is the volume the user wants back when connectivity returns.
/// Only [`save_baseline`](Self::save_baseline) writes it; muting applies 0 to
/// the device and leaves the baseline alone, so a mute followed by a restore
/// always lands on the last saved value.
///
/// # Concurrency design
///
/// `baseline_lock` makes `save_baseline` and `apply_mute` mutually exclusive.
/// Signal handling and an explicit user save can run on different threads;
/// neither sees the other's read-modify-write half done.
pub struct VolumeStore {
    audio: Arc<dyn AudioOutput>,
    preferences: Arc<dyn PreferenceStore>,
    event_log: Arc<EventLog>,
    default_baseline: u32,
    baseline_lock: Mutex<()>,
}

impl VolumeStore {
    /// Creates a store over the given device and preference backends.
    ///
    /// `default_baseline` is used whenever no baseline has been saved yet.
    pub fn new(
        audio: Arc<dyn AudioOutput>,
        preferences: Arc<dyn PreferenceStore>,
        event_log: Arc<EventLog>,
        default_baseline: u32,
    ) -> Self {
        Self {
            audio,
            preferences,
            event_log,
            default_baseline,
            baseline_lock: Mutex::new(()),
        }
    }

    /// Returns the live device volume.
    pub fn current_volume(&self) -> VolumeResult<u32> {
        self.audio.volume()
    }

    /// Returns the device's maximum volume step.
    #[must_use]
    pub fn max_volume(&self) -> u32 {
        self.audio.max_volume()
    }

    /// Returns the persisted baseline, or the default if none was saved.
    pub fn baseline(&self) -> VolumeResult<u32> {
        let _guard = self.baseline_lock.lock();
        self.read_baseline()
    }

    /// Persists `current_volume` as the new baseline and returns the previous one.
    ///
    /// On failure nothing is written and the old baseline stays in place.
    pub fn save_baseline(&self, current_volume: u32) -> VolumeResult<u32> {
        let _guard = self.baseline_lock.lock();

        let previous = self.read_baseline()?;
        let volume = current_volume.min(self.audio.max_volume());
        self.preferences.put_int(VOLUME_KEY, volume)?;

        log::info!("[VolumeStore] Baseline saved: {} (was {})", volume, previous);
        self.event_log
            .append(format!("save volume={volume} (was {previous})"));
        Ok(previous)
    }

    /// Reads the live device volume and saves it as the baseline.
    ///
    /// Returns `(saved, previous)`.
    pub fn save_current_volume(&self) -> VolumeResult<(u32, u32)> {
        let current = self.audio.volume()?;
        let previous = self.save_baseline(current)?;
        Ok((current.min(self.audio.max_volume()), previous))
    }

    /// Applies the mute state to the device and returns the volume now in effect.
    ///
    /// Muted means 0; unmuted means the persisted baseline. The device write is
    /// skipped when `current_volume` already equals the target, so repeated
    /// calls with the same state are no-ops on the device.
    pub fn apply_mute(&self, muted: bool, current_volume: u32) -> VolumeResult<u32> {
        let _guard = self.baseline_lock.lock();

        let target = if muted { 0 } else { self.read_baseline()? };

        if current_volume == target {
            log::debug!(
                "[VolumeStore] Media volume already {}, skipping device write",
                target
            );
        } else {
            self.audio.set_volume(target)?;
        }

        self.event_log.append(format!("set media volume={target}"));
        Ok(target)
    }

    fn read_baseline(&self) -> VolumeResult<u32> {
        let stored = self.preferences.get_int(VOLUME_KEY)?;
        Ok(stored
            .unwrap_or(self.default_baseline)
            .min(self.audio.max_volume()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_BASELINE_VOLUME;
    use crate::utils::FixedClock;
    use crate::volume::{InMemoryPreferences, VirtualAudioOutput, VolumeError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    /// Preference store that can be switched offline.
    #[derive(Default)]
    struct FlakyPreferences {
        inner: InMemoryPreferences,
        offline: AtomicBool,
    }

    impl PreferenceStore for FlakyPreferences {
        fn get_int(&self, key: &str) -> VolumeResult<Option<u32>> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(VolumeError::PreferencesUnavailable("offline".into()));
            }
            self.inner.get_int(key)
        }

        fn put_int(&self, key: &str, value: u32) -> VolumeResult<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(VolumeError::PreferencesUnavailable("offline".into()));
            }
            self.inner.put_int(key, value)
        }
    }

    struct Fixture {
        audio: Arc<VirtualAudioOutput>,
        prefs: Arc<FlakyPreferences>,
        log: Arc<EventLog>,
        store: VolumeStore,
    }

    fn fixture(initial_volume: u32) -> Fixture {
        let audio = Arc::new(VirtualAudioOutput::new(initial_volume, 15));
        let prefs = Arc::new(FlakyPreferences::default());
        let log = Arc::new(EventLog::with_clock(
            Arc::new(FixedClock("10:00:00".into())),
            16,
        ));
        let store = VolumeStore::new(
            Arc::clone(&audio) as Arc<dyn AudioOutput>,
            Arc::clone(&prefs) as Arc<dyn PreferenceStore>,
            Arc::clone(&log),
            DEFAULT_BASELINE_VOLUME,
        );
        Fixture {
            audio,
            prefs,
            log,
            store,
        }
    }

    fn apply(f: &Fixture, muted: bool) -> u32 {
        let current = f.store.current_volume().unwrap();
        f.store.apply_mute(muted, current).unwrap()
    }

    #[test]
    fn unset_baseline_defaults_to_ten() {
        let f = fixture(4);
        assert_eq!(f.store.baseline().unwrap(), 10);
        assert_eq!(apply(&f, false), 10);
        assert_eq!(f.audio.volume().unwrap(), 10);
    }

    #[test]
    fn mute_then_restore_returns_to_saved_baseline() {
        let f = fixture(7);
        assert_eq!(f.store.save_baseline(7).unwrap(), 10);

        assert_eq!(apply(&f, true), 0);
        assert_eq!(f.audio.volume().unwrap(), 0);

        assert_eq!(apply(&f, false), 7);
        assert_eq!(f.audio.volume().unwrap(), 7);
    }

    #[test]
    fn mute_is_idempotent_and_never_touches_baseline() {
        let f = fixture(9);
        f.store.save_baseline(9).unwrap();

        assert_eq!(apply(&f, true), 0);
        assert_eq!(apply(&f, true), 0);
        assert_eq!(f.audio.volume().unwrap(), 0);
        assert_eq!(f.store.baseline().unwrap(), 9);

        assert_eq!(apply(&f, false), 9);
        assert_eq!(apply(&f, false), 9);
        assert_eq!(f.store.baseline().unwrap(), 9);
    }

    #[test]
    fn repeated_state_skips_device_write() {
        let f = fixture(5);
        apply(&f, true);
        let writes = f.audio.write_count();

        apply(&f, true);
        assert_eq!(f.audio.write_count(), writes);
    }

    #[test]
    fn save_baseline_returns_previous_and_clamps() {
        let f = fixture(3);
        assert_eq!(f.store.save_baseline(3).unwrap(), 10);
        assert_eq!(f.store.save_baseline(40).unwrap(), 3);
        assert_eq!(f.store.baseline().unwrap(), 15);
    }

    #[test]
    fn save_current_volume_reads_device() {
        let f = fixture(6);
        assert_eq!(f.store.save_current_volume().unwrap(), (6, 10));
        assert_eq!(f.store.baseline().unwrap(), 6);
    }

    #[test]
    fn operations_are_logged() {
        let f = fixture(6);
        f.store.save_baseline(6).unwrap();
        apply(&f, true);

        let messages: Vec<String> = f.log.snapshot().iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["save volume=6 (was 10)", "set media volume=0"]);
    }

    #[test]
    fn preferences_offline_leaves_device_and_baseline_alone() {
        let f = fixture(8);
        f.store.save_baseline(8).unwrap();
        apply(&f, true);

        f.prefs.offline.store(true, Ordering::SeqCst);
        assert!(matches!(
            f.store.apply_mute(false, 0),
            Err(VolumeError::PreferencesUnavailable(_))
        ));
        assert!(f.store.save_baseline(3).is_err());
        assert_eq!(f.audio.volume().unwrap(), 0);

        f.prefs.offline.store(false, Ordering::SeqCst);
        assert_eq!(f.store.baseline().unwrap(), 8);
    }

    #[test]
    fn audio_offline_does_not_corrupt_baseline() {
        let f = fixture(8);
        f.store.save_baseline(8).unwrap();
        f.audio.set_available(false);

        assert!(matches!(
            f.store.apply_mute(true, 8),
            Err(VolumeError::AudioUnavailable(_))
        ));
        assert!(f.store.save_current_volume().is_err());

        f.audio.set_available(true);
        assert_eq!(f.store.baseline().unwrap(), 8);
        assert_eq!(f.audio.volume().unwrap(), 8);
    }

    #[test]
    fn concurrent_save_and_apply_never_tear_the_baseline() {
        let f = Arc::new(fixture(5));
        let saver = {
            let f = Arc::clone(&f);
            thread::spawn(move || {
                for v in 1..=12 {
                    f.store.save_baseline(v).unwrap();
                }
            })
        };
        let muter = {
            let f = Arc::clone(&f);
            thread::spawn(move || {
                for i in 0..200 {
                    let current = f.store.current_volume().unwrap();
                    f.store.apply_mute(i % 2 == 0, current).unwrap();
                }
            })
        };

        saver.join().unwrap();
        muter.join().unwrap();

        assert_eq!(f.store.baseline().unwrap(), 12);
        let current = f.store.current_volume().unwrap();
        assert_eq!(f.store.apply_mute(false, current).unwrap(), 12);
        assert_eq!(f.audio.volume().unwrap(), 12);
    }
}
