//! Preference store backends.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::traits::PreferenceStore;
use super::{VolumeError, VolumeResult};
use crate::constants::PREFERENCES_NAMESPACE;

/// Volatile preference store. Values are lost when the process exits.
#[derive(Default)]
pub struct InMemoryPreferences {
    values: Mutex<HashMap<String, u32>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferences {
    fn get_int(&self, key: &str) -> VolumeResult<Option<u32>> {
        Ok(self.values.lock().get(key).copied())
    }

    fn put_int(&self, key: &str, value: u32) -> VolumeResult<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Preference store persisted as a JSON object in the data directory.
///
/// The file is `<data_dir>/MediaVolume.json`. Writes go to a temp file that is
/// then renamed over the original, so a crash never leaves a torn file. A file
/// that exists but cannot be parsed is reported as unavailable and left
/// untouched rather than replaced.
pub struct JsonFilePreferences {
    dir: PathBuf,
    path: PathBuf,
    /// Serializes load-modify-save cycles within this process.
    io_lock: Mutex<()>,
}

impl JsonFilePreferences {
    /// Creates a store rooted at `data_dir`. The directory is created lazily on
    /// the first write.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref().to_path_buf();
        let path = dir.join(format!("{PREFERENCES_NAMESPACE}.json"));
        Self {
            dir,
            path,
            io_lock: Mutex::new(()),
        }
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> VolumeResult<BTreeMap<String, u32>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                VolumeError::PreferencesUnavailable(format!(
                    "{} is not valid: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(VolumeError::PreferencesUnavailable(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&self, values: &BTreeMap<String, u32>) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let temp_path = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(values)?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &self.path)
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get_int(&self, key: &str) -> VolumeResult<Option<u32>> {
        let _guard = self.io_lock.lock();
        Ok(self.load()?.get(key).copied())
    }

    fn put_int(&self, key: &str, value: u32) -> VolumeResult<()> {
        let _guard = self.io_lock.lock();
        let mut values = self.load()?;
        values.insert(key.to_string(), value);
        self.save(&values).map_err(|e| {
            VolumeError::PreferencesUnavailable(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}
