// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Keyed JSON persistence. Store failures are logged and never fatal.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::sound::{Category, Sound, SourceId, SourceKind};

pub const CUSTOM_SOUNDS: &str = "custom-sounds";
pub const SOUND_PRESETS: &str = "sound-presets";
pub const SOUND_SETTINGS: &str = "sound-settings";

/// Loads and saves JSON values by key.
pub trait Store {
    fn load_data(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn save_data(&mut self, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// Loads a value, falling back to the default on any failure.
pub fn load_or_default<T>(store: &dyn Store, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let value = match store.load_data(key) {
        Ok(Some(value)) => value,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!(key, err = %e, "Unable to load stored data");
            return T::default();
        }
    };
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(key, err = %e, "Stored data is malformed, using defaults");
        T::default()
    })
}

/// Saves a value, logging any failure. Returns whether the save worked.
pub fn save<T: Serialize>(store: &mut dyn Store, key: &str, value: &T) -> bool {
    let result = serde_json::to_value(value)
        .map_err(StoreError::from)
        .and_then(|value| store.save_data(key, &value));
    match result {
        Ok(()) => {
            debug!(key, "Saved data.");
            true
        }
        Err(e) => {
            warn!(key, err = %e, "Unable to save data");
            false
        }
    }
}

/// Keeps each key in its own JSON file in a directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> JsonFileStore {
        JsonFileStore {
            dir: dir.to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Store for JsonFileStore {
    fn load_data(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let contents = match fs::read_to_string(self.path(key)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save_data(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        // Write beside the target and rename so a crash never leaves half a file.
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut file, value)?;
        file.flush()?;
        file.persist(self.path(key)).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Makes every save fail, for exercising the failure path.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

impl Store for MemoryStore {
    fn load_data(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn save_data(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "store is read only").into());
        }
        self.values.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// A user-imported sound as it's persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSoundRecord {
    pub id: SourceId,
    pub name: String,
    pub category: Category,
    pub origin_token: String,
    pub kind: SourceKind,
}

impl CustomSoundRecord {
    /// The record for a sound, if it should be persisted. Built-ins are rebuilt from
    /// the manifest and transient files don't outlive the process.
    pub fn from_sound(sound: &Sound) -> Option<CustomSoundRecord> {
        if sound.is_default() || sound.origin().is_transient() {
            return None;
        }
        Some(CustomSoundRecord {
            id: sound.id().clone(),
            name: sound.name().to_string(),
            category: sound.category(),
            origin_token: sound.origin().token(),
            kind: sound.kind(),
        })
    }
}
