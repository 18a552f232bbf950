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
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, span, warn, Level};

use crate::controller::Controller;
use crate::error::PresetError;
use crate::registry::Registry;
use crate::sound::{LoadState, SourceId};

/// One sound's settings within a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetSound {
    pub id: SourceId,
    pub volume: f32,
    pub is_looped: bool,
}

/// A named snapshot of the sounds that were playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    pub sounds: Vec<PresetSound>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} sound{}, saved {})",
            self.name,
            self.sounds.len(),
            if self.sounds.len() == 1 { "" } else { "s" },
            self.created_at.format("%Y-%m-%d %H:%M")
        )
    }
}

/// What happened when a preset was loaded.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PresetLoad {
    pub started: Vec<SourceId>,
    /// Entries whose sound no longer exists.
    pub skipped: Vec<SourceId>,
}

/// Keeps presets by name.
#[derive(Debug, Default)]
pub struct PresetManager {
    presets: BTreeMap<String, Preset>,
}

impl PresetManager {
    pub fn new(presets: BTreeMap<String, Preset>) -> PresetManager {
        PresetManager { presets }
    }

    /// Saves the given sounds under the name, replacing any preset already there.
    pub fn save(
        &mut self,
        name: &str,
        active: &[SourceId],
        registry: &Registry,
    ) -> Result<&Preset, PresetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::InvalidName);
        }

        let sounds: Vec<PresetSound> = active
            .iter()
            .filter_map(|id| registry.get(id))
            .map(|sound| PresetSound {
                id: sound.id().clone(),
                volume: sound.volume(),
                is_looped: sound.is_looped(),
            })
            .collect();
        if sounds.is_empty() {
            return Err(PresetError::NoActiveSources);
        }

        info!(preset = name, sounds = sounds.len(), "Saving preset.");
        let preset = Preset {
            name: name.to_string(),
            sounds,
            created_at: Utc::now(),
        };
        self.presets.insert(name.to_string(), preset);
        self.presets
            .get(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))
    }

    /// Stops everything, then applies and plays each stored sound in order. Sounds that
    /// no longer exist are skipped.
    pub fn load(&self, name: &str, controller: &mut Controller) -> Result<PresetLoad, PresetError> {
        let span = span!(Level::INFO, "load preset", preset = name);
        let _enter = span.enter();

        let preset = self
            .presets
            .get(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;

        controller.stop_all();
        let mut outcome = PresetLoad::default();
        for entry in preset.sounds.iter() {
            let Some(sound) = controller.registry().get(&entry.id) else {
                debug!(id = entry.id.as_str(), "Skipping missing sound.");
                outcome.skipped.push(entry.id.clone());
                continue;
            };

            // A failed sound is reported once, by the play below.
            if sound.load_state() == LoadState::Failed {
                debug!(id = entry.id.as_str(), "Not restoring settings of a failed sound.");
            } else {
                if let Err(e) = controller.set_volume(&entry.id, entry.volume) {
                    warn!(id = entry.id.as_str(), err = %e, "Unable to restore volume");
                }
                if let Err(e) = controller.set_looped(&entry.id, entry.is_looped) {
                    warn!(id = entry.id.as_str(), err = %e, "Unable to restore loop setting");
                }
            }
            match controller.play(&entry.id) {
                Ok(()) => outcome.started.push(entry.id.clone()),
                Err(e) => warn!(id = entry.id.as_str(), err = %e, "Unable to play preset sound"),
            }
        }

        info!(
            started = outcome.started.len(),
            skipped = outcome.skipped.len(),
            "Loaded preset."
        );
        Ok(outcome)
    }

    pub fn delete(&mut self, name: &str) -> Result<Preset, PresetError> {
        self.presets
            .remove(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// Every preset, sorted by name.
    pub fn list(&self) -> Vec<&Preset> {
        self.presets.values().collect()
    }

    pub fn presets(&self) -> &BTreeMap<String, Preset> {
        &self.presets
    }
}
