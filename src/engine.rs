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
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, info, span, trace, warn, Level};

use crate::audio::Backend;
use crate::config::{self, ConfigError};
use crate::controller::Controller;
use crate::error::{EngineError, ImportError, PlaybackError, RegistryError};
use crate::external;
use crate::import::{self, FileHandle};
use crate::notify::{Confirm, Notifier, Severity};
use crate::persist::{self, CustomSoundRecord, Store, CUSTOM_SOUNDS, SOUND_PRESETS, SOUND_SETTINGS};
use crate::presets::{Preset, PresetLoad, PresetManager};
use crate::registry::Registry;
use crate::sound::{Origin, Sound, SoundDescriptor, SourceId, SourceKind};
use crate::state::{CategoryFilter, EngineSettings, EngineSnapshot};

#[cfg(test)]
mod tests;

/// Short one-shot sounds the session timer asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    FocusComplete,
    BreakComplete,
    Tick,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 3] = [
        NotificationKind::FocusComplete,
        NotificationKind::BreakComplete,
        NotificationKind::Tick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FocusComplete => "focus-complete",
            NotificationKind::BreakComplete => "break-complete",
            NotificationKind::Tick => "tick",
        }
    }

    /// The file shipped for this kind.
    pub fn default_file(&self) -> PathBuf {
        PathBuf::from(format!("{}.mp3", self.as_str()))
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown notification kind '{}'", s))
    }
}

/// Everything the engine talks to.
pub struct Collaborators {
    pub backend: Box<dyn Backend>,
    pub player: Box<dyn external::Player>,
    pub notifier: Box<dyn Notifier>,
    pub store: Box<dyn Store>,
    pub confirm: Box<dyn Confirm>,
}

/// The sound engine: the controller plus presets, persistence and timer sounds.
pub struct Engine {
    controller: Controller,
    presets: PresetManager,
    store: Box<dyn Store>,
    confirm: Box<dyn Confirm>,
    notification_sounds: HashMap<NotificationKind, PathBuf>,
    notification_volume: f32,
}

impl Engine {
    /// Builds the engine: restores settings, registers the built-in sounds whose files
    /// exist, restores custom sounds and presets.
    pub fn bootstrap(
        config: &config::Engine,
        collaborators: Collaborators,
    ) -> Result<Engine, ConfigError> {
        let span = span!(Level::INFO, "bootstrap");
        let _enter = span.enter();

        let Collaborators {
            backend,
            player,
            notifier,
            store,
            confirm,
        } = collaborators;

        let settings: EngineSettings = persist::load_or_default(store.as_ref(), SOUND_SETTINGS);
        let mut controller = Controller::new(backend, player, notifier, settings, config.options()?);
        controller.subscribe(|event| trace!(event = ?event, "Registry changed."));

        let sounds_dir = config.sounds_dir();
        let mut builtin_ids = Vec::new();
        for builtin in config.builtin() {
            let descriptor = builtin.descriptor(&sounds_dir)?;
            if let Some(path) = descriptor.origin.local_path() {
                if !path.exists() {
                    debug!(id = builtin.id(), path = ?path, "Skipping missing built-in sound.");
                    continue;
                }
            }
            let is_local = descriptor.kind == SourceKind::BuiltinLocal;
            match controller.register(descriptor) {
                Ok(id) if is_local => builtin_ids.push(id),
                Ok(_) => {}
                Err(e) => warn!(id = builtin.id(), err = %e, "Unable to register built-in sound"),
            }
        }

        let records: Vec<CustomSoundRecord> = persist::load_or_default(store.as_ref(), CUSTOM_SOUNDS);
        for record in records {
            let origin = match record.kind {
                SourceKind::ExternalHosted => Origin::Remote(record.origin_token),
                _ => Origin::Path(PathBuf::from(record.origin_token)),
            };
            let descriptor = SoundDescriptor::new(record.name, record.category, record.kind, origin)
                .with_id(record.id.clone())
                .default_sound(false);
            if let Err(e) = controller.register(descriptor) {
                warn!(id = record.id.as_str(), err = %e, "Unable to restore custom sound");
            }
        }

        let presets: BTreeMap<String, Preset> = persist::load_or_default(store.as_ref(), SOUND_PRESETS);

        if config.preload() {
            for id in builtin_ids.iter() {
                if let Err(e) = controller.load(id) {
                    debug!(id = id.as_str(), err = %e, "Unable to preload sound.");
                }
            }
        }

        info!(
            sounds = controller.registry().len(),
            presets = presets.len(),
            master_volume = settings.master_volume,
            muted = settings.is_muted,
            "Sound engine ready."
        );
        Ok(Engine {
            controller,
            presets: PresetManager::new(presets),
            store,
            confirm,
            notification_sounds: config.notification_sounds()?,
            notification_volume: config.notification_volume(),
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn registry(&self) -> &Registry {
        self.controller.registry()
    }

    /// The sounds matching the active category filter.
    pub fn visible_sounds(&self) -> Vec<&Sound> {
        self.registry()
            .list(self.controller.state().active_category())
    }

    pub fn play(&mut self, id: &SourceId) -> Result<(), EngineError> {
        Ok(self.controller.play(id)?)
    }

    pub fn stop(&mut self, id: &SourceId) -> Result<(), EngineError> {
        Ok(self.controller.stop(id)?)
    }

    pub fn toggle(&mut self, id: &SourceId) -> Result<bool, EngineError> {
        Ok(self.controller.toggle(id)?)
    }

    pub fn stop_all(&mut self) {
        self.controller.stop_all();
    }

    pub fn reload(&mut self, id: &SourceId) -> Result<(), EngineError> {
        Ok(self.controller.reload(id)?)
    }

    pub fn set_volume(&mut self, id: &SourceId, volume: f32) -> Result<(), EngineError> {
        Ok(self.controller.set_volume(id, volume)?)
    }

    pub fn set_looped(&mut self, id: &SourceId, looped: bool) -> Result<(), EngineError> {
        Ok(self.controller.set_looped(id, looped)?)
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.controller.set_master_volume(volume);
        self.persist_settings();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.controller.set_muted(muted);
        self.persist_settings();
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.controller.toggle_mute();
        self.persist_settings();
        muted
    }

    pub fn set_active_category(&mut self, filter: CategoryFilter) {
        self.controller.set_active_category(filter);
    }

    /// Imports files and persists the custom sound list if anything was added.
    pub fn import_files(&mut self, handles: Vec<FileHandle>) -> Vec<Result<SourceId, ImportError>> {
        let results = import::import_files(&mut self.controller, handles);
        if results.iter().any(|result| result.is_ok()) {
            self.persist_custom_sounds();
        }
        results
    }

    /// Removes a user-imported sound after confirmation.
    pub fn remove_custom_sound(&mut self, id: &SourceId) -> Result<(), EngineError> {
        let found = self
            .registry()
            .get(id)
            .map(|sound| (sound.name().to_string(), sound.is_default()));
        let name = match found {
            Some((_, true)) => return Err(self.report(RegistryError::Protected(id.clone()).into())),
            Some((name, false)) => name,
            None => return Err(self.report(RegistryError::NotFound(id.clone()).into())),
        };

        if !self
            .confirm
            .confirm("Remove sound", &format!("Remove {} from your sounds?", name))
        {
            debug!(id = id.as_str(), "Removal cancelled.");
            return Err(EngineError::Cancelled(id.clone()));
        }

        if let Err(e) = self.controller.remove(id) {
            return Err(self.report(e.into()));
        }
        self.persist_custom_sounds();
        self.controller
            .notify("Sound removed", &format!("{} was removed.", name), Severity::Success);
        Ok(())
    }

    /// Saves the playing sounds as a preset.
    pub fn save_preset(&mut self, name: &str) -> Result<Preset, EngineError> {
        let active = self.registry().playing_ids();
        let preset = match self.presets.save(name, &active, self.controller.registry()) {
            Ok(preset) => preset.clone(),
            Err(e) => return Err(self.report(e.into())),
        };
        self.persist_presets();
        self.controller.notify(
            "Preset saved",
            &format!("Saved {}.", preset.name),
            Severity::Success,
        );
        Ok(preset)
    }

    pub fn load_preset(&mut self, name: &str) -> Result<PresetLoad, EngineError> {
        match self.presets.load(name, &mut self.controller) {
            Ok(outcome) => Ok(outcome),
            Err(e) => Err(self.report(e.into())),
        }
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<(), EngineError> {
        if let Err(e) = self.presets.delete(name) {
            return Err(self.report(e.into()));
        }
        self.persist_presets();
        Ok(())
    }

    /// Every preset, sorted by name.
    pub fn presets(&self) -> Vec<&Preset> {
        self.presets.list()
    }

    /// Plays a timer sound once. It ignores master volume and mute.
    pub fn play_notification_sound(&mut self, kind: NotificationKind) -> Result<(), EngineError> {
        let path = self
            .notification_sounds
            .get(&kind)
            .cloned()
            .ok_or_else(|| PlaybackError::NoNotificationSound(kind.to_string()))?;
        debug!(kind = %kind, path = ?path, "Playing notification sound.");
        self.controller
            .play_one_shot(&path, self.notification_volume)
            .map_err(|e| {
                warn!(kind = %kind, err = %e, "Unable to play notification sound");
                PlaybackError::Rejected {
                    id: SourceId::new(kind.as_str()),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    pub fn current_state(&self) -> EngineSnapshot {
        self.controller.snapshot()
    }

    /// Finishes loads, expires stalled plays and checks on the external player.
    pub fn pump(&mut self) {
        self.controller.pump();
    }

    fn report(&mut self, err: EngineError) -> EngineError {
        self.controller
            .notify("Something went wrong", &err.to_string(), Severity::Error);
        err
    }

    fn persist_settings(&mut self) {
        let settings = self.controller.state().settings();
        persist::save(self.store.as_mut(), SOUND_SETTINGS, &settings);
    }

    fn persist_custom_sounds(&mut self) {
        let records: Vec<CustomSoundRecord> = self
            .controller
            .registry()
            .iter()
            .filter_map(CustomSoundRecord::from_sound)
            .collect();
        persist::save(self.store.as_mut(), CUSTOM_SOUNDS, &records);
    }

    fn persist_presets(&mut self) {
        persist::save(self.store.as_mut(), SOUND_PRESETS, self.presets.presets());
    }
}
