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
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tokio::time::Instant;
use tracing::{debug, info, span, warn, Level};

use crate::audio::{Backend, LoadCompletion};
use crate::error::{PlaybackError, RegistryError};
use crate::external::{self, Adapter, Degradation};
use crate::notify::{Notifier, Severity};
use crate::registry::{Registry, RegistryEvent};
use crate::sound::{LoadState, Sound, SoundDescriptor, SourceId, SourceKind};
use crate::state::{CategoryFilter, EngineSettings, EngineSnapshot, EngineState};

pub mod load;

use load::{transition, LoadEvent, LoadTracker};

/// Timing knobs for the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// How long a deferred play waits for its load.
    pub load_timeout: Duration,
    /// How long an external player has to confirm a volume change.
    pub grace_window: Duration,
    /// Unconfirmed external volume changes at least this large notify the user.
    pub degrade_notify_delta: f32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            load_timeout: Duration::from_secs(10),
            grace_window: Duration::from_millis(1500),
            degrade_notify_delta: 0.3,
        }
    }
}

/// Owns the registry and drives every sound through load and playback.
pub struct Controller {
    registry: Registry,
    state: EngineState,
    backend: Box<dyn Backend>,
    player: Box<dyn external::Player>,
    adapters: HashMap<SourceId, Adapter>,
    loads: LoadTracker,
    completions_tx: Sender<LoadCompletion>,
    completions_rx: Receiver<LoadCompletion>,
    notifier: Box<dyn Notifier>,
    options: Options,
}

impl Controller {
    pub fn new(
        backend: Box<dyn Backend>,
        player: Box<dyn external::Player>,
        notifier: Box<dyn Notifier>,
        settings: EngineSettings,
        options: Options,
    ) -> Controller {
        let (completions_tx, completions_rx) = crossbeam_channel::unbounded();
        Controller {
            registry: Registry::new(),
            state: EngineState::new(settings),
            backend,
            player,
            adapters: HashMap::new(),
            loads: LoadTracker::new(options.load_timeout),
            completions_tx,
            completions_rx,
            notifier,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// Registers a listener for registry changes.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&RegistryEvent) + Send + 'static,
    {
        self.registry.subscribe(listener);
    }

    /// Adds a sound to the registry. External sounds get an adapter right away.
    pub fn register(&mut self, descriptor: SoundDescriptor) -> Result<SourceId, RegistryError> {
        let media = match (&descriptor.kind, &descriptor.origin) {
            (SourceKind::ExternalHosted, origin) => Some(origin.token()),
            _ => None,
        };
        let id = self.registry.register(descriptor)?;
        if let Some(media) = media {
            self.adapters.insert(
                id.clone(),
                Adapter::new(
                    media,
                    self.options.grace_window,
                    self.options.degrade_notify_delta,
                ),
            );
        }
        Ok(id)
    }

    /// Starts loading a sound. Failed sounds stay failed until `reload`.
    pub fn load(&mut self, id: &SourceId) -> Result<(), PlaybackError> {
        let state = self.sound(id)?.load_state();
        match state {
            LoadState::Unloaded => self.begin_load(id),
            LoadState::Failed => Err(PlaybackError::SourceFailed(id.clone())),
            LoadState::Loading | LoadState::Ready => Ok(()),
        }
    }

    /// Loads a sound again from scratch, stopping it first if it's playing.
    pub fn reload(&mut self, id: &SourceId) -> Result<(), PlaybackError> {
        let sound = self.sound(id)?;
        let kind = sound.kind();
        let state = sound.load_state();
        if sound.is_playing() {
            self.stop(id)?;
        }

        info!(id = id.as_str(), "Reloading sound.");
        self.loads.abandon(id);
        if !kind.is_external() {
            self.backend.release(id);
        }
        if let Some(next) = transition(state, LoadEvent::Reset) {
            self.set_load_state(id, next);
        }
        self.begin_load(id)
    }

    fn begin_load(&mut self, id: &SourceId) -> Result<(), PlaybackError> {
        let sound = self.sound(id)?;
        let Some(loading) = transition(sound.load_state(), LoadEvent::Begin) else {
            return Ok(());
        };

        // External media is opened by the player when it starts.
        if sound.kind().is_external() {
            self.set_load_state(id, LoadState::Ready);
            return Ok(());
        }

        let Some(path) = sound.origin().local_path().map(Path::to_path_buf) else {
            warn!(id = id.as_str(), "Local sound has no file.");
            self.set_load_state(id, LoadState::Failed);
            return Err(PlaybackError::SourceFailed(id.clone()));
        };

        let ticket = self.loads.begin(id);
        self.set_load_state(id, loading);
        debug!(id = id.as_str(), ticket, path = ?path, "Loading sound.");
        self.backend
            .begin_load(id, &path, ticket, self.completions_tx.clone());
        Ok(())
    }

    /// Plays a sound. Plays of sounds that are still loading wait for the load.
    pub fn play(&mut self, id: &SourceId) -> Result<(), PlaybackError> {
        let span = span!(Level::INFO, "play", id = id.as_str());
        let _enter = span.enter();

        let sound = self.sound(id)?;
        if sound.is_playing() {
            return Ok(());
        }

        match sound.load_state() {
            LoadState::Ready => self.start(id),
            LoadState::Failed => {
                let name = sound.name().to_string();
                self.notify(
                    "Can't play sound",
                    &format!("{} couldn't be loaded.", name),
                    Severity::Error,
                );
                Err(PlaybackError::SourceFailed(id.clone()))
            }
            LoadState::Loading => {
                self.loads.defer_play(id, Instant::now());
                Ok(())
            }
            LoadState::Unloaded => {
                self.begin_load(id)?;
                if self.sound(id)?.load_state() == LoadState::Ready {
                    self.start(id)
                } else {
                    self.loads.defer_play(id, Instant::now());
                    Ok(())
                }
            }
        }
    }

    fn start(&mut self, id: &SourceId) -> Result<(), PlaybackError> {
        let sound = self.sound(id)?;
        let kind = sound.kind();
        let looped = sound.is_looped();
        let name = sound.name().to_string();
        let gain = self.state.effective(sound.volume());

        let result = if kind.is_external() {
            self.stop_other_externals(id);
            match self.adapters.get_mut(id) {
                Some(adapter) => adapter
                    .start(self.player.as_mut(), gain, looped)
                    .map_err(|e| e.to_string()),
                None => Err("no external player adapter".to_string()),
            }
        } else {
            self.backend
                .start(id, gain, looped)
                .map_err(|e| e.to_string())
        };

        match result {
            Ok(()) => {
                self.update(id, |sound| sound.set_playing(true));
                info!(id = id.as_str(), gain, looped, "Started sound.");
                Ok(())
            }
            Err(reason) => {
                self.update(id, |sound| sound.set_playing(false));
                self.notify(
                    "Playback failed",
                    &format!("{} couldn't start: {}", name, reason),
                    Severity::Error,
                );
                Err(PlaybackError::Rejected {
                    id: id.clone(),
                    reason,
                })
            }
        }
    }

    fn stop_other_externals(&mut self, id: &SourceId) {
        let others: Vec<SourceId> = self
            .registry
            .iter()
            .filter(|sound| sound.kind().is_external() && sound.id() != id)
            .filter(|sound| sound.is_playing() || self.loads.is_deferred(sound.id()))
            .map(|sound| sound.id().clone())
            .collect();
        for other in others {
            debug!(id = other.as_str(), "Stopping other external sound.");
            if let Err(e) = self.stop(&other) {
                warn!(id = other.as_str(), err = %e, "Unable to stop external sound");
            }
        }
    }

    /// Stops a sound and cancels any play waiting on its load.
    pub fn stop(&mut self, id: &SourceId) -> Result<(), PlaybackError> {
        let kind = self.sound(id)?.kind();
        self.loads.take_deferred(id);
        if kind.is_external() {
            if let Some(adapter) = self.adapters.get_mut(id) {
                adapter.stop();
            }
        } else {
            self.backend.stop(id);
        }
        if self.sound(id)?.is_playing() {
            self.update(id, |sound| sound.set_playing(false));
            info!(id = id.as_str(), "Stopped sound.");
        }
        Ok(())
    }

    /// Plays a stopped sound or stops a playing one. Returns whether it's now playing
    /// or waiting to play.
    pub fn toggle(&mut self, id: &SourceId) -> Result<bool, PlaybackError> {
        if self.sound(id)?.is_playing() || self.loads.is_deferred(id) {
            self.stop(id)?;
            Ok(false)
        } else {
            self.play(id)?;
            Ok(true)
        }
    }

    /// Stops every sound.
    pub fn stop_all(&mut self) {
        for id in self.loads.cancel_all_deferred() {
            debug!(id = id.as_str(), "Cancelled deferred play.");
        }
        for id in self.registry.playing_ids() {
            if let Err(e) = self.stop(&id) {
                warn!(id = id.as_str(), err = %e, "Unable to stop sound");
            }
        }
    }

    /// Stores a sound's volume and applies it if it's playing.
    pub fn set_volume(&mut self, id: &SourceId, volume: f32) -> Result<(), PlaybackError> {
        let sound = self.sound(id)?;
        if sound.load_state() == LoadState::Failed {
            let name = sound.name().to_string();
            self.notify(
                "Can't change volume",
                &format!("{} couldn't be loaded.", name),
                Severity::Error,
            );
            return Err(PlaybackError::SourceFailed(id.clone()));
        }

        self.update(id, |sound| sound.set_volume(volume));
        if self.sound(id)?.is_playing() {
            self.apply_gain(id);
        }
        Ok(())
    }

    /// Stores whether a sound repeats and applies it if it's playing.
    pub fn set_looped(&mut self, id: &SourceId, looped: bool) -> Result<(), PlaybackError> {
        let sound = self.sound(id)?;
        let kind = sound.kind();
        let playing = sound.is_playing();
        self.update(id, |sound| sound.set_looped(looped));
        if !playing {
            return Ok(());
        }

        let result = if kind.is_external() {
            match self.adapters.get_mut(id) {
                Some(adapter) => adapter.set_looped(looped).map_err(|e| e.to_string()),
                None => Ok(()),
            }
        } else {
            self.backend
                .set_looped(id, looped)
                .map_err(|e| e.to_string())
        };
        if let Err(e) = result {
            warn!(id = id.as_str(), err = e, "Unable to apply loop setting");
        }
        Ok(())
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.state.set_master_volume(volume);
        info!(master_volume = self.state.master_volume(), "Master volume changed.");
        self.reapply_all();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.state.set_muted(muted);
        info!(muted, "Mute changed.");
        self.reapply_all();
    }

    /// Flips mute and returns the new value.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.state.is_muted();
        self.set_muted(muted);
        muted
    }

    pub fn set_active_category(&mut self, filter: CategoryFilter) {
        self.state.set_active_category(filter);
    }

    fn reapply_all(&mut self) {
        for id in self.registry.playing_ids() {
            self.apply_gain(&id);
        }
    }

    /// Pushes a sound's effective volume to its output. Failures are logged only.
    fn apply_gain(&mut self, id: &SourceId) {
        let Some(sound) = self.registry.get(id) else {
            return;
        };
        let gain = self.state.effective(sound.volume());
        if sound.kind().is_external() {
            if let Some(adapter) = self.adapters.get_mut(id) {
                adapter.set_volume(gain, Instant::now());
            }
        } else if let Err(e) = self.backend.set_gain(id, gain) {
            warn!(id = id.as_str(), gain, err = %e, "Unable to apply volume");
        }
    }

    /// The gain a sound would play at right now.
    pub fn effective_volume(&self, id: &SourceId) -> Option<f32> {
        self.registry
            .get(id)
            .map(|sound| self.state.effective(sound.volume()))
    }

    /// Processes finished loads, sounds that played to their end, expired deferred plays
    /// and external volume checks.
    pub fn pump(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.on_load_complete(completion);
        }

        for id in self.backend.finished() {
            let playing = self.registry.get(&id).is_some_and(|sound| sound.is_playing());
            if playing {
                self.update(&id, |sound| sound.set_playing(false));
                info!(id = id.as_str(), "Sound finished.");
            }
        }

        let now = Instant::now();
        for id in self.loads.expired(now) {
            self.on_load_timeout(&id);
        }

        let mut degraded = Vec::new();
        for (id, adapter) in self.adapters.iter_mut() {
            if let Some(degradation) = adapter.poll(now) {
                degraded.push((id.clone(), degradation));
            }
        }
        for (id, degradation) in degraded {
            if let Degradation::Notify { .. } = degradation {
                let name = self
                    .registry
                    .get(&id)
                    .map(|sound| sound.name().to_string())
                    .unwrap_or_else(|| id.to_string());
                self.notify(
                    "Volume control limited",
                    &format!(
                        "{} may not follow the volume slider. Use your system volume to adjust it.",
                        name
                    ),
                    Severity::Warning,
                );
            }
        }
    }

    fn on_load_complete(&mut self, completion: LoadCompletion) {
        let LoadCompletion { id, ticket, result } = completion;
        if !self.loads.accept(&id, ticket) {
            debug!(id = id.as_str(), ticket, "Discarding stale load completion.");
            return;
        }
        let Some(sound) = self.registry.get(&id) else {
            return;
        };
        let kind = sound.kind();
        let name = sound.name().to_string();
        let state = sound.load_state();

        match result {
            Ok(()) => {
                if let Some(next) = transition(state, LoadEvent::Succeeded) {
                    self.set_load_state(&id, next);
                }
                debug!(id = id.as_str(), "Sound loaded.");
                if self.loads.take_deferred(&id) {
                    if let Err(e) = self.start(&id) {
                        debug!(id = id.as_str(), err = %e, "Deferred play didn't start.");
                    }
                }
            }
            Err(e) => {
                if let Some(next) = transition(state, LoadEvent::Failed) {
                    self.set_load_state(&id, next);
                }
                self.loads.take_deferred(&id);
                if kind == SourceKind::BuiltinLocal {
                    debug!(id = id.as_str(), err = %e, "Built-in sound failed to load.");
                } else {
                    warn!(id = id.as_str(), err = %e, "Sound failed to load.");
                    self.notify(
                        "Couldn't load sound",
                        &format!("{}: {}", name, e),
                        Severity::Error,
                    );
                }
            }
        }
    }

    fn on_load_timeout(&mut self, id: &SourceId) {
        let Some(sound) = self.registry.get(id) else {
            return;
        };
        let name = sound.name().to_string();
        if let Some(next) = transition(sound.load_state(), LoadEvent::TimedOut) {
            self.set_load_state(id, next);
        }
        self.backend.release(id);

        let err = PlaybackError::Timeout {
            id: id.clone(),
            after: self.loads.timeout(),
        };
        warn!(id = id.as_str(), err = %err, "Load timed out.");
        self.notify(
            "Sound took too long",
            &format!("{} didn't load in time.", name),
            Severity::Error,
        );
    }

    /// Stops, releases and unregisters a sound. Built-in sounds are left alone.
    pub fn remove(&mut self, id: &SourceId) -> Result<Sound, RegistryError> {
        let sound = self
            .registry
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        if sound.is_default() {
            return Err(RegistryError::Protected(id.clone()));
        }
        let kind = sound.kind();

        if let Err(e) = self.stop(id) {
            warn!(id = id.as_str(), err = %e, "Unable to stop sound before removal");
        }
        self.loads.abandon(id);
        if kind.is_external() {
            self.adapters.remove(id);
        } else {
            self.backend.release(id);
        }
        let sound = self.registry.unregister(id)?;
        info!(id = id.as_str(), "Removed sound.");
        Ok(sound)
    }

    /// Plays a file once at the given gain, outside of the registry.
    pub fn play_one_shot(&mut self, path: &Path, gain: f32) -> Result<(), Box<dyn Error>> {
        self.backend.play_one_shot(path, gain)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            active_sources: self.registry.playing_ids(),
            master_volume: self.state.master_volume(),
            is_muted: self.state.is_muted(),
            active_category: self.state.active_category(),
        }
    }

    pub(crate) fn notify(&mut self, title: &str, message: &str, severity: Severity) {
        self.notifier.show_notification(title, message, severity);
    }

    fn sound(&self, id: &SourceId) -> Result<&Sound, PlaybackError> {
        self.registry
            .get(id)
            .ok_or_else(|| PlaybackError::NotFound(id.clone()))
    }

    fn set_load_state(&mut self, id: &SourceId, state: LoadState) {
        self.update(id, |sound| sound.set_load_state(state));
    }

    fn update<R, F>(&mut self, id: &SourceId, f: F)
    where
        F: FnOnce(&mut Sound) -> R,
    {
        if let Err(e) = self.registry.update(id, f) {
            debug!(err = %e, "Sound vanished during update.");
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::audio::mock::{self, LoadMode};
    use crate::error::LoadError;
    use crate::notify::RecordingNotifier;
    use crate::sound::{Category, Origin};

    struct Harness {
        controller: Controller,
        backend: mock::Backend,
        player: external::mock::Player,
        notifier: RecordingNotifier,
    }

    fn harness(mode: LoadMode) -> Harness {
        let backend = mock::Backend::with_mode("mock", mode);
        let player = external::mock::Player::default();
        let notifier = RecordingNotifier::default();
        let controller = Controller::new(
            Box::new(backend.clone()),
            Box::new(player.clone()),
            Box::new(notifier.clone()),
            EngineSettings::default(),
            Options::default(),
        );
        Harness {
            controller,
            backend,
            player,
            notifier,
        }
    }

    fn local(id: &str, kind: SourceKind) -> SoundDescriptor {
        SoundDescriptor::new(
            id,
            Category::Nature,
            kind,
            Origin::Path(PathBuf::from(format!("/sounds/{}.mp3", id))),
        )
        .with_id(id)
    }

    fn hosted(id: &str) -> SoundDescriptor {
        SoundDescriptor::new(
            id,
            Category::Music,
            SourceKind::ExternalHosted,
            Origin::Remote(format!("media-{}", id)),
        )
        .with_id(id)
    }

    #[test]
    fn test_play_ready_sound() {
        let mut h = harness(LoadMode::Immediate);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.play(&rain).unwrap();
        // Loads complete asynchronously.
        assert!(!h.controller.registry().get(&rain).unwrap().is_playing());

        h.controller.pump();
        let sound = h.controller.registry().get(&rain).unwrap();
        assert!(sound.is_playing());
        assert_eq!(sound.load_state(), LoadState::Ready);
        assert_eq!(h.backend.gain(&rain), Some(0.5));
        assert_eq!(h.backend.looped(&rain), Some(true));

        // Playing again is a no-op.
        h.controller.play(&rain).unwrap();
        assert_eq!(h.backend.playing_count(), 1);
    }

    #[test]
    fn test_stop_cancels_deferred_play() {
        let mut h = harness(LoadMode::Manual);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.play(&rain).unwrap();
        h.controller.stop(&rain).unwrap();

        assert!(h.backend.complete_load(&rain, Ok(())));
        h.controller.pump();
        let sound = h.controller.registry().get(&rain).unwrap();
        assert_eq!(sound.load_state(), LoadState::Ready);
        assert!(!sound.is_playing());
        assert!(!h.backend.is_playing(&rain));
    }

    #[test]
    fn test_builtin_load_failure_is_silent() {
        let mut h = harness(LoadMode::Manual);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.load(&rain).unwrap();
        h.backend
            .complete_load(&rain, Err(LoadError::Missing("/sounds/rain.mp3".into())));
        h.controller.pump();

        assert_eq!(
            h.controller.registry().get(&rain).unwrap().load_state(),
            LoadState::Failed
        );
        assert!(h.notifier.shown().is_empty());

        // No automatic retry, and the user hears about the failed play.
        assert_eq!(
            h.controller.play(&rain),
            Err(PlaybackError::SourceFailed(rain.clone()))
        );
        assert_eq!(h.notifier.count(Severity::Error), 1);
        assert!(h.backend.pending_loads().is_empty());
        assert_eq!(
            h.controller.load(&rain),
            Err(PlaybackError::SourceFailed(rain.clone()))
        );
    }

    #[test]
    fn test_custom_load_failure_notifies() {
        let mut h = harness(LoadMode::Manual);
        let mine = h
            .controller
            .register(local("mine", SourceKind::CustomLocal))
            .unwrap();
        h.controller.load(&mine).unwrap();
        h.backend.complete_load(
            &mine,
            Err(LoadError::Corrupt {
                path: "/sounds/mine.mp3".into(),
                reason: "bad header".into(),
            }),
        );
        h.controller.pump();
        assert_eq!(h.notifier.count(Severity::Error), 1);
        assert_eq!(
            h.controller.registry().get(&mine).unwrap().load_state(),
            LoadState::Failed
        );
    }

    #[test]
    fn test_reload_recovers_failed_sound() {
        let mut h = harness(LoadMode::Manual);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.load(&rain).unwrap();
        h.backend
            .complete_load(&rain, Err(LoadError::Missing("/sounds/rain.mp3".into())));
        h.controller.pump();

        h.controller.reload(&rain).unwrap();
        assert_eq!(
            h.controller.registry().get(&rain).unwrap().load_state(),
            LoadState::Loading
        );
        h.backend.complete_load(&rain, Ok(()));
        h.controller.pump();
        assert_eq!(
            h.controller.registry().get(&rain).unwrap().load_state(),
            LoadState::Ready
        );
    }

    #[test]
    fn test_start_failure_reverts_and_notifies() {
        let mut h = harness(LoadMode::Immediate);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.load(&rain).unwrap();
        h.controller.pump();

        h.backend.fail_start(&rain);
        assert!(matches!(
            h.controller.play(&rain),
            Err(PlaybackError::Rejected { .. })
        ));
        assert!(!h.controller.registry().get(&rain).unwrap().is_playing());
        assert_eq!(h.notifier.count(Severity::Error), 1);
    }

    #[test]
    fn test_deferred_start_failure_notifies_once() {
        let mut h = harness(LoadMode::Immediate);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.backend.fail_start(&rain);
        h.controller.play(&rain).unwrap();
        h.controller.pump();

        let sound = h.controller.registry().get(&rain).unwrap();
        assert_eq!(sound.load_state(), LoadState::Ready);
        assert!(!sound.is_playing());
        assert_eq!(h.notifier.count(Severity::Error), 1);
        assert_eq!(h.notifier.shown()[0].title, "Playback failed");
    }

    #[test]
    fn test_set_volume_keeps_value_when_apply_fails() {
        let mut h = harness(LoadMode::Immediate);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.play(&rain).unwrap();
        h.controller.pump();

        h.backend.fail_gain(&rain);
        h.controller.set_volume(&rain, 0.9).unwrap();
        assert_eq!(h.controller.registry().get(&rain).unwrap().volume(), 0.9);
        assert_eq!(h.backend.gain(&rain), Some(0.5));
        assert!(h.notifier.shown().is_empty());
    }

    #[test]
    fn test_set_volume_on_failed_sound() {
        let mut h = harness(LoadMode::CheckPath);
        let mine = h
            .controller
            .register(local("mine", SourceKind::CustomLocal))
            .unwrap();
        h.controller.load(&mine).unwrap();
        h.controller.pump();
        h.notifier.clear();

        assert_eq!(
            h.controller.set_volume(&mine, 0.2),
            Err(PlaybackError::SourceFailed(mine.clone()))
        );
        assert_eq!(h.controller.registry().get(&mine).unwrap().volume(), 0.5);
        assert_eq!(h.notifier.count(Severity::Error), 1);
    }

    #[test]
    fn test_master_and_mute_reapply_to_playing_sounds() {
        let mut h = harness(LoadMode::Immediate);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        let forest = h
            .controller
            .register(local("forest", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.play(&rain).unwrap();
        h.controller.play(&forest).unwrap();
        h.controller.pump();

        h.backend.fail_gain(&rain);
        h.controller.set_master_volume(0.5);
        // One failing sound doesn't stop the rest.
        assert_eq!(h.backend.gain(&forest), Some(0.25));

        assert!(h.controller.toggle_mute());
        assert_eq!(h.backend.gain(&forest), Some(0.0));
        assert!(!h.controller.toggle_mute());
        assert_eq!(h.backend.gain(&forest), Some(0.25));
    }

    #[test]
    fn test_set_looped_applies_to_playing_sound() {
        let mut h = harness(LoadMode::Immediate);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.set_looped(&rain, false).unwrap();
        h.controller.play(&rain).unwrap();
        h.controller.pump();
        assert_eq!(h.backend.looped(&rain), Some(false));

        h.controller.set_looped(&rain, true).unwrap();
        assert_eq!(h.backend.looped(&rain), Some(true));
        assert!(h.controller.registry().get(&rain).unwrap().is_looped());
    }

    #[test]
    fn test_one_external_at_a_time() {
        let mut h = harness(LoadMode::Immediate);
        let lofi = h.controller.register(hosted("lofi")).unwrap();
        let jazz = h.controller.register(hosted("jazz")).unwrap();
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.play(&rain).unwrap();
        h.controller.pump();

        h.controller.play(&lofi).unwrap();
        assert!(h.controller.registry().get(&lofi).unwrap().is_playing());
        h.controller.play(&jazz).unwrap();

        let registry = h.controller.registry();
        assert!(!registry.get(&lofi).unwrap().is_playing());
        assert!(registry.get(&jazz).unwrap().is_playing());
        assert!(registry.get(&rain).unwrap().is_playing());
        assert_eq!(h.player.live_sessions(), 1);
        assert_eq!(h.player.opened().len(), 2);
    }

    #[test]
    fn test_external_open_failure() {
        let mut h = harness(LoadMode::Immediate);
        let lofi = h.controller.register(hosted("lofi")).unwrap();
        h.player.set_fail_open(true);
        assert!(matches!(
            h.controller.play(&lofi),
            Err(PlaybackError::Rejected { .. })
        ));
        assert!(!h.controller.registry().get(&lofi).unwrap().is_playing());
        assert_eq!(h.notifier.count(Severity::Error), 1);
    }

    #[test]
    fn test_toggle_and_stop_all() {
        let mut h = harness(LoadMode::Immediate);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        let lofi = h.controller.register(hosted("lofi")).unwrap();
        assert!(h.controller.toggle(&rain).unwrap());
        h.controller.pump();
        h.controller.play(&lofi).unwrap();
        assert_eq!(h.controller.snapshot().active_sources, vec![rain.clone(), lofi.clone()]);

        assert!(!h.controller.toggle(&rain).unwrap());
        h.controller.stop_all();
        assert!(h.controller.snapshot().active_sources.is_empty());
        assert_eq!(h.player.live_sessions(), 0);
        assert_eq!(h.backend.playing_count(), 0);
    }

    #[test]
    fn test_remove_force_stops_and_releases() {
        let mut h = harness(LoadMode::Immediate);
        let mine = h
            .controller
            .register(local("mine", SourceKind::CustomLocal))
            .unwrap();
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.play(&mine).unwrap();
        h.controller.pump();

        assert_eq!(
            h.controller.remove(&rain).err(),
            Some(RegistryError::Protected(rain.clone()))
        );
        let removed = h.controller.remove(&mine).unwrap();
        assert!(!removed.is_playing());
        assert!(!h.backend.is_playing(&mine));
        assert_eq!(h.backend.released(), vec![mine.clone()]);
        assert!(!h.controller.registry().contains(&mine));
    }

    #[test]
    fn test_listeners_are_notified() {
        let mut h = harness(LoadMode::Immediate);
        let (tx, rx) = crossbeam_channel::unbounded();
        h.controller.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        assert_eq!(rx.try_recv(), Ok(RegistryEvent::Registered(rain.clone())));
        h.controller.set_volume(&rain, 0.3).unwrap();
        assert_eq!(rx.try_recv(), Ok(RegistryEvent::Updated(rain)));
    }

    #[test]
    fn test_one_shot_sound_stops_at_its_end() {
        let mut h = harness(LoadMode::Immediate);
        let rain = h
            .controller
            .register(local("rain", SourceKind::BuiltinLocal))
            .unwrap();
        let bell = h
            .controller
            .register(local("bell", SourceKind::BuiltinLocal))
            .unwrap();
        h.controller.set_looped(&bell, false).unwrap();
        h.controller.play(&rain).unwrap();
        h.controller.play(&bell).unwrap();
        h.controller.pump();

        // Looped sounds never run out.
        assert!(!h.backend.finish(&rain));
        assert!(h.backend.finish(&bell));
        h.controller.pump();
        assert!(!h.controller.registry().get(&bell).unwrap().is_playing());
        assert_eq!(h.controller.snapshot().active_sources, vec![rain.clone()]);

        // One toggle brings it back.
        assert!(h.controller.toggle(&bell).unwrap());
        assert!(h.backend.is_playing(&bell));
        assert!(h.controller.registry().get(&bell).unwrap().is_playing());
        h.controller.pump();
        assert!(h.controller.registry().get(&bell).unwrap().is_playing());
    }
}
