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
use std::{
    collections::{HashMap, HashSet},
    error::Error,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::{info, span, Level};

use super::{LoadCompletion, LoadReporter};
use crate::error::LoadError;
use crate::sound::SourceId;

/// How the mock answers load requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Every load succeeds as soon as it's requested.
    Immediate,
    /// Loads succeed only if the file exists.
    CheckPath,
    /// Loads stay pending until completed by hand.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Voice {
    gain: f32,
    looped: bool,
}

struct State {
    mode: LoadMode,
    loaded: HashSet<SourceId>,
    pending: HashMap<SourceId, (u64, LoadReporter)>,
    voices: HashMap<SourceId, Voice>,
    one_shots: Vec<(PathBuf, f32)>,
    fail_start: HashSet<SourceId>,
    fail_gain: HashSet<SourceId>,
    finished: Vec<SourceId>,
    released: Vec<SourceId>,
}

/// A mock backend. Doesn't actually play anything.
#[derive(Clone)]
pub struct Backend {
    name: String,
    state: Arc<Mutex<State>>,
}

impl Backend {
    /// Gets the given mock backend. Loads check that the file exists.
    pub fn get(name: &str) -> Backend {
        Backend::with_mode(name, LoadMode::CheckPath)
    }

    pub fn with_mode(name: &str, mode: LoadMode) -> Backend {
        Backend {
            name: name.to_string(),
            state: Arc::new(Mutex::new(State {
                mode,
                loaded: HashSet::new(),
                pending: HashMap::new(),
                voices: HashMap::new(),
                one_shots: Vec::new(),
                fail_start: HashSet::new(),
                fail_gain: HashSet::new(),
                finished: Vec::new(),
                released: Vec::new(),
            })),
        }
    }

    /// Completes a pending load by hand. Returns false if nothing was pending.
    pub fn complete_load(&self, id: &SourceId, result: Result<(), LoadError>) -> bool {
        let mut state = self.state.lock();
        let Some((ticket, reporter)) = state.pending.remove(id) else {
            return false;
        };
        if result.is_ok() {
            state.loaded.insert(id.clone());
        }
        let _ = reporter.send(LoadCompletion {
            id: id.clone(),
            ticket,
            result,
        });
        true
    }

    pub fn pending_loads(&self) -> Vec<SourceId> {
        let mut pending: Vec<SourceId> = self.state.lock().pending.keys().cloned().collect();
        pending.sort();
        pending
    }

    pub fn is_playing(&self, id: &SourceId) -> bool {
        self.state.lock().voices.contains_key(id)
    }

    pub fn gain(&self, id: &SourceId) -> Option<f32> {
        self.state.lock().voices.get(id).map(|voice| voice.gain)
    }

    pub fn looped(&self, id: &SourceId) -> Option<bool> {
        self.state.lock().voices.get(id).map(|voice| voice.looped)
    }

    pub fn playing_count(&self) -> usize {
        self.state.lock().voices.len()
    }

    pub fn one_shots(&self) -> Vec<(PathBuf, f32)> {
        self.state.lock().one_shots.clone()
    }

    pub fn released(&self) -> Vec<SourceId> {
        self.state.lock().released.clone()
    }

    /// Makes future starts of the sound fail.
    pub fn fail_start(&self, id: &SourceId) {
        self.state.lock().fail_start.insert(id.clone());
    }

    /// Makes future gain changes for the sound fail.
    pub fn fail_gain(&self, id: &SourceId) {
        self.state.lock().fail_gain.insert(id.clone());
    }

    /// Runs a playing sound to its end. Looped sounds keep going. Returns whether the
    /// sound finished.
    pub fn finish(&self, id: &SourceId) -> bool {
        let mut state = self.state.lock();
        match state.voices.get(id) {
            Some(voice) if !voice.looped => {
                state.voices.remove(id);
                state.finished.push(id.clone());
                true
            }
            _ => false,
        }
    }
}

impl super::Backend for Backend {
    fn begin_load(&mut self, id: &SourceId, path: &Path, ticket: u64, reporter: LoadReporter) {
        let span = span!(Level::INFO, "load sound (mock)");
        let _enter = span.enter();
        info!(device = self.name, id = id.as_str(), path = ?path, "Loading sound.");

        let mut state = self.state.lock();
        let result = match state.mode {
            LoadMode::Manual => {
                state.pending.insert(id.clone(), (ticket, reporter));
                return;
            }
            LoadMode::Immediate => Ok(()),
            LoadMode::CheckPath if path.exists() => Ok(()),
            LoadMode::CheckPath => Err(LoadError::Missing(path.to_path_buf())),
        };
        if result.is_ok() {
            state.loaded.insert(id.clone());
        }
        let _ = reporter.send(LoadCompletion {
            id: id.clone(),
            ticket,
            result,
        });
    }

    fn start(&mut self, id: &SourceId, gain: f32, looped: bool) -> Result<(), Box<dyn Error>> {
        let mut state = self.state.lock();
        if state.fail_start.contains(id) {
            return Err(format!("mock refused to start {}", id).into());
        }
        if !state.loaded.contains(id) {
            return Err(format!("sound {} isn't loaded", id).into());
        }
        state.finished.retain(|done| done != id);
        state.voices.insert(id.clone(), Voice { gain, looped });
        Ok(())
    }

    fn stop(&mut self, id: &SourceId) {
        self.state.lock().voices.remove(id);
    }

    fn set_gain(&mut self, id: &SourceId, gain: f32) -> Result<(), Box<dyn Error>> {
        let mut state = self.state.lock();
        if state.fail_gain.contains(id) {
            return Err(format!("mock refused gain for {}", id).into());
        }
        if let Some(voice) = state.voices.get_mut(id) {
            voice.gain = gain;
        }
        Ok(())
    }

    fn set_looped(&mut self, id: &SourceId, looped: bool) -> Result<(), Box<dyn Error>> {
        if let Some(voice) = self.state.lock().voices.get_mut(id) {
            voice.looped = looped;
        }
        Ok(())
    }

    fn finished(&mut self) -> Vec<SourceId> {
        std::mem::take(&mut self.state.lock().finished)
    }

    fn release(&mut self, id: &SourceId) {
        let mut state = self.state.lock();
        state.voices.remove(id);
        state.loaded.remove(id);
        state.pending.remove(id);
        state.released.push(id.clone());
    }

    fn play_one_shot(&mut self, path: &Path, gain: f32) -> Result<(), Box<dyn Error>> {
        self.state.lock().one_shots.push((path.to_path_buf(), gain));
        Ok(())
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
