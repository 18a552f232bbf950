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

//! The source of truth for which sounds exist.

use tracing::debug;

use crate::error::RegistryError;
use crate::sound::{Sound, SoundDescriptor, SourceId};
use crate::state::CategoryFilter;

/// A change to the registry that observers are told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered(SourceId),
    Updated(SourceId),
    Unregistered(SourceId),
}

type Listener = Box<dyn FnMut(&RegistryEvent) + Send>;

/// Holds every registered sound in registration order.
#[derive(Default)]
pub struct Registry {
    sounds: Vec<Sound>,
    listeners: Vec<Listener>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Registers a listener that's called after every change.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&RegistryEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Adds a sound. A descriptor without an id gets a freshly generated one.
    pub fn register(&mut self, descriptor: SoundDescriptor) -> Result<SourceId, RegistryError> {
        let id = match descriptor.id.clone() {
            Some(id) => {
                if self.contains(&id) {
                    return Err(RegistryError::DuplicateId(id));
                }
                id
            }
            None => self.generate_id(),
        };

        debug!(
            id = id.as_str(),
            name = descriptor.name,
            category = descriptor.category.as_str(),
            "Registering sound."
        );
        self.sounds.push(Sound::from_descriptor(id.clone(), descriptor));
        self.emit(RegistryEvent::Registered(id.clone()));
        Ok(id)
    }

    /// Removes a sound, returning its record. Dropping the record releases any
    /// transient resource behind it.
    pub fn unregister(&mut self, id: &SourceId) -> Result<Sound, RegistryError> {
        let index = self
            .position(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        let sound = &self.sounds[index];
        if sound.is_default() {
            return Err(RegistryError::Protected(id.clone()));
        }
        if sound.is_playing() {
            return Err(RegistryError::SourceBusy(id.clone()));
        }

        let sound = self.sounds.remove(index);
        debug!(id = id.as_str(), "Unregistered sound.");
        self.emit(RegistryEvent::Unregistered(id.clone()));
        Ok(sound)
    }

    pub fn get(&self, id: &SourceId) -> Option<&Sound> {
        self.sounds.iter().find(|sound| sound.id() == id)
    }

    pub fn contains(&self, id: &SourceId) -> bool {
        self.position(id).is_some()
    }

    /// The sounds matching the filter, in registration order.
    pub fn list(&self, filter: CategoryFilter) -> Vec<&Sound> {
        self.sounds
            .iter()
            .filter(|sound| filter.matches(sound.category()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sound> {
        self.sounds.iter()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// The ids of every playing sound, in registration order.
    pub fn playing_ids(&self) -> Vec<SourceId> {
        self.sounds
            .iter()
            .filter(|sound| sound.is_playing())
            .map(|sound| sound.id().clone())
            .collect()
    }

    /// Mutates a sound in place and notifies listeners.
    pub(crate) fn update<R, F>(&mut self, id: &SourceId, f: F) -> Result<R, RegistryError>
    where
        F: FnOnce(&mut Sound) -> R,
    {
        let index = self
            .position(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        let result = f(&mut self.sounds[index]);
        self.emit(RegistryEvent::Updated(id.clone()));
        Ok(result)
    }

    /// Generates an id for an imported sound that no other sound uses.
    pub fn generate_id(&self) -> SourceId {
        loop {
            let id = SourceId::new(format!(
                "custom-{}-{:08x}",
                chrono::Utc::now().timestamp_millis(),
                rand::random::<u32>()
            ));
            if !self.contains(&id) {
                return id;
            }
        }
    }

    fn position(&self, id: &SourceId) -> Option<usize> {
        self.sounds.iter().position(|sound| sound.id() == id)
    }

    fn emit(&mut self, event: RegistryEvent) {
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}
