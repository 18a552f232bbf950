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

//! The sound source data model.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tempfile::TempPath;

use crate::volume::clamp_volume;

/// The volume a freshly registered sound starts at.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// A stable, unique identifier for a sound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> SourceId {
        SourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        SourceId(id.to_string())
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        SourceId(id)
    }
}

/// The category a sound is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nature,
    #[default]
    Ambient,
    Music,
    Affirmations,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Nature,
        Category::Ambient,
        Category::Music,
        Category::Affirmations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Nature => "nature",
            Category::Ambient => "ambient",
            Category::Music => "music",
            Category::Affirmations => "affirmations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// How a sound is sourced and controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Shipped with the application.
    BuiltinLocal,
    /// Imported by the user from a file.
    CustomLocal,
    /// Rendered by an external player this engine can't directly control.
    ExternalHosted,
}

impl SourceKind {
    pub fn is_external(&self) -> bool {
        matches!(self, SourceKind::ExternalHosted)
    }
}

/// Asynchronous load state of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Unloaded => write!(f, "unloaded"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Ready => write!(f, "ready"),
            LoadState::Failed => write!(f, "failed"),
        }
    }
}

/// Where a sound's audio comes from.
#[derive(Debug)]
pub enum Origin {
    /// A stable path on disk.
    Path(PathBuf),
    /// A generated locator for a transient handle. The backing file is deleted on drop.
    Transient(TempPath),
    /// A remote-media identifier rendered by the external player.
    Remote(String),
}

impl Origin {
    /// The serialized origin token.
    pub fn token(&self) -> String {
        match self {
            Origin::Path(path) => path.display().to_string(),
            Origin::Transient(path) => path.display().to_string(),
            Origin::Remote(media) => media.clone(),
        }
    }

    /// The local file backing this origin, if any.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Origin::Path(path) => Some(path.as_path()),
            Origin::Transient(path) => Some(&**path),
            Origin::Remote(_) => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Origin::Transient(_))
    }
}

/// Everything needed to register a new sound.
#[derive(Debug)]
pub struct SoundDescriptor {
    /// An explicit id. When absent the registry generates one.
    pub id: Option<SourceId>,
    pub name: String,
    pub category: Category,
    pub kind: SourceKind,
    pub origin: Origin,
    pub volume: f32,
    pub looped: bool,
    /// Default sounds can never be removed.
    pub is_default: bool,
}

impl SoundDescriptor {
    pub fn new(
        name: impl Into<String>,
        category: Category,
        kind: SourceKind,
        origin: Origin,
    ) -> Self {
        SoundDescriptor {
            id: None,
            name: name.into(),
            category,
            kind,
            origin,
            volume: DEFAULT_VOLUME,
            looped: true,
            is_default: kind == SourceKind::BuiltinLocal,
        }
    }

    pub fn with_id(mut self, id: impl Into<SourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn default_sound(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

/// A registered sound and its mutable playback state.
#[derive(Debug)]
pub struct Sound {
    id: SourceId,
    name: String,
    category: Category,
    kind: SourceKind,
    origin: Origin,
    volume: f32,
    looped: bool,
    playing: bool,
    load_state: LoadState,
    is_default: bool,
}

impl Sound {
    pub(crate) fn from_descriptor(id: SourceId, descriptor: SoundDescriptor) -> Sound {
        Sound {
            id,
            name: descriptor.name,
            category: descriptor.category,
            kind: descriptor.kind,
            origin: descriptor.origin,
            volume: clamp_volume(descriptor.volume),
            looped: descriptor.looped,
            playing: false,
            load_state: LoadState::Unloaded,
            is_default: descriptor.is_default,
        }
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    pub(crate) fn set_looped(&mut self, looped: bool) {
        self.looped = looped;
    }

    /// Marks the sound as playing or stopped. A sound can only play once it is ready.
    pub(crate) fn set_playing(&mut self, playing: bool) -> bool {
        if playing && self.load_state != LoadState::Ready {
            return false;
        }
        self.playing = playing;
        true
    }

    pub(crate) fn set_load_state(&mut self, load_state: LoadState) {
        if load_state != LoadState::Ready {
            self.playing = false;
        }
        self.load_state = load_state;
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, volume {:.0}%, {}{})",
            self.name,
            self.id,
            self.category,
            self.volume * 100.0,
            self.load_state,
            if self.playing { ", playing" } else { "" }
        )
    }
}
