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
use std::path::PathBuf;
use std::time::Duration;

use crate::sound::SourceId;

/// Errors from the sound registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a sound with id {0} already exists")]
    DuplicateId(SourceId),

    #[error("sound {0} not found")]
    NotFound(SourceId),

    #[error("sound {0} is built in and can't be removed")]
    Protected(SourceId),

    #[error("sound {0} is still playing")]
    SourceBusy(SourceId),
}

/// Errors from loading a sound's audio.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("audio file {} not found", .0.display())]
    Missing(PathBuf),

    #[error("audio file {} can't be decoded: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Errors from starting or adjusting playback.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("sound {0} not found")]
    NotFound(SourceId),

    #[error("sound {0} failed to load")]
    SourceFailed(SourceId),

    #[error("sound {id} couldn't start: {reason}")]
    Rejected { id: SourceId, reason: String },

    #[error("sound {id} didn't load within {after:?}")]
    Timeout { id: SourceId, after: Duration },

    #[error("no notification sound is configured for {0}")]
    NoNotificationSound(String),
}

/// Errors from importing a file.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{file}: unsupported format '{extension}'")]
    UnsupportedFormat { file: String, extension: String },

    #[error("{file}: couldn't create a resource for the sound: {source}")]
    ResourceCreation {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors from the preset manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresetError {
    #[error("no sounds are playing")]
    NoActiveSources,

    #[error("preset '{0}' not found")]
    NotFound(String),

    #[error("preset names can't be blank")]
    InvalidName,
}

/// Errors from the external player side-channel.
#[derive(Debug, thiserror::Error)]
pub enum ExternalError {
    #[error("external player couldn't start: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("external player control channel unavailable: {0}")]
    Unavailable(String),

    #[error("external player has no direct control path")]
    Unsupported,

    #[error("external player didn't confirm volume {requested:.2} in time")]
    ControlDegraded { requested: f32 },

    #[error("external player I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Any error the engine reports to its callers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error(transparent)]
    External(#[from] ExternalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("removal of {0} was cancelled")]
    Cancelled(SourceId),
}
