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
use std::path::Path;

use serde::Deserialize;

use super::ConfigError;
use crate::sound::{Category, Origin, SoundDescriptor, SourceKind};

/// A YAML representation of a sound shipped with the application.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct BuiltinSound {
    /// The fixed id of the sound.
    id: String,

    /// The display name.
    name: String,

    /// The category the sound is filed under.
    #[serde(default)]
    category: Category,

    /// An audio file, relative to the sounds directory.
    file: Option<String>,

    /// A remote-media identifier played by the external player.
    media: Option<String>,
}

impl BuiltinSound {
    pub fn local(id: &str, name: &str, category: Category, file: &str) -> BuiltinSound {
        BuiltinSound {
            id: id.to_string(),
            name: name.to_string(),
            category,
            file: Some(file.to_string()),
            media: None,
        }
    }

    pub fn hosted(id: &str, name: &str, category: Category, media: &str) -> BuiltinSound {
        BuiltinSound {
            id: id.to_string(),
            name: name.to_string(),
            category,
            file: None,
            media: Some(media.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Builds the registry descriptor. Built-ins are never deletable.
    pub fn descriptor(&self, sounds_dir: &Path) -> Result<SoundDescriptor, ConfigError> {
        let (kind, origin) = match (&self.file, &self.media) {
            (Some(file), None) => (SourceKind::BuiltinLocal, Origin::Path(sounds_dir.join(file))),
            (None, Some(media)) => (SourceKind::ExternalHosted, Origin::Remote(media.clone())),
            _ => return Err(ConfigError::BuiltinSource(self.id.clone())),
        };
        Ok(
            SoundDescriptor::new(self.name.clone(), self.category, kind, origin)
                .with_id(self.id.as_str())
                .default_sound(true),
        )
    }
}

/// The sounds shipped with the application.
pub fn default_manifest() -> Vec<BuiltinSound> {
    vec![
        BuiltinSound::local("rain", "Rain", Category::Nature, "rain.mp3"),
        BuiltinSound::local("thunder", "Thunder", Category::Nature, "thunder.mp3"),
        BuiltinSound::local("forest", "Forest", Category::Nature, "forest.mp3"),
        BuiltinSound::local("ocean", "Ocean Waves", Category::Nature, "ocean.mp3"),
        BuiltinSound::local("birds", "Birds", Category::Nature, "birds.mp3"),
        BuiltinSound::local("fireplace", "Fireplace", Category::Ambient, "fireplace.mp3"),
        BuiltinSound::local("cafe", "Coffee Shop", Category::Ambient, "cafe.mp3"),
        BuiltinSound::local("white-noise", "White Noise", Category::Ambient, "white-noise.mp3"),
        BuiltinSound::local("piano", "Soft Piano", Category::Music, "piano.mp3"),
        BuiltinSound::local(
            "affirmations",
            "Daily Affirmations",
            Category::Affirmations,
            "affirmations.mp3",
        ),
        BuiltinSound::hosted("lofi", "Lofi Radio", Category::Music, "jfKfPfyJRdk"),
    ]
}
