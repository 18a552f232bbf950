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

//! Engine-wide mixer state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sound::{Category, SourceId};
use crate::volume::{clamp_volume, effective_volume};

/// Filters the sound list by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(only) => *only == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => category.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        Ok(CategoryFilter::Only(s.parse()?))
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.to_string()
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The engine settings that survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    pub master_volume: f32,
    pub is_muted: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            master_volume: 1.0,
            is_muted: false,
        }
    }
}

/// Master volume, mute and the UI category filter. Owned by the playback controller.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    settings: EngineSettings,
    active_category: CategoryFilter,
}

impl EngineState {
    pub fn new(settings: EngineSettings) -> EngineState {
        EngineState {
            settings: EngineSettings {
                master_volume: clamp_volume(settings.master_volume),
                is_muted: settings.is_muted,
            },
            active_category: CategoryFilter::All,
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.settings.master_volume
    }

    pub fn is_muted(&self) -> bool {
        self.settings.is_muted
    }

    pub fn active_category(&self) -> CategoryFilter {
        self.active_category
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Composes a sound's own volume with the master gate.
    pub fn effective(&self, source_volume: f32) -> f32 {
        effective_volume(source_volume, self.settings.master_volume, self.settings.is_muted)
    }

    pub(crate) fn set_master_volume(&mut self, volume: f32) {
        self.settings.master_volume = clamp_volume(volume);
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.settings.is_muted = muted;
    }

    pub(crate) fn set_active_category(&mut self, filter: CategoryFilter) {
        self.active_category = filter;
    }
}

/// Read-only view of the engine for rendering and settings export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub active_sources: Vec<SourceId>,
    pub master_volume: f32,
    pub is_muted: bool,
    pub active_category: CategoryFilter,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_category_filter() {
        assert!(CategoryFilter::All.matches(Category::Music));
        assert!(CategoryFilter::Only(Category::Nature).matches(Category::Nature));
        assert!(!CategoryFilter::Only(Category::Nature).matches(Category::Music));

        assert_eq!("all".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!(
            "affirmations".parse::<CategoryFilter>(),
            Ok(CategoryFilter::Only(Category::Affirmations))
        );
        assert!("nope".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_settings_shape() {
        let settings = EngineSettings {
            master_volume: 0.7,
            is_muted: true,
        };
        let json = serde_json::to_value(settings).unwrap();
        assert_eq!(json["masterVolume"], serde_json::json!(0.7f32));
        assert_eq!(json["isMuted"], serde_json::json!(true));
    }

    #[test]
    fn test_state_clamps_and_composes() {
        let mut state = EngineState::new(EngineSettings {
            master_volume: 3.0,
            is_muted: false,
        });
        assert_eq!(state.master_volume(), 1.0);
        state.set_master_volume(0.5);
        assert_eq!(state.effective(0.8), 0.4);
        state.set_muted(true);
        assert_eq!(state.effective(0.8), 0.0);
    }

    #[test]
    fn test_snapshot_shape() {
        let snapshot = EngineSnapshot {
            active_sources: vec!["rain".into()],
            master_volume: 1.0,
            is_muted: false,
            active_category: CategoryFilter::Only(Category::Nature),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["activeSources"], serde_json::json!(["rain"]));
        assert_eq!(json["activeCategory"], serde_json::json!("nature"));
    }
}
