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
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;
use tracing::debug;

use crate::controller::Options;
use crate::engine::NotificationKind;

mod builtin;
mod error;

pub use builtin::{default_manifest, BuiltinSound};
pub use error::ConfigError;

const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(1500);
const DEFAULT_DEGRADE_NOTIFY_DELTA: f32 = 0.3;
const DEFAULT_NOTIFICATION_VOLUME: f32 = 0.7;
const DEFAULT_EXTERNAL_PLAYER: &str = "mpv";
const APP_DIR: &str = "ambimix";

/// A YAML representation of the engine configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Engine {
    /// Where the built-in sound files live.
    sounds_dir: Option<PathBuf>,

    /// Where custom sounds, presets and settings are stored.
    data_dir: Option<PathBuf>,

    /// The output device. "default" or unset uses the system default.
    audio_device: Option<String>,

    /// How long a play waits for its sound to load, e.g. "10s".
    load_timeout: Option<String>,

    /// How long the external player has to confirm a volume change, e.g. "1500ms".
    grace_window: Option<String>,

    /// Unconfirmed external volume changes at least this large are reported.
    degrade_notify_delta: Option<f32>,

    /// Load every built-in sound at startup instead of on first play.
    preload: Option<bool>,

    /// The volume of timer notification sounds.
    notification_volume: Option<f32>,

    /// The external player binary.
    external_player: Option<PathBuf>,

    /// The built-in sound manifest. Replaces the shipped manifest when set.
    builtin: Option<Vec<BuiltinSound>>,

    /// Timer notification sounds by kind, relative to the sounds directory.
    notification_sounds: Option<HashMap<String, PathBuf>>,
}

/// Loads the configuration from an optional YAML file with `AMBIMIX_` environment
/// overrides. A missing file gives the defaults.
pub fn load(path: Option<&Path>) -> Result<Engine, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        debug!(path = ?path, "Loading configuration.");
        builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(false));
    }
    let engine = builder
        .add_source(Environment::with_prefix("AMBIMIX").try_parsing(true))
        .build()?
        .try_deserialize()?;
    Ok(engine)
}

fn app_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
}

fn duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.clone())
            .map_err(|e| ConfigError::Duration {
                field,
                reason: e.to_string(),
            })?
            .into()),
        None => Ok(default),
    }
}

impl Engine {
    /// Returns the sounds directory (default: the "sounds" folder in the data directory).
    pub fn sounds_dir(&self) -> PathBuf {
        self.sounds_dir
            .clone()
            .unwrap_or_else(|| app_dir().join("sounds"))
    }

    /// Returns the data directory (default: the platform data directory).
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(app_dir)
    }

    pub fn audio_device(&self) -> Option<&str> {
        self.audio_device.as_deref()
    }

    /// Returns the load timeout (default: 10s).
    pub fn load_timeout(&self) -> Result<Duration, ConfigError> {
        duration("load_timeout", &self.load_timeout, DEFAULT_LOAD_TIMEOUT)
    }

    /// Returns the external volume grace window (default: 1.5s).
    pub fn grace_window(&self) -> Result<Duration, ConfigError> {
        duration("grace_window", &self.grace_window, DEFAULT_GRACE_WINDOW)
    }

    pub fn degrade_notify_delta(&self) -> f32 {
        self.degrade_notify_delta
            .unwrap_or(DEFAULT_DEGRADE_NOTIFY_DELTA)
    }

    /// Returns the controller options built from the configuration.
    pub fn options(&self) -> Result<Options, ConfigError> {
        Ok(Options {
            load_timeout: self.load_timeout()?,
            grace_window: self.grace_window()?,
            degrade_notify_delta: self.degrade_notify_delta(),
        })
    }

    pub fn preload(&self) -> bool {
        self.preload.unwrap_or(false)
    }

    /// Returns the notification volume (default: 0.7).
    pub fn notification_volume(&self) -> f32 {
        self.notification_volume
            .unwrap_or(DEFAULT_NOTIFICATION_VOLUME)
    }

    pub fn external_player(&self) -> PathBuf {
        self.external_player
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXTERNAL_PLAYER))
    }

    /// Returns the built-in manifest.
    pub fn builtin(&self) -> Vec<BuiltinSound> {
        self.builtin.clone().unwrap_or_else(default_manifest)
    }

    /// Returns the notification sounds, resolved against the sounds directory.
    pub fn notification_sounds(&self) -> Result<HashMap<NotificationKind, PathBuf>, ConfigError> {
        let sounds_dir = self.sounds_dir();
        let configured = match &self.notification_sounds {
            Some(configured) => configured.clone(),
            None => NotificationKind::ALL
                .iter()
                .map(|kind| (kind.as_str().to_string(), kind.default_file()))
                .collect(),
        };

        configured
            .into_iter()
            .map(|(kind, file)| {
                let kind = kind
                    .parse::<NotificationKind>()
                    .map_err(|_| ConfigError::NotificationKind(kind))?;
                Ok::<_, ConfigError>((kind, sounds_dir.join(file)))
            })
            .collect()
    }
}
