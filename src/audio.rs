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
use std::{error::Error, fmt, path::Path};

use cpal::traits::{DeviceTrait, HostTrait};
use tracing::error;

use crate::error::LoadError;
use crate::sound::SourceId;

pub mod mock;
pub mod rodio;

/// Sent by a backend when an asynchronous load finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCompletion {
    pub id: SourceId,
    /// The ticket handed to `begin_load`. Completions for superseded tickets are stale.
    pub ticket: u64,
    pub result: Result<(), LoadError>,
}

/// Where load completions are reported.
pub type LoadReporter = crossbeam_channel::Sender<LoadCompletion>;

/// Renders local sounds. Each registered sound gets its own output voice.
pub trait Backend: fmt::Display {
    /// Starts loading the audio at the path. The result is reported asynchronously
    /// through the reporter, never from within this call's stack frame.
    fn begin_load(&mut self, id: &SourceId, path: &Path, ticket: u64, reporter: LoadReporter);

    /// Starts a loaded sound at the given gain.
    fn start(&mut self, id: &SourceId, gain: f32, looped: bool) -> Result<(), Box<dyn Error>>;

    /// Stops a sound. Stopping a stopped sound does nothing.
    fn stop(&mut self, id: &SourceId);

    /// Changes the gain of a playing sound.
    fn set_gain(&mut self, id: &SourceId, gain: f32) -> Result<(), Box<dyn Error>>;

    /// Changes whether a sound repeats. Takes effect immediately when it's playing.
    fn set_looped(&mut self, id: &SourceId, looped: bool) -> Result<(), Box<dyn Error>>;

    /// Takes the sounds that have played to their end since the last call. Looped
    /// sounds never finish.
    fn finished(&mut self) -> Vec<SourceId>;

    /// Frees everything held for the sound.
    fn release(&mut self, id: &SourceId);

    /// Plays a short file once on its own voice.
    fn play_one_shot(&mut self, path: &Path, gain: f32) -> Result<(), Box<dyn Error>>;
}

/// An output device known to cpal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDevice {
    pub name: String,
    pub host: String,
    pub max_channels: u16,
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<OutputDevice>, Box<dyn Error>> {
    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(output_configs) = device.supported_output_configs() else {
                continue;
            };
            let max_channels = output_configs
                .map(|config| config.channels())
                .max()
                .unwrap_or(0);

            if max_channels > 0 {
                devices.push(OutputDevice {
                    name: device.name()?,
                    host: host_id.name().to_string(),
                    max_channels,
                });
            }
        }
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// Gets a backend for the named device. Names starting with "mock" get a mock backend,
/// "default" (or nothing) gets the system default output.
pub fn get_backend(device: Option<&str>) -> Result<Box<dyn Backend>, Box<dyn Error>> {
    match device {
        Some(name) if name.starts_with("mock") => Ok(Box::new(mock::Backend::get(name))),
        Some(name) if name != "default" => Ok(Box::new(self::rodio::Backend::open(Some(name))?)),
        _ => Ok(Box::new(self::rodio::Backend::open(None)?)),
    }
}
