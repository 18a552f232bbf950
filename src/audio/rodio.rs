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
    collections::HashMap,
    error::Error,
    fmt, fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use ::rodio::cpal::traits::{DeviceTrait, HostTrait};
use ::rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use parking_lot::Mutex;
use tracing::{debug, info, span, warn, Level};

use super::{LoadCompletion, LoadReporter};
use crate::error::LoadError;
use crate::sound::SourceId;

/// Decoded-on-demand audio kept in memory once a load succeeds.
struct Slot {
    ticket: u64,
    bytes: Option<Arc<[u8]>>,
}

struct Voice {
    sink: Sink,
    looped: bool,
    gain: f32,
}

/// A backend that renders sounds through rodio, one sink per sound.
pub struct Backend {
    name: String,
    stream: OutputStream,
    slots: Arc<Mutex<HashMap<SourceId, Slot>>>,
    voices: HashMap<SourceId, Voice>,
}

impl Backend {
    /// Opens the named output device, or the system default.
    pub fn open(device: Option<&str>) -> Result<Backend, Box<dyn Error>> {
        let span = span!(Level::INFO, "open audio output");
        let _enter = span.enter();

        let (name, stream) = match device {
            Some(name) => {
                let host = ::rodio::cpal::default_host();
                let device = host
                    .output_devices()?
                    .find(|device| device.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| format!("no output device named {}", name))?;
                let stream = OutputStreamBuilder::from_device(device)?.open_stream()?;
                (name.to_string(), stream)
            }
            None => (
                "default".to_string(),
                OutputStreamBuilder::open_default_stream()?,
            ),
        };

        info!(device = name, "Opened audio output.");
        Ok(Backend {
            name,
            stream,
            slots: Arc::new(Mutex::new(HashMap::new())),
            voices: HashMap::new(),
        })
    }

    fn bytes(&self, id: &SourceId) -> Option<Arc<[u8]>> {
        self.slots.lock().get(id).and_then(|slot| slot.bytes.clone())
    }

    fn spawn_voice(
        &self,
        bytes: Arc<[u8]>,
        gain: f32,
        looped: bool,
    ) -> Result<Sink, Box<dyn Error>> {
        let decoder = Decoder::new(Cursor::new(bytes))?;
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(gain);
        if looped {
            sink.append(decoder.buffered().repeat_infinite());
        } else {
            sink.append(decoder);
        }
        sink.play();
        Ok(sink)
    }
}

/// Reads a file into memory and makes sure it decodes.
pub fn read_audio(path: &Path) -> Result<Arc<[u8]>, LoadError> {
    let data = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::Missing(path.to_path_buf()),
        _ => LoadError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;
    let bytes: Arc<[u8]> = Arc::from(data);

    Decoder::new(Cursor::new(bytes.clone())).map_err(|e| LoadError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(bytes)
}

impl super::Backend for Backend {
    fn begin_load(&mut self, id: &SourceId, path: &Path, ticket: u64, reporter: LoadReporter) {
        self.slots.lock().insert(
            id.clone(),
            Slot {
                ticket,
                bytes: None,
            },
        );

        let id = id.clone();
        let path: PathBuf = path.to_path_buf();
        let slots = self.slots.clone();
        thread::spawn(move || {
            let span = span!(Level::DEBUG, "load sound", id = id.as_str());
            let _enter = span.enter();

            let result = read_audio(&path).map(|bytes| {
                if let Some(slot) = slots.lock().get_mut(&id) {
                    if slot.ticket == ticket {
                        slot.bytes = Some(bytes);
                    }
                }
            });
            debug!(path = ?path, ok = result.is_ok(), "Load finished.");

            if reporter
                .send(LoadCompletion { id, ticket, result })
                .is_err()
            {
                debug!("Load completion receiver is gone.");
            }
        });
    }

    fn start(&mut self, id: &SourceId, gain: f32, looped: bool) -> Result<(), Box<dyn Error>> {
        let bytes = self
            .bytes(id)
            .ok_or_else(|| format!("sound {} isn't loaded", id))?;
        if let Some(voice) = self.voices.remove(id) {
            voice.sink.stop();
        }
        let sink = self.spawn_voice(bytes, gain, looped)?;
        self.voices.insert(id.clone(), Voice { sink, looped, gain });
        Ok(())
    }

    fn stop(&mut self, id: &SourceId) {
        if let Some(voice) = self.voices.remove(id) {
            voice.sink.stop();
        }
    }

    fn set_gain(&mut self, id: &SourceId, gain: f32) -> Result<(), Box<dyn Error>> {
        if let Some(voice) = self.voices.get_mut(id) {
            voice.sink.set_volume(gain);
            voice.gain = gain;
        }
        Ok(())
    }

    fn set_looped(&mut self, id: &SourceId, looped: bool) -> Result<(), Box<dyn Error>> {
        let Some(voice) = self.voices.get(id) else {
            return Ok(());
        };
        if voice.looped == looped {
            return Ok(());
        }

        // Already over. Left for `finished` to report.
        if voice.sink.empty() && !voice.looped {
            return Ok(());
        }
        // A queued source can't change its repeat mode, so the voice restarts.
        let gain = voice.gain;
        self.start(id, gain, looped)
    }

    fn finished(&mut self) -> Vec<SourceId> {
        let done: Vec<SourceId> = self
            .voices
            .iter()
            .filter(|(_, voice)| !voice.looped && voice.sink.empty())
            .map(|(id, _)| id.clone())
            .collect();
        for id in done.iter() {
            self.voices.remove(id);
            debug!(id = id.as_str(), "Sound played to the end.");
        }
        done
    }

    fn release(&mut self, id: &SourceId) {
        self.stop(id);
        self.slots.lock().remove(id);
    }

    fn play_one_shot(&mut self, path: &Path, gain: f32) -> Result<(), Box<dyn Error>> {
        let bytes = read_audio(path)?;
        let sink = self.spawn_voice(bytes, gain, false)?;
        sink.detach();
        Ok(())
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        for (id, voice) in self.voices.drain() {
            if !voice.sink.empty() {
                warn!(id = id.as_str(), "Stopping sound on shutdown.");
            }
            voice.sink.stop();
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (rodio)", self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_read_audio() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("tone.wav");
        write_wav(&wav);
        let bytes = read_audio(&wav).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_read_audio_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.wav");
        assert_eq!(read_audio(&missing), Err(LoadError::Missing(missing)));
    }

    #[test]
    fn test_read_audio_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.mp3");
        fs::write(&junk, b"definitely not audio").unwrap();
        assert!(matches!(
            read_audio(&junk),
            Err(LoadError::Corrupt { path, .. }) if path == junk
        ));
    }
}
