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

use ::config::{Config, File, FileFormat};
use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

use crate::audio::mock::{self, LoadMode};
use crate::config;
use crate::engine::{Collaborators, Engine};
use crate::external::mock::Player;
use crate::notify::{AutoConfirm, RecordingNotifier};
use crate::persist::JsonFileStore;

/// Writes a short mono sine tone.
pub fn write_wav(path: &Path) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for i in 0..4410 {
        let sample = ((i as f32 / 20.0).sin() * i16::MAX as f32 * 0.5) as i16;
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// A small manifest: two local built-ins, one whose file is missing, and two hosted.
pub fn engine_config(sounds_dir: &Path) -> config::Engine {
    let yaml = format!(
        r#"
        sounds_dir: {}
        load_timeout: 2s
        grace_window: 500ms
        builtin:
          - id: rain
            name: Rain
            category: nature
            file: rain.mp3
          - id: forest
            name: Forest
            category: nature
            file: forest.mp3
          - id: thunder
            name: Thunder
            category: nature
            file: thunder.mp3
          - id: lofi
            name: Lofi Radio
            category: music
            media: jfKfPfyJRdk
          - id: radio
            name: Night Radio
            category: music
            media: https://radio.example/live
        notification_sounds:
          focus-complete: chime.mp3
        "#,
        sounds_dir.display()
    );
    Config::builder()
        .add_source(File::from_str(&yaml, FileFormat::Yaml))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

/// An engine wired to mocks, with handles to inspect them.
pub struct Harness {
    pub engine: Engine,
    pub backend: mock::Backend,
    pub player: Player,
    pub notifier: RecordingNotifier,
    pub sounds: TempDir,
}

impl Harness {
    pub fn new(mode: LoadMode, data_dir: &Path, confirm: bool) -> Harness {
        let sounds = tempfile::tempdir().unwrap();
        // No thunder file.
        for file in ["rain.mp3", "forest.mp3", "chime.mp3"] {
            std::fs::write(sounds.path().join(file), b"ID3").unwrap();
        }

        let backend = mock::Backend::with_mode("mock", mode);
        let player = Player::default();
        let notifier = RecordingNotifier::default();
        let engine = Engine::bootstrap(
            &engine_config(sounds.path()),
            Collaborators {
                backend: Box::new(backend.clone()),
                player: Box::new(player.clone()),
                notifier: Box::new(notifier.clone()),
                store: Box::new(JsonFileStore::new(data_dir)),
                confirm: Box::new(AutoConfirm(confirm)),
            },
        )
        .unwrap();

        Harness {
            engine,
            backend,
            player,
            notifier,
            sounds,
        }
    }
}
