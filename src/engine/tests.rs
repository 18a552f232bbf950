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
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::audio::mock::LoadMode;
use crate::error::PresetError;
use crate::persist::JsonFileStore;
use crate::sound::{Category, LoadState};
use crate::testutil::Harness;

fn id(id: &str) -> SourceId {
    SourceId::new(id)
}

fn stored(data_dir: &Path, key: &str) -> Option<serde_json::Value> {
    JsonFileStore::new(data_dir).load_data(key).unwrap()
}

#[test]
fn test_bootstrap_skips_missing_builtins() {
    let data = tempfile::tempdir().unwrap();
    let h = Harness::new(LoadMode::CheckPath, data.path(), true);

    let ids: Vec<&str> = h
        .engine
        .registry()
        .iter()
        .map(|sound| sound.id().as_str())
        .collect();
    assert_eq!(ids, vec!["rain", "forest", "lofi", "radio"]);
    assert!(h.engine.registry().iter().all(|sound| sound.is_default()));
    assert!(h.notifier.shown().is_empty());

    let state = h.engine.current_state();
    assert_eq!(state.master_volume, 1.0);
    assert!(!state.is_muted);
}

#[test]
fn test_mix_and_mute() {
    let data = tempfile::tempdir().unwrap();
    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
    let (rain, forest) = (id("rain"), id("forest"));

    h.engine.play(&rain).unwrap();
    h.engine.play(&forest).unwrap();
    h.engine.pump();
    assert!(h.backend.is_playing(&rain));
    assert!(h.backend.is_playing(&forest));

    h.engine.set_volume(&rain, 0.5).unwrap();
    h.engine.set_volume(&forest, 0.8).unwrap();
    h.engine.set_master_volume(0.5);
    assert_eq!(h.backend.gain(&rain), Some(0.25));
    assert_eq!(h.backend.gain(&forest), Some(0.4));

    h.engine.set_muted(true);
    assert_eq!(h.backend.gain(&rain), Some(0.0));
    assert_eq!(h.backend.gain(&forest), Some(0.0));
    assert_eq!(h.engine.current_state().active_sources, vec![rain.clone(), forest.clone()]);

    assert!(!h.engine.toggle_mute());
    assert_eq!(h.backend.gain(&rain), Some(0.25));
    assert_eq!(h.backend.gain(&forest), Some(0.4));

    assert_eq!(
        stored(data.path(), SOUND_SETTINGS),
        Some(json!({"masterVolume": 0.5, "isMuted": false}))
    );
}

#[test]
fn test_settings_survive_restart() {
    let data = tempfile::tempdir().unwrap();
    {
        let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
        h.engine.set_master_volume(0.4);
        assert!(h.engine.toggle_mute());
    }

    let h = Harness::new(LoadMode::CheckPath, data.path(), true);
    let state = h.engine.current_state();
    assert_eq!(state.master_volume, 0.4);
    assert!(state.is_muted);
    assert!(state.active_sources.is_empty());
}

#[test]
fn test_one_external_at_a_time() {
    let data = tempfile::tempdir().unwrap();
    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
    let (lofi, radio) = (id("lofi"), id("radio"));

    h.engine.play(&lofi).unwrap();
    assert_eq!(h.player.live_sessions(), 1);
    assert!(h.engine.registry().get(&lofi).unwrap().is_playing());

    h.engine.play(&radio).unwrap();
    assert_eq!(h.player.live_sessions(), 1);
    assert!(!h.engine.registry().get(&lofi).unwrap().is_playing());
    assert!(h.engine.registry().get(&radio).unwrap().is_playing());

    let opened: Vec<String> = h.player.opened().into_iter().map(|(media, _, _)| media).collect();
    assert_eq!(
        opened,
        vec![
            "jfKfPfyJRdk".to_string(),
            "https://radio.example/live".to_string()
        ]
    );

    // Local sounds mix freely with the external one.
    h.engine.play(&id("rain")).unwrap();
    h.engine.pump();
    assert!(h.engine.registry().get(&radio).unwrap().is_playing());
    assert_eq!(h.engine.current_state().active_sources.len(), 2);

    h.engine.stop_all();
    assert_eq!(h.player.live_sessions(), 0);
    assert_eq!(h.backend.playing_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_load_times_out_once() {
    let data = tempfile::tempdir().unwrap();
    let mut h = Harness::new(LoadMode::Manual, data.path(), true);
    let rain = id("rain");

    h.engine.play(&rain).unwrap();
    assert_eq!(h.backend.pending_loads(), vec![rain.clone()]);
    h.engine.pump();
    assert_eq!(h.engine.registry().get(&rain).unwrap().load_state(), LoadState::Loading);

    tokio::time::advance(Duration::from_secs(3)).await;
    h.engine.pump();
    h.engine.pump();
    let sound = h.engine.registry().get(&rain).unwrap();
    assert_eq!(sound.load_state(), LoadState::Failed);
    assert!(!sound.is_playing());
    assert_eq!(h.notifier.count(Severity::Error), 1);
    assert!(h.backend.released().contains(&rain));

    // A retry goes through reload.
    assert!(matches!(
        h.engine.play(&rain),
        Err(EngineError::Playback(PlaybackError::SourceFailed(_)))
    ));
    h.engine.reload(&rain).unwrap();
    assert!(h.backend.complete_load(&rain, Ok(())));
    h.engine.pump();
    h.engine.play(&rain).unwrap();
    assert!(h.backend.is_playing(&rain));
}

#[tokio::test(start_paused = true)]
async fn test_external_volume_warning_is_shown_once() {
    let data = tempfile::tempdir().unwrap();
    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
    let lofi = id("lofi");

    h.engine.play(&lofi).unwrap();
    h.engine.set_volume(&lofi, 0.0).unwrap();
    h.engine.pump();
    assert_eq!(h.notifier.count(Severity::Warning), 0);

    tokio::time::advance(Duration::from_secs(1)).await;
    h.engine.pump();
    assert_eq!(h.notifier.count(Severity::Warning), 1);

    h.engine.set_volume(&lofi, 1.0).unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    h.engine.pump();
    assert_eq!(h.notifier.count(Severity::Warning), 1);
    assert_eq!(h.player.posted(), vec![0.0, 1.0]);
}

#[test]
fn test_preset_round_trip() {
    let data = tempfile::tempdir().unwrap();
    let brook_file = data.path().join("brook.wav");
    std::fs::write(&brook_file, b"RIFF").unwrap();
    {
        let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
        let results = h.engine.import_files(vec![FileHandle::Path(brook_file.clone())]);
        let brook = results[0].as_ref().unwrap().clone();

        h.engine.set_volume(&id("forest"), 0.3).unwrap();
        h.engine.set_looped(&id("forest"), false).unwrap();
        h.engine.play(&id("forest")).unwrap();
        h.engine.play(&brook).unwrap();
        h.engine.pump();

        let preset = h.engine.save_preset("Evening").unwrap();
        assert_eq!(preset.sounds.len(), 2);
        assert_eq!(h.notifier.shown().last().unwrap().title, "Preset saved");

        h.engine.remove_custom_sound(&brook).unwrap();
    }

    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
    assert_eq!(h.engine.presets().len(), 1);
    h.engine.set_volume(&id("forest"), 1.0).unwrap();

    let outcome = h.engine.load_preset("Evening").unwrap();
    assert_eq!(outcome.started, vec![id("forest")]);
    assert_eq!(outcome.skipped.len(), 1);
    h.engine.pump();

    let forest = h.engine.registry().get(&id("forest")).unwrap();
    assert!(forest.is_playing());
    assert_eq!(forest.volume(), 0.3);
    assert!(!forest.is_looped());
    assert_eq!(h.backend.looped(&id("forest")), Some(false));

    h.engine.delete_preset("Evening").unwrap();
    assert_eq!(stored(data.path(), SOUND_PRESETS), Some(json!({})));
}

#[test]
fn test_preset_failures_notify() {
    let data = tempfile::tempdir().unwrap();
    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);

    assert!(matches!(
        h.engine.save_preset("Empty"),
        Err(EngineError::Preset(PresetError::NoActiveSources))
    ));
    assert!(matches!(
        h.engine.load_preset("Nowhere"),
        Err(EngineError::Preset(PresetError::NotFound(_)))
    ));
    assert!(matches!(
        h.engine.delete_preset("Nowhere"),
        Err(EngineError::Preset(PresetError::NotFound(_)))
    ));
    assert_eq!(h.notifier.count(Severity::Error), 3);
    assert_eq!(stored(data.path(), SOUND_PRESETS), None);
}

#[test]
fn test_unsupported_import() {
    let data = tempfile::tempdir().unwrap();
    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
    let before = h.engine.registry().len();

    let results = h
        .engine
        .import_files(vec![FileHandle::Path(data.path().join("notes.pdf"))]);
    assert!(matches!(results[0], Err(ImportError::UnsupportedFormat { .. })));
    assert_eq!(h.engine.registry().len(), before);
    assert_eq!(h.notifier.count(Severity::Error), 1);
    assert_eq!(h.notifier.count(Severity::Success), 1);
    assert_eq!(stored(data.path(), CUSTOM_SOUNDS), None);
}

#[test]
fn test_custom_sounds_survive_restart() {
    let data = tempfile::tempdir().unwrap();
    let brook_file = data.path().join("river_brook.wav");
    std::fs::write(&brook_file, b"RIFF").unwrap();
    let (brook, dropped) = {
        let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
        let results = h.engine.import_files(vec![
            FileHandle::Path(brook_file.clone()),
            FileHandle::Transient {
                file_name: "dropped.mp3".into(),
                bytes: vec![7; 16],
            },
        ]);
        let brook = results[0].as_ref().unwrap().clone();
        let dropped = results[1].as_ref().unwrap().clone();
        let backing = h
            .engine
            .registry()
            .get(&dropped)
            .unwrap()
            .origin()
            .local_path()
            .unwrap()
            .to_path_buf();
        assert!(backing.exists());

        h.engine.remove_custom_sound(&dropped).unwrap();
        assert!(!backing.exists());
        (brook, dropped)
    };

    let h = Harness::new(LoadMode::CheckPath, data.path(), true);
    let restored = h.engine.registry().get(&brook).unwrap();
    assert_eq!(restored.name(), "River Brook");
    assert_eq!(restored.category(), Category::Nature);
    assert_eq!(restored.kind(), SourceKind::CustomLocal);
    assert_eq!(restored.load_state(), LoadState::Unloaded);
    assert!(!restored.is_default());
    assert!(h.engine.registry().get(&dropped).is_none());
}

#[test]
fn test_remove_custom_sound() {
    let data = tempfile::tempdir().unwrap();
    let file = data.path().join("fan.wav");
    std::fs::write(&file, b"RIFF").unwrap();

    let mut h = Harness::new(LoadMode::CheckPath, data.path(), false);
    assert!(matches!(
        h.engine.remove_custom_sound(&id("rain")),
        Err(EngineError::Registry(RegistryError::Protected(_)))
    ));
    assert!(matches!(
        h.engine.remove_custom_sound(&id("nothing")),
        Err(EngineError::Registry(RegistryError::NotFound(_)))
    ));
    assert_eq!(h.notifier.count(Severity::Error), 2);
    assert!(h.engine.registry().contains(&id("rain")));

    let fan = h.engine.import_files(vec![FileHandle::Path(file.clone())])[0]
        .as_ref()
        .unwrap()
        .clone();
    h.notifier.clear();
    assert!(matches!(
        h.engine.remove_custom_sound(&fan),
        Err(EngineError::Cancelled(_))
    ));
    assert!(h.engine.registry().contains(&fan));
    assert!(h.notifier.shown().is_empty());
    drop(h);

    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
    h.engine.play(&fan).unwrap();
    h.engine.pump();
    assert!(h.backend.is_playing(&fan));

    h.engine.remove_custom_sound(&fan).unwrap();
    assert!(!h.engine.registry().contains(&fan));
    assert!(!h.backend.is_playing(&fan));
    assert!(file.exists());
    assert_eq!(stored(data.path(), CUSTOM_SOUNDS), Some(json!([])));
}

#[test]
fn test_notification_sounds() {
    let data = tempfile::tempdir().unwrap();
    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
    h.engine.set_master_volume(0.2);
    h.engine.set_muted(true);

    h.engine
        .play_notification_sound(NotificationKind::FocusComplete)
        .unwrap();
    assert_eq!(
        h.backend.one_shots(),
        vec![(h.sounds.path().join("chime.mp3"), 0.7)]
    );

    assert!(matches!(
        h.engine.play_notification_sound(NotificationKind::Tick),
        Err(EngineError::Playback(PlaybackError::NoNotificationSound(kind))) if kind == "tick"
    ));
    assert_eq!(h.backend.one_shots().len(), 1);
}

#[test]
fn test_category_filter() {
    let data = tempfile::tempdir().unwrap();
    let mut h = Harness::new(LoadMode::CheckPath, data.path(), true);
    assert_eq!(h.engine.visible_sounds().len(), 4);

    h.engine
        .set_active_category(CategoryFilter::Only(Category::Music));
    let names: Vec<&str> = h
        .engine
        .visible_sounds()
        .into_iter()
        .map(|sound| sound.name())
        .collect();
    assert_eq!(names, vec!["Lofi Radio", "Night Radio"]);

    let snapshot = serde_json::to_value(h.engine.current_state()).unwrap();
    assert_eq!(
        snapshot,
        json!({
            "activeSources": [],
            "masterVolume": 1.0,
            "isMuted": false,
            "activeCategory": "music",
        })
    );
}

#[test]
fn test_notification_kind_parse() {
    assert_eq!(
        "Break-Complete".parse::<NotificationKind>(),
        Ok(NotificationKind::BreakComplete)
    );
    assert!("lunch".parse::<NotificationKind>().is_err());
    assert_eq!(
        NotificationKind::FocusComplete.default_file(),
        PathBuf::from("focus-complete.mp3")
    );
}
