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
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, span, warn, Level};

use crate::engine::{Engine, NotificationKind};
use crate::import::FileHandle;
use crate::sound::SourceId;
use crate::state::{CategoryFilter, EngineSnapshot};

/// How often the engine is pumped when no commands arrive.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Commands that drive the engine.
#[derive(Debug)]
pub enum Command {
    Play(SourceId),
    Stop(SourceId),
    Toggle(SourceId),
    Reload(SourceId),
    Volume(SourceId, f32),
    Loop(SourceId, bool),
    StopAll,
    Master(f32),
    Mute(bool),
    ToggleMute,
    Category(CategoryFilter),
    Import(Vec<PathBuf>),
    Remove(SourceId),
    SavePreset(String),
    LoadPreset(String),
    DeletePreset(String),
    Chime(NotificationKind),

    /// Logs the visible sounds and presets.
    Status,

    /// Replies with the current engine state.
    Snapshot(oneshot::Sender<EngineSnapshot>),

    /// Stops everything and ends the run loop.
    Quit,
}

/// A source of commands, such as the keyboard.
pub trait Driver: Send + Sync + 'static {
    fn monitor_commands(&self, commands_tx: mpsc::Sender<Command>) -> JoinHandle<Result<(), io::Error>>;
}

/// Applies commands to the engine and pumps it on every tick. Returns when a `Quit`
/// arrives or every sender is gone.
pub async fn run(engine: &mut Engine, mut commands: mpsc::Receiver<Command>, tick: Duration) {
    let span = span!(Level::INFO, "runtime");
    let _enter = span.enter();

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(tick = ?tick, "Runtime started.");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Quit) | None => {
                    info!("Runtime closing.");
                    engine.stop_all();
                    return;
                }
                Some(command) => {
                    info!(command = ?command, "Received command.");
                    apply(engine, command);
                }
            },
            _ = interval.tick() => engine.pump(),
        }
    }
}

/// Applies a single command. Every failure is logged here. Unknown ids are only logged;
/// other playback, preset and removal failures have also been shown to the user.
pub fn apply(engine: &mut Engine, command: Command) {
    let result = match command {
        Command::Play(id) => engine.play(&id),
        Command::Stop(id) => engine.stop(&id),
        Command::Toggle(id) => engine.toggle(&id).map(|_| ()),
        Command::Reload(id) => engine.reload(&id),
        Command::Volume(id, volume) => engine.set_volume(&id, volume),
        Command::Loop(id, looped) => engine.set_looped(&id, looped),
        Command::StopAll => {
            engine.stop_all();
            Ok(())
        }
        Command::Master(volume) => {
            engine.set_master_volume(volume);
            Ok(())
        }
        Command::Mute(muted) => {
            engine.set_muted(muted);
            Ok(())
        }
        Command::ToggleMute => {
            engine.toggle_mute();
            Ok(())
        }
        Command::Category(filter) => {
            engine.set_active_category(filter);
            Ok(())
        }
        Command::Import(paths) => {
            let handles = paths.into_iter().map(FileHandle::Path).collect();
            for id in engine.import_files(handles).into_iter().flatten() {
                info!(id = id.as_str(), "Imported sound.");
            }
            Ok(())
        }
        Command::Remove(id) => engine.remove_custom_sound(&id),
        Command::SavePreset(name) => engine.save_preset(&name).map(|_| ()),
        Command::LoadPreset(name) => engine.load_preset(&name).map(|_| ()),
        Command::DeletePreset(name) => engine.delete_preset(&name),
        Command::Chime(kind) => engine.play_notification_sound(kind),
        Command::Status => {
            status(engine);
            Ok(())
        }
        Command::Snapshot(reply) => {
            if reply.send(engine.current_state()).is_err() {
                warn!("Snapshot requester went away");
            }
            Ok(())
        }
        Command::Quit => Ok(()),
    };

    if let Err(e) = result {
        error!(err = %e, "Command failed");
    }
}

fn status(engine: &Engine) {
    let state = engine.current_state();
    info!(
        master_volume = state.master_volume,
        muted = state.is_muted,
        category = %state.active_category,
        playing = state.active_sources.len(),
        "Engine status."
    );
    for sound in engine.visible_sounds() {
        info!(
            id = sound.id().as_str(),
            name = sound.name(),
            category = %sound.category(),
            volume = sound.volume(),
            playing = sound.is_playing(),
            state = ?sound.load_state(),
            "Sound."
        );
    }
    for preset in engine.presets() {
        info!(preset = %preset, "Preset.");
    }
}
