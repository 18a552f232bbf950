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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use crate::runtime::{self, Command};
use crate::sound::SourceId;

const PLAY: &str = "play";
const STOP: &str = "stop";
const TOGGLE: &str = "toggle";
const RELOAD: &str = "reload";
const VOLUME: &str = "volume";
const LOOP: &str = "loop";
const STOP_ALL: &str = "stop_all";
const MASTER: &str = "master";
const MUTE: &str = "mute";
const CATEGORY: &str = "category";
const IMPORT: &str = "import";
const REMOVE: &str = "remove";
const SAVE: &str = "save";
const LOAD: &str = "load";
const DELETE: &str = "delete";
const CHIME: &str = "chime";
const STATUS: &str = "status";
const QUIT: &str = "quit";

/// Parses a line of input into a command.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let id = || (!rest.is_empty()).then(|| SourceId::new(rest));
    let name = || (!rest.is_empty()).then(|| rest.to_string());
    let with_value = || {
        let (id, value) = rest.rsplit_once(char::is_whitespace)?;
        Some((SourceId::new(id.trim()), value))
    };

    match verb.to_lowercase().as_str() {
        PLAY => id().map(Command::Play),
        STOP => id().map(Command::Stop),
        TOGGLE => id().map(Command::Toggle),
        RELOAD => id().map(Command::Reload),
        VOLUME => {
            let (id, value) = with_value()?;
            Some(Command::Volume(id, value.parse().ok()?))
        }
        LOOP => {
            let (id, value) = with_value()?;
            let looped = match value {
                "on" | "true" => true,
                "off" | "false" => false,
                _ => return None,
            };
            Some(Command::Loop(id, looped))
        }
        STOP_ALL => Some(Command::StopAll),
        MASTER => Some(Command::Master(rest.parse().ok()?)),
        MUTE => match rest {
            "" => Some(Command::ToggleMute),
            "on" => Some(Command::Mute(true)),
            "off" => Some(Command::Mute(false)),
            _ => None,
        },
        CATEGORY => Some(Command::Category(rest.parse().ok()?)),
        IMPORT => {
            let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
            (!paths.is_empty()).then_some(Command::Import(paths))
        }
        REMOVE => id().map(Command::Remove),
        SAVE => name().map(Command::SavePreset),
        LOAD => name().map(Command::LoadPreset),
        DELETE => name().map(Command::DeletePreset),
        CHIME => Some(Command::Chime(rest.parse().ok()?)),
        STATUS => Some(Command::Status),
        QUIT => Some(Command::Quit),
        _ => None,
    }
}

/// A driver that reads commands from the keyboard.
#[derive(Default)]
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads one command. Returns false once the input is closed.
    fn monitor_io<R, W>(
        commands_tx: &Sender<Command>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <id>, {} <id>, {} <id> <0-1>, {}, {} <0-1>, {} [on|off], {} <name>, {} <name>, {}, {}): ",
            PLAY, STOP, VOLUME, STOP_ALL, MASTER, MUTE, SAVE, LOAD, STATUS, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        match parse_command(&input) {
            Some(command) => commands_tx
                .blocking_send(command)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
            None => warn!(input = input.trim(), "Unrecognized input"),
        }
        Ok(true)
    }
}

impl runtime::Driver for Driver {
    fn monitor_commands(&self, commands_tx: Sender<Command>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&commands_tx, io::stdin().lock(), io::stdout())? {}
            info!("Keyboard input closed.");
            Ok(())
        })
    }
}
