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
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
};

use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tracing::{debug, info, span, Level};

use super::media_url;
use crate::error::ExternalError;

#[cfg(unix)]
type Channel = std::os::unix::net::UnixStream;
#[cfg(not(unix))]
type Channel = io::Empty;

#[cfg(unix)]
fn connect(socket: &Path) -> Result<Channel, ExternalError> {
    let stream = Channel::connect(socket).map_err(|e| ExternalError::Unavailable(e.to_string()))?;
    stream.set_nonblocking(true)?;
    Ok(stream)
}

#[cfg(not(unix))]
fn connect(_: &Path) -> Result<Channel, ExternalError> {
    Err(ExternalError::Unavailable(
        "mpv IPC needs Unix domain sockets".into(),
    ))
}

fn percent(volume: f32) -> f64 {
    (f64::from(volume.clamp(0.0, 1.0)) * 100.0).round()
}

/// Plays remote media through an mpv child process.
pub struct Player {
    binary: PathBuf,
}

impl Player {
    pub fn new(binary: &Path) -> Player {
        Player {
            binary: binary.to_path_buf(),
        }
    }
}

impl super::Player for Player {
    fn open(
        &mut self,
        media: &str,
        looped: bool,
        volume: f32,
    ) -> Result<Box<dyn super::Session>, ExternalError> {
        let span = span!(Level::INFO, "open mpv");
        let _enter = span.enter();

        let dir = tempfile::Builder::new().prefix("ambimix-mpv-").tempdir()?;
        let socket = dir.path().join("ipc.sock");

        let mut command = Command::new(&self.binary);
        command
            .arg("--no-video")
            .arg("--really-quiet")
            .arg(format!("--input-ipc-server={}", socket.display()))
            .arg(format!("--volume={}", percent(volume)));
        if looped {
            command.arg("--loop-file=inf");
        }
        let child = command
            .arg(media_url(media))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ExternalError::Spawn)?;

        info!(media, pid = child.id(), "Started mpv.");
        Ok(Box::new(Session {
            child: Some(child),
            socket,
            _dir: dir,
            channel: None,
            next_request: 1,
            awaiting: None,
            buffer: Vec::new(),
        }))
    }
}

#[derive(Deserialize)]
struct Reply {
    request_id: Option<u64>,
    error: Option<String>,
}

/// True if the line is mpv's successful reply to the request.
fn confirms(line: &[u8], request: u64) -> bool {
    match serde_json::from_slice::<Reply>(line) {
        Ok(reply) => reply.request_id == Some(request) && reply.error.as_deref() == Some("success"),
        Err(_) => false,
    }
}

struct Session {
    child: Option<Child>,
    socket: PathBuf,
    _dir: TempDir,
    channel: Option<Channel>,
    next_request: u64,
    awaiting: Option<u64>,
    buffer: Vec<u8>,
}

impl Session {
    fn channel(&mut self) -> Result<&mut Channel, ExternalError> {
        if self.channel.is_none() {
            self.channel = Some(connect(&self.socket)?);
        }
        self.channel
            .as_mut()
            .ok_or_else(|| ExternalError::Unavailable("mpv IPC isn't connected".into()))
    }

    fn send(&mut self, command: Value) -> Result<u64, ExternalError> {
        let request = self.next_request;
        self.next_request += 1;

        let mut line = json!({ "command": command, "request_id": request }).to_string();
        line.push('\n');
        let result = self.channel()?.write_all(line.as_bytes());
        if let Err(e) = result {
            self.channel = None;
            return Err(e.into());
        }
        Ok(request)
    }

    fn drain_replies(&mut self) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        let mut chunk = [0u8; 1024];
        loop {
            match channel.read(&mut chunk) {
                Ok(0) => {
                    self.channel = None;
                    break;
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!(err = %e, "mpv IPC read failed.");
                    self.channel = None;
                    break;
                }
            }
        }

        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(request) = self.awaiting {
                if confirms(&line, request) {
                    self.awaiting = None;
                }
            }
        }
    }
}

impl super::Session for Session {
    fn post_volume(&mut self, volume: f32) -> Result<(), ExternalError> {
        // Outstanding until mpv confirms it, even if the write never gets through.
        self.awaiting = Some(self.next_request);
        self.send(json!(["set_property", "volume", percent(volume)]))?;
        Ok(())
    }

    fn direct_volume(&mut self, _: f32) -> Result<(), ExternalError> {
        Err(ExternalError::Unsupported)
    }

    fn acknowledged(&mut self) -> bool {
        if self.awaiting.is_none() {
            return true;
        }
        self.drain_replies();
        self.awaiting.is_none()
    }

    fn set_looped(&mut self, looped: bool) -> Result<(), ExternalError> {
        let value = if looped { "inf" } else { "no" };
        self.send(json!(["set_property", "loop-file", value]))?;
        Ok(())
    }

    fn teardown(&mut self) {
        self.channel = None;
        self.awaiting = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(err = %e, "mpv already exited.");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        super::Session::teardown(self);
    }
}
