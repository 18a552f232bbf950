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
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::error::ExternalError;

#[derive(Default)]
struct State {
    opened: Vec<(String, bool, f32)>,
    live: usize,
    posted: Vec<f32>,
    acknowledge: bool,
    direct: bool,
    fail_open: bool,
}

/// A mock external player. Sessions only record what they're asked to do.
#[derive(Clone, Default)]
pub struct Player {
    state: Arc<Mutex<State>>,
}

impl Player {
    /// Whether sessions confirm posted volume changes.
    pub fn set_acknowledge(&self, acknowledge: bool) {
        self.state.lock().acknowledge = acknowledge;
    }

    /// Whether sessions offer a direct volume path.
    pub fn set_direct(&self, direct: bool) {
        self.state.lock().direct = direct;
    }

    pub fn set_fail_open(&self, fail_open: bool) {
        self.state.lock().fail_open = fail_open;
    }

    pub fn opened(&self) -> Vec<(String, bool, f32)> {
        self.state.lock().opened.clone()
    }

    pub fn live_sessions(&self) -> usize {
        self.state.lock().live
    }

    pub fn posted(&self) -> Vec<f32> {
        self.state.lock().posted.clone()
    }
}

impl super::Player for Player {
    fn open(
        &mut self,
        media: &str,
        looped: bool,
        volume: f32,
    ) -> Result<Box<dyn super::Session>, ExternalError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(ExternalError::Unavailable("mock player is offline".into()));
        }
        info!(media, looped, volume, "Opening external session (mock).");
        state.opened.push((media.to_string(), looped, volume));
        state.live += 1;
        Ok(Box::new(Session {
            state: self.state.clone(),
            live: true,
        }))
    }
}

struct Session {
    state: Arc<Mutex<State>>,
    live: bool,
}

impl super::Session for Session {
    fn post_volume(&mut self, volume: f32) -> Result<(), ExternalError> {
        self.state.lock().posted.push(volume);
        Ok(())
    }

    fn direct_volume(&mut self, _: f32) -> Result<(), ExternalError> {
        if self.state.lock().direct {
            Ok(())
        } else {
            Err(ExternalError::Unsupported)
        }
    }

    fn acknowledged(&mut self) -> bool {
        self.state.lock().acknowledge
    }

    fn set_looped(&mut self, _: bool) -> Result<(), ExternalError> {
        Ok(())
    }

    fn teardown(&mut self) {
        if self.live {
            self.live = false;
            self.state.lock().live -= 1;
        }
    }
}
