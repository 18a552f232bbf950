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

//! Externally hosted playback. The engine can start and stop an external player but
//! can only ask it to change volume; whether it listens is confirmed separately.

use std::path::Path;

use crate::error::ExternalError;

pub mod adapter;
pub mod mock;
pub mod mpv;

pub use adapter::{Adapter, Degradation};

/// Launches external playback sessions.
pub trait Player {
    fn open(
        &mut self,
        media: &str,
        looped: bool,
        volume: f32,
    ) -> Result<Box<dyn Session>, ExternalError>;
}

/// One running external playback.
pub trait Session {
    /// Posts a volume change over the indirect command channel.
    fn post_volume(&mut self, volume: f32) -> Result<(), ExternalError>;

    /// Sets the volume through a direct control path, if the player has one.
    fn direct_volume(&mut self, volume: f32) -> Result<(), ExternalError>;

    /// True once the most recent volume change has been confirmed.
    fn acknowledged(&mut self) -> bool;

    fn set_looped(&mut self, looped: bool) -> Result<(), ExternalError>;

    /// Stops playback and frees the underlying resource.
    fn teardown(&mut self);
}

/// Turns a remote-media identifier into something a player can open.
pub fn media_url(media: &str) -> String {
    if media.contains("://") {
        media.to_string()
    } else {
        format!("https://www.youtube.com/watch?v={}", media)
    }
}

/// Gets the external player. "mock" gets a mock player.
pub fn get_player(binary: &Path) -> Box<dyn Player> {
    if binary.as_os_str() == "mock" {
        return Box::new(mock::Player::default());
    }
    Box::new(mpv::Player::new(binary))
}
