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
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::{Player, Session};
use crate::error::ExternalError;

/// What happened when a volume change went unconfirmed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Degradation {
    /// Only logged.
    Logged { requested: f32 },
    /// The user should be told to use system volume instead. Happens once per adapter.
    Notify { requested: f32 },
}

#[derive(Debug, Clone, Copy)]
struct PendingSignal {
    requested: f32,
    previous: f32,
    deadline: Instant,
}

/// Wraps one remote-media identifier behind the local play/stop/volume contract.
pub struct Adapter {
    media: String,
    session: Option<Box<dyn Session>>,
    volume: f32,
    pending: Option<PendingSignal>,
    notified: bool,
    grace: Duration,
    notify_delta: f32,
}

impl Adapter {
    pub fn new(media: impl Into<String>, grace: Duration, notify_delta: f32) -> Adapter {
        Adapter {
            media: media.into(),
            session: None,
            volume: 0.0,
            pending: None,
            notified: false,
            grace,
            notify_delta,
        }
    }

    pub fn media(&self) -> &str {
        &self.media
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Opens a session. Any existing session is torn down first.
    pub fn start(
        &mut self,
        player: &mut dyn Player,
        volume: f32,
        looped: bool,
    ) -> Result<(), ExternalError> {
        self.stop();
        let session = player.open(&self.media, looped, volume)?;
        self.session = Some(session);
        self.volume = volume;
        Ok(())
    }

    /// Tears the session down entirely.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!(media = self.media, "Tearing down external session.");
            session.teardown();
        }
        self.pending = None;
    }

    /// Signals a volume change. The outcome is only known after `poll`.
    pub fn set_volume(&mut self, volume: f32, now: Instant) {
        let previous = self.volume;
        self.volume = volume;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Err(e) = session.post_volume(volume) {
            debug!(media = self.media, err = %e, "Posting volume failed.");
        }
        match session.direct_volume(volume) {
            Ok(()) => {
                self.pending = None;
                return;
            }
            Err(ExternalError::Unsupported) => {}
            Err(e) => debug!(media = self.media, err = %e, "Direct volume failed."),
        }

        // Keep the original starting point across a burst of changes.
        let previous = self.pending.map(|p| p.previous).unwrap_or(previous);
        self.pending = Some(PendingSignal {
            requested: volume,
            previous,
            deadline: now + self.grace,
        });
    }

    pub fn set_looped(&mut self, looped: bool) -> Result<(), ExternalError> {
        match self.session.as_mut() {
            Some(session) => session.set_looped(looped),
            None => Ok(()),
        }
    }

    /// Checks an outstanding volume signal against the grace window.
    pub fn poll(&mut self, now: Instant) -> Option<Degradation> {
        let pending = self.pending?;
        let session = self.session.as_mut()?;
        if session.acknowledged() {
            self.pending = None;
            return None;
        }
        if now < pending.deadline {
            return None;
        }

        self.pending = None;
        warn!(
            media = self.media,
            requested = pending.requested,
            "{}",
            ExternalError::ControlDegraded {
                requested: pending.requested
            }
        );
        let large = (pending.requested - pending.previous).abs() >= self.notify_delta
            || pending.requested == 0.0;
        if large && !self.notified {
            self.notified = true;
            Some(Degradation::Notify {
                requested: pending.requested,
            })
        } else {
            Some(Degradation::Logged {
                requested: pending.requested,
            })
        }
    }
}

impl Drop for Adapter {
    fn drop(&mut self) {
        self.stop();
    }
}
