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

//! The per-sound load state machine and the bookkeeping for loads in flight.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::sound::{LoadState, SourceId};

/// Inputs to the load state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    Begin,
    Succeeded,
    Failed,
    TimedOut,
    Reset,
}

/// The next load state, or None if the event doesn't apply in this state.
pub fn transition(state: LoadState, event: LoadEvent) -> Option<LoadState> {
    match (state, event) {
        (LoadState::Loading, LoadEvent::Begin) => None,
        (_, LoadEvent::Begin) => Some(LoadState::Loading),
        (LoadState::Loading, LoadEvent::Succeeded) => Some(LoadState::Ready),
        (LoadState::Loading, LoadEvent::Failed | LoadEvent::TimedOut) => Some(LoadState::Failed),
        (_, LoadEvent::Reset) => Some(LoadState::Unloaded),
        _ => None,
    }
}

/// Tracks load tickets and plays waiting on a load.
///
/// Every load gets a new ticket. A completion is only accepted if its ticket is still
/// the current one for the sound, so superseded and timed-out loads are ignored.
#[derive(Debug)]
pub struct LoadTracker {
    next_ticket: u64,
    in_flight: HashMap<SourceId, u64>,
    deferred: HashMap<SourceId, Instant>,
    timeout: Duration,
}

impl LoadTracker {
    pub fn new(timeout: Duration) -> LoadTracker {
        LoadTracker {
            next_ticket: 1,
            in_flight: HashMap::new(),
            deferred: HashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Starts a new load, superseding any load already in flight.
    pub fn begin(&mut self, id: &SourceId) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight.insert(id.clone(), ticket);
        ticket
    }

    /// Accepts a completion if it belongs to the current load.
    pub fn accept(&mut self, id: &SourceId, ticket: u64) -> bool {
        match self.in_flight.get(id) {
            Some(current) if *current == ticket => {
                self.in_flight.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn is_loading(&self, id: &SourceId) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Records a play that should start once the load completes. The deadline of an
    /// existing deferral is kept.
    pub fn defer_play(&mut self, id: &SourceId, now: Instant) {
        self.deferred
            .entry(id.clone())
            .or_insert(now + self.timeout);
    }

    pub fn is_deferred(&self, id: &SourceId) -> bool {
        self.deferred.contains_key(id)
    }

    /// Takes the deferred play for the sound, if there was one.
    pub fn take_deferred(&mut self, id: &SourceId) -> bool {
        self.deferred.remove(id).is_some()
    }

    pub fn cancel_all_deferred(&mut self) -> Vec<SourceId> {
        self.deferred.drain().map(|(id, _)| id).collect()
    }

    /// Forgets everything about the sound. Any completion still on its way is stale.
    pub fn abandon(&mut self, id: &SourceId) {
        self.in_flight.remove(id);
        self.deferred.remove(id);
    }

    /// Removes and returns deferred plays whose deadline has passed, abandoning their loads.
    pub fn expired(&mut self, now: Instant) -> Vec<SourceId> {
        let mut expired: Vec<SourceId> = self
            .deferred
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort();
        for id in expired.iter() {
            self.abandon(id);
        }
        expired
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transitions() {
        use LoadEvent::*;
        use LoadState::*;

        assert_eq!(transition(Unloaded, Begin), Some(Loading));
        assert_eq!(transition(Loading, Begin), None);
        assert_eq!(transition(Loading, Succeeded), Some(Ready));
        assert_eq!(transition(Loading, LoadEvent::Failed), Some(LoadState::Failed));
        assert_eq!(transition(Loading, TimedOut), Some(LoadState::Failed));
        assert_eq!(transition(LoadState::Failed, Begin), Some(Loading));
        assert_eq!(transition(Ready, Succeeded), None);
        assert_eq!(transition(LoadState::Failed, Succeeded), None);
        assert_eq!(transition(Ready, Reset), Some(Unloaded));
    }

    #[test]
    fn test_superseded_ticket_is_stale() {
        let mut tracker = LoadTracker::new(Duration::from_secs(10));
        let id = SourceId::from("rain");
        let first = tracker.begin(&id);
        let second = tracker.begin(&id);
        assert!(!tracker.accept(&id, first));
        assert!(tracker.accept(&id, second));
        assert!(!tracker.is_loading(&id));
        assert!(!tracker.accept(&id, second));
    }

    #[test]
    fn test_deferred_plays_expire() {
        let mut tracker = LoadTracker::new(Duration::from_secs(10));
        let now = Instant::now();
        let rain = SourceId::from("rain");
        let forest = SourceId::from("forest");
        let ticket = tracker.begin(&rain);
        tracker.begin(&forest);
        tracker.defer_play(&rain, now);
        tracker.defer_play(&forest, now + Duration::from_secs(5));
        // A second request doesn't push the deadline out.
        tracker.defer_play(&rain, now + Duration::from_secs(9));

        assert!(tracker.expired(now + Duration::from_secs(9)).is_empty());
        assert_eq!(tracker.expired(now + Duration::from_secs(10)), vec![rain.clone()]);
        assert!(!tracker.is_deferred(&rain));
        assert!(!tracker.accept(&rain, ticket));
        assert!(tracker.is_deferred(&forest));
    }
}
