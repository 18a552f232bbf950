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

//! The sound engine of an ambient-sound mixer: a registry of local and hosted
//! sounds, per-source and master volume, load tracking, imports, presets and
//! one-shot timer chimes.

pub mod audio;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod external;
pub mod import;
pub mod keyboard;
pub mod notify;
pub mod persist;
pub mod presets;
pub mod registry;
pub mod runtime;
pub mod sound;
pub mod state;
#[cfg(test)]
mod testutil;
pub mod volume;
