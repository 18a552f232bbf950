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

/// Errors from reading the engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unable to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid duration for {field}: {reason}")]
    Duration { field: &'static str, reason: String },

    #[error("Built-in sound {0} needs exactly one of file or media")]
    BuiltinSource(String),

    #[error("Unknown notification sound kind '{0}'")]
    NotificationKind(String),
}
