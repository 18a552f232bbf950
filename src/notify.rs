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
use std::fmt;
use std::io::{self, BufRead, Write};

use tracing::{error, info, warn};

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Shows user-facing notifications.
pub trait Notifier {
    fn show_notification(&mut self, title: &str, message: &str, severity: Severity);
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&mut self, title: &str, message: &str) -> bool;
}

/// Sends notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_notification(&mut self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!(title, severity = %severity, "{}", message),
            Severity::Warning => warn!(title, "{}", message),
            Severity::Error => error!(title, "{}", message),
        }
    }
}

/// Always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _: &str, _: &str) -> bool {
        self.0
    }
}

/// Asks on a terminal. Anything other than "y" or "yes" declines.
pub struct PromptConfirm<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        PromptConfirm { reader, writer }
    }

    fn ask(&mut self, title: &str, message: &str) -> Result<bool, io::Error> {
        write!(self.writer, "{}: {} [y/N]: ", title, message)?;
        self.writer.flush()?;
        let mut input = String::new();
        self.reader.read_line(&mut input)?;
        Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, title: &str, message: &str) -> bool {
        self.ask(title, message).unwrap_or_else(|e| {
            warn!(err = %e, "Unable to read confirmation");
            false
        })
    }
}

#[cfg(test)]
pub use self::recording::RecordingNotifier;
