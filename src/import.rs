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

//! Turns user-supplied files into registered sounds.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, span, warn, Level};

use crate::controller::Controller;
use crate::error::ImportError;
use crate::notify::Severity;
use crate::sound::{Category, Origin, SoundDescriptor, SourceId, SourceKind};

/// File extensions that can be imported.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["mp3", "wav", "ogg", "aac", "m4a", "flac"];

const AFFIRMATION_WORDS: &[&str] = &["affirm", "mantra", "meditat", "mindful", "breath"];
const MUSIC_WORDS: &[&str] = &[
    "music", "piano", "guitar", "lofi", "lo fi", "jazz", "song", "melody", "beat", "synth",
];
const NATURE_WORDS: &[&str] = &[
    "rain", "storm", "thunder", "forest", "ocean", "wave", "river", "stream", "creek", "bird",
    "wind", "nature", "water", "jungle",
];

/// A file offered for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHandle {
    /// A file with a stable location on disk.
    Path(PathBuf),
    /// An in-memory payload, such as a drag-and-drop. It gets a generated backing file.
    Transient { file_name: String, bytes: Vec<u8> },
}

impl FileHandle {
    pub fn file_name(&self) -> String {
        match self {
            FileHandle::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            FileHandle::Transient { file_name, .. } => file_name.clone(),
        }
    }
}

/// The lowercase extension of a file name, if it's importable.
fn supported_extension(file_name: &str) -> Result<String, ImportError> {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(ImportError::UnsupportedFormat {
            file: file_name.to_string(),
            extension,
        })
    }
}

/// Derives a display name from a file name: "soft_rain-loop.mp3" becomes "Soft Rain Loop".
pub fn display_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    stem.replace(['_', '-', '.'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Guesses a category from keywords in the name.
pub fn infer_category(name: &str) -> Category {
    let name = name.to_lowercase().replace(['_', '-', '.'], " ");
    let has_any = |words: &[&str]| words.iter().any(|word| name.contains(word));
    if has_any(AFFIRMATION_WORDS) {
        Category::Affirmations
    } else if has_any(MUSIC_WORDS) {
        Category::Music
    } else if has_any(NATURE_WORDS) {
        Category::Nature
    } else {
        Category::Ambient
    }
}

fn origin_for(handle: FileHandle, file_name: &str, extension: &str) -> Result<Origin, ImportError> {
    match handle {
        FileHandle::Path(path) => Ok(Origin::Path(path)),
        FileHandle::Transient { bytes, .. } => {
            let resource_error = |source| ImportError::ResourceCreation {
                file: file_name.to_string(),
                source,
            };
            let mut file = tempfile::Builder::new()
                .prefix("ambimix-")
                .suffix(&format!(".{}", extension))
                .tempfile()
                .map_err(resource_error)?;
            file.write_all(&bytes).map_err(resource_error)?;
            file.flush().map_err(resource_error)?;
            Ok(Origin::Transient(file.into_temp_path()))
        }
    }
}

fn import_one(controller: &mut Controller, handle: FileHandle) -> Result<SourceId, ImportError> {
    let file_name = handle.file_name();
    let extension = supported_extension(&file_name)?;
    let name = display_name(&file_name);
    let category = infer_category(&file_name);
    let origin = origin_for(handle, &file_name, &extension)?;

    let id = controller.register(SoundDescriptor::new(
        name,
        category,
        SourceKind::CustomLocal,
        origin,
    ))?;
    if let Err(e) = controller.load(&id) {
        warn!(id = id.as_str(), err = %e, "Unable to start loading imported sound");
    }
    Ok(id)
}

/// Imports a batch of files. Each failure is reported on its own, and one summary
/// notification follows the batch.
pub fn import_files(
    controller: &mut Controller,
    handles: Vec<FileHandle>,
) -> Vec<Result<SourceId, ImportError>> {
    let span = span!(Level::INFO, "import");
    let _enter = span.enter();

    if handles.is_empty() {
        return Vec::new();
    }

    let results: Vec<Result<SourceId, ImportError>> = handles
        .into_iter()
        .map(|handle| {
            let result = import_one(controller, handle);
            if let Err(e) = &result {
                warn!(err = %e, "Import failed");
                controller.notify("Import failed", &e.to_string(), Severity::Error);
            }
            result
        })
        .collect();

    let imported = results.iter().filter(|result| result.is_ok()).count();
    info!(imported, failed = results.len() - imported, "Import finished.");
    controller.notify(
        "Import complete",
        &format!(
            "{} sound{} imported",
            imported,
            if imported == 1 { "" } else { "s" }
        ),
        Severity::Success,
    );
    results
}
