//! Locate the artifact an external tool actually wrote.
//!
//! Downloaders and post-processors pick the final container at runtime, so the
//! output path is only known as `<base_name>.<something>`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, ConvkitError};
use crate::fetch::MediaKind;

/// Resolve the produced file for `base_name` inside `directory`.
///
/// `<base_name>.mp3` (audio) or `<base_name>.mp4` (video) wins when present, even
/// if a newer file with another extension exists; otherwise the newest
/// `<base_name>.*` regular file is returned.
pub fn locate(directory: &Path, base_name: &str, kind: MediaKind) -> Result<PathBuf> {
    let expected = directory.join(format!("{}.{}", base_name, kind.canonical_extension()));
    if expected.is_file() {
        return Ok(expected);
    }

    let prefix = format!("{}.", base_name);
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let suffix = match name.strip_prefix(&prefix) {
            Some(suffix) => suffix,
            None => continue,
        };
        if suffix.is_empty() || suffix.contains('.') {
            continue;
        }

        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        if newest.as_ref().is_none_or(|(best, _)| modified > *best) {
            newest = Some((modified, entry.into_path()));
        }
    }

    match newest {
        Some((_, path)) => {
            debug!("Resolved {} to {}", base_name, path.display());
            Ok(path)
        }
        None => Err(ConvkitError::ArtifactNotFound(base_name.to_string())),
    }
}
