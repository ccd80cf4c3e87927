//! Input discovery.
//!
//! Turns the paths given on the command line into the list of images to
//! compress. Files are taken as given, whatever their extension; an undecodable
//! one fails at decode time. Directories are walked recursively and only
//! files with a decodable extension are kept.
//!
//! The result is sorted and de-duplicated so runs are reproducible and a
//! file named both directly and through its directory is processed once.

use crate::imaging::supported_input_extensions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Whether `path` has an extension one of the compiled-in decoders handles.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Expand files and directories into a sorted, de-duplicated list of images.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ScanError> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_file() {
            found.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry?;
                if entry.file_type().is_file() && is_supported_image(entry.path()) {
                    found.push(entry.into_path());
                }
            }
        } else {
            return Err(ScanError::NotFound(path.clone()));
        }
    }
    found.sort();
    found.dedup();
    tracing::debug!(count = found.len(), "collected inputs");
    Ok(found)
}
