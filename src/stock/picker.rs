//! Uniform-random asset selection
//!
//! Picks one distributable file from a location. Removing or handing out the
//! file is the distribution layer's side effect; this only selects.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;

/// Select one eligible file uniformly at random.
///
/// Returns None when the location is missing or holds no matching files.
pub fn pick_random_asset(directory: &Path, extension: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(directory).ok()?;

    let candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect();

    candidates.choose(&mut rand::thread_rng()).cloned()
}
