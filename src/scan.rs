//! Input enumeration.
//!
//! A run works on the files directly inside the input directory. The list
//! is taken once, before anything is dispatched, and never refreshed:
//!
//! ```text
//! input/
//! ├── DSC_0001.jpg     # processed
//! ├── DSC_0002.JPG     # processed (extensions are case-insensitive)
//! ├── scan.tiff        # processed
//! ├── .DSC_0003.jpg    # skipped: hidden
//! ├── notes.txt        # skipped: not an image
//! └── raw/             # skipped: no recursion
//! ```
//!
//! Files are returned sorted by path so runs are reproducible, though
//! completion order is not.

use crate::imaging::supported_input_extensions;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Supported image files directly inside `dir`, sorted.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let meta = fs::metadata(dir).map_err(io_err)?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let path = match entry {
            Ok(entry) => entry.into_path(),
            // The directory itself could not be listed
            Err(e) if e.depth() == 0 => return Err(io_err(e.into())),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !is_hidden(&path) && is_image(&path) {
            images.push(path);
        }
    }

    images.sort();
    Ok(images)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

/// Regular file with a decodable extension.
pub fn is_image(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}
