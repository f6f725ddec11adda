//! Reference gallery: a directory of photos, one known person per file.
//!
//! The directory is maintained out of band, so it is listed fresh on every
//! scan. Entries are returned sorted by file name.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions (lowercase) accepted as reference photos.
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read reference directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One photo in the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub path: PathBuf,
    /// File stem as it appears on disk (e.g. "Aditya" for `Aditya.jpg`).
    pub name: String,
}

/// A directory of reference photos.
#[derive(Debug, Clone)]
pub struct Gallery {
    dir: PathBuf,
}

impl Gallery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List reference photos in scan order (sorted by file name).
    ///
    /// Hidden files, subdirectories and files without an image extension are
    /// skipped.
    pub fn entries(&self) -> Result<Vec<ReferenceImage>, GalleryError> {
        let io_err = |source: std::io::Error| GalleryError::Io {
            path: self.dir.display().to_string(),
            source,
        };

        let mut entries = Vec::new();
        for dirent in std::fs::read_dir(&self.dir).map_err(io_err)? {
            let dirent = dirent.map_err(io_err)?;
            let path = dirent.path();

            // Follows symlinks, so linked photos count
            if !path.is_file() {
                continue;
            }
            match reference_name(&path) {
                Some(name) => entries.push(ReferenceImage { path, name }),
                None => tracing::debug!(path = %path.display(), "skipping non-image gallery entry"),
            }
        }

        entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(entries)
    }
}

/// Stem of a visible file with an accepted image extension.
fn reference_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with('.') {
        return None;
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    (!stem.is_empty()).then(|| stem.to_string())
}
