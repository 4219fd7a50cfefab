//! Pre-uploaded image resolution and archival.
//!
//! Users can drop an image into the watched uploads directory instead of
//! pointing the camera at something; the next job consumes the newest
//! one. A consumed upload moves to the processed archive exactly once,
//! whether or not the rest of the job went well.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// The watched uploads directory and its processed-archive subdirectory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    uploads: PathBuf,
    processed: PathBuf,
}

impl UploadStore {
    pub fn new(uploads: impl Into<PathBuf>) -> Self {
        let uploads = uploads.into();
        let processed = uploads.join("processed");
        Self { uploads, processed }
    }

    /// Create the uploads and processed directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.uploads)
            .with_context(|| format!("creating {}", self.uploads.display()))?;
        fs::create_dir_all(&self.processed)
            .with_context(|| format!("creating {}", self.processed.display()))?;
        Ok(())
    }

    /// Most recently modified image file in the uploads directory, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        let entries = fs::read_dir(&self.uploads)
            .with_context(|| format!("reading {}", self.uploads.display()))?;

        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !has_image_extension(&path) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            let is_newer = match &newest {
                Some((when, _)) => modified > *when,
                None => true,
            };
            if is_newer {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    /// Move a consumed upload into the processed archive. Falls back to
    /// copy-and-remove when the archive lives on another filesystem.
    pub fn archive(&self, path: &Path) -> Result<PathBuf> {
        let file_name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?;
        let dest = self.processed.join(file_name);
        if fs::rename(path, &dest).is_err() {
            fs::copy(path, &dest)
                .with_context(|| format!("copying {} into the archive", path.display()))?;
            fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
        }
        info!(from = %path.display(), to = %dest.display(), "upload archived");
        Ok(dest)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == e)
        })
        .unwrap_or(false)
}
