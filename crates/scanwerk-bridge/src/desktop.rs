// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop stand-ins: an image file acts as the camera, a folder acts as the
// share target.

use std::path::{Path, PathBuf};

use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{info, instrument};

use crate::traits::{NativeCamera, NativeShare};

/// A "camera" that returns the bytes of an existing photo.
#[derive(Debug, Clone)]
pub struct ImageFileSource {
    path: PathBuf,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NativeCamera for ImageFileSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn capture_image(&self) -> Result<Option<Vec<u8>>> {
        let bytes = std::fs::read(&self.path)?;
        if bytes.is_empty() {
            return Err(ScanwerkError::InvalidInput(format!(
                "{} is empty",
                self.path.display()
            )));
        }
        info!(bytes_len = bytes.len(), "photo loaded");
        Ok(Some(bytes))
    }
}

/// Shares by copying the file into a destination folder.
#[derive(Debug, Clone)]
pub struct FolderShare {
    destination: PathBuf,
}

impl FolderShare {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

impl NativeShare for FolderShare {
    #[instrument(skip(self), fields(dest = %self.destination.display()))]
    fn share_file(&self, path: &Path, mime_type: &str) -> Result<()> {
        let file_name = path.file_name().ok_or_else(|| {
            ScanwerkError::InvalidInput(format!("{} has no file name", path.display()))
        })?;
        std::fs::create_dir_all(&self.destination)?;
        let target = self.destination.join(file_name);
        std::fs::copy(path, &target).map_err(|e| {
            ScanwerkError::Bridge(format!("copy to {}: {e}", target.display()))
        })?;
        info!(target = %target.display(), mime_type, "file shared");
        Ok(())
    }
}
