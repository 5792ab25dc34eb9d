// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact files on disk.
//
// Every write goes to a temporary file in the target directory and is then
// renamed into place, so a reader never sees a half-written PDF. A rename
// never replaces an existing file: each saved document owns its path.

use std::io::Write;
use std::path::{Path, PathBuf};

use scanwerk_core::error::{Result, ScanwerkError};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::integrity::short_digest;

const MAX_STEM_CHARS: usize = 64;
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Directory of exported PDFs.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Use `root`, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            ScanwerkError::Persistence(format!("create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<sanitised name>-<digest>.pdf`, with `-<n>` before the
    /// extension for the `n`th attempt after a collision.
    fn candidate(&self, stem: &str, digest: &str, attempt: u32) -> PathBuf {
        let file_name = if attempt <= 1 {
            format!("{stem}-{digest}.pdf")
        } else {
            format!("{stem}-{digest}-{attempt}.pdf")
        };
        self.root.join(file_name)
    }

    /// Write `bytes` atomically under a path no other artifact uses and
    /// return it.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn persist(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let stem = file_stem(name);
        let digest = short_digest(bytes);
        let first = self.candidate(&stem, &digest, 1);

        let mut tmp = NamedTempFile::new_in(&self.root)
            .map_err(|e| write_error("temp file for", &first, e))?;
        tmp.write_all(bytes)
            .map_err(|e| write_error("write", &first, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| write_error("sync", &first, e))?;

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let target = self.candidate(&stem, &digest, attempt);
            match tmp.persist_noclobber(&target) {
                Ok(_) => {
                    info!(path = %target.display(), "artifact written");
                    return Ok(target);
                }
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(path = %target.display(), "name taken");
                    tmp = e.file;
                }
                Err(e) => return Err(write_error("rename into", &target, e.error)),
            }
        }
        Err(ScanwerkError::Persistence(format!(
            "no free file name for {}",
            first.display()
        )))
    }

    /// Delete an artifact. A file that is already gone is not an error.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn remove(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!("artifact removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("artifact already missing");
                Ok(())
            }
            Err(e) => Err(ScanwerkError::Persistence(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }
}

fn write_error(what: &str, target: &Path, err: std::io::Error) -> ScanwerkError {
    ScanwerkError::Persistence(format!("{what} {}: {err}", target.display()))
}

/// A file-name-safe stem: letters, digits, `-` and `_`; anything else becomes
/// `_`. Empty names become `scan`.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .take(MAX_STEM_CHARS)
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "scan".into() } else { stem }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_writes_exact_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path().join("documents")).expect("store");

        let path = store.persist("Scan_2026-03-01_09-15", b"%PDF-1.7 one").expect("persist");
        assert_eq!(std::fs::read(&path).expect("read"), b"%PDF-1.7 one");
        assert!(path.starts_with(store.root()));
        assert!(
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("Scan_2026-03-01_09-15-") && n.ends_with(".pdf"))
        );

        // Only the final file remains; no temp files linger.
        let entries = std::fs::read_dir(store.root()).expect("read_dir").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn different_bytes_get_different_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path()).expect("store");
        let a = store.persist("Same name", b"first").expect("persist");
        let b = store.persist("Same name", b"second").expect("persist");
        assert_ne!(a, b);
    }

    #[test]
    fn identical_saves_never_share_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path()).expect("store");
        let a = store.persist("Receipt", b"%PDF-1.7 same").expect("persist");
        let b = store.persist("Receipt", b"%PDF-1.7 same").expect("persist");
        assert_ne!(a, b);
        assert!(
            b.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("-2.pdf"))
        );

        store.remove(&a).expect("remove");
        assert_eq!(std::fs::read(&b).expect("read"), b"%PDF-1.7 same");
        assert_eq!(std::fs::read_dir(store.root()).expect("read_dir").count(), 1);
    }

    #[test]
    fn names_are_sanitised() {
        assert_eq!(file_stem("Tax/2026: final?"), "Tax_2026__final_");
        assert_eq!(file_stem("   "), "scan");
        assert_eq!(file_stem(&"x".repeat(200)).len(), MAX_STEM_CHARS);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path()).expect("store");
        let path = store.persist("gone", b"bytes").expect("persist");
        store.remove(&path).expect("remove");
        assert!(!path.exists());
        store.remove(&path).expect("remove again");
    }
}
