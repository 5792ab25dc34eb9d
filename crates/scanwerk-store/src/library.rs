// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The document library: metadata store plus artifact directory, kept in
// step with each other.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{DocumentId, StoredDocument};
use tracing::{info, instrument, warn};

use crate::files::ArtifactStore;
use crate::metadata::{DocumentQuery, DocumentStore};

const DATABASE_FILE: &str = "scanwerk.db";
const DOCUMENTS_DIR: &str = "documents";

/// Everything needed to save one exported document.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub name: String,
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub tags: BTreeSet<String>,
    pub folder: Option<String>,
    pub ocr_text: Option<String>,
}

/// Saved documents under one data directory.
///
/// The SQLite connection sits behind a mutex so the library can be shared
/// between tasks; every method is blocking.
pub struct DocumentLibrary {
    store: Mutex<DocumentStore>,
    files: ArtifactStore,
}

impl DocumentLibrary {
    /// `<data_dir>/scanwerk.db` and `<data_dir>/documents/`.
    #[instrument(skip_all, fields(data_dir = %data_dir.as_ref().display()))]
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let files = ArtifactStore::new(data_dir.join(DOCUMENTS_DIR))?;
        let store = DocumentStore::open(data_dir.join(DATABASE_FILE))?;
        Ok(Self::with_parts(store, files))
    }

    pub fn with_parts(store: DocumentStore, files: ArtifactStore) -> Self {
        Self {
            store: Mutex::new(store),
            files,
        }
    }

    pub fn documents_dir(&self) -> &Path {
        self.files.root()
    }

    fn store(&self) -> Result<MutexGuard<'_, DocumentStore>> {
        self.store
            .lock()
            .map_err(|_| ScanwerkError::Database("document store lock poisoned".into()))
    }

    /// Write the artifact, then record it.
    ///
    /// The file is renamed into place before the record is inserted; if the
    /// insert fails the file is removed again, so neither half survives alone.
    /// Any failure comes back as [`ScanwerkError::Persistence`].
    #[instrument(skip_all, fields(name = %doc.name, bytes_len = doc.bytes.len()))]
    pub fn save(&self, doc: NewDocument) -> Result<StoredDocument> {
        if doc.bytes.is_empty() {
            return Err(ScanwerkError::Persistence("nothing to save".into()));
        }

        let path = self.files.persist(&doc.name, &doc.bytes)?;

        let mut record = StoredDocument::new(
            doc.name,
            path.clone(),
            doc.page_count,
            doc.bytes.len() as u64,
        );
        record.tags = doc.tags;
        record.folder = doc.folder;
        record.ocr_text = doc.ocr_text;

        let inserted = self.store().and_then(|store| store.insert(&record));
        if let Err(err) = inserted {
            warn!(error = %err, "metadata write failed; removing artifact");
            if let Err(cleanup) = self.files.remove(&path) {
                warn!(error = %cleanup, "orphaned artifact left behind");
            }
            return Err(ScanwerkError::Persistence(err.to_string()));
        }

        info!(doc_id = %record.id, "document saved");
        Ok(record)
    }

    pub fn get(&self, id: &DocumentId) -> Result<Option<StoredDocument>> {
        self.store()?.get(id)
    }

    /// Look up a document, failing with `DocumentNotFound` if it is unknown.
    pub fn require(&self, id: &DocumentId) -> Result<StoredDocument> {
        self.get(id)?
            .ok_or_else(|| ScanwerkError::DocumentNotFound(id.to_string()))
    }

    pub fn list(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>> {
        self.store()?.list(query)
    }

    pub fn toggle_favorite(&self, id: &DocumentId) -> Result<bool> {
        self.store()?.toggle_favorite(id)
    }

    pub fn set_tags(&self, id: &DocumentId, tags: &BTreeSet<String>) -> Result<()> {
        self.store()?.set_tags(id, tags)
    }

    pub fn set_folder(&self, id: &DocumentId, folder: Option<&str>) -> Result<()> {
        self.store()?.set_folder(id, folder)
    }

    pub fn attach_ocr_text(&self, id: &DocumentId, text: &str) -> Result<()> {
        let text = text.trim();
        self.store()?
            .set_ocr_text(id, (!text.is_empty()).then_some(text))
    }

    pub fn rename(&self, id: &DocumentId, name: &str) -> Result<()> {
        self.store()?.rename(id, name)
    }

    /// Remove the record, then its file. Returns the artifact path that was
    /// removed, or `None` for an unknown id.
    #[instrument(skip(self), fields(doc_id = %id))]
    pub fn delete(&self, id: &DocumentId) -> Result<Option<PathBuf>> {
        let Some(removed) = self.store()?.delete(id)? else {
            return Ok(None);
        };
        if let Err(err) = self.files.remove(&removed.file_path) {
            // The record is gone either way; a stray file is harmless.
            warn!(error = %err, "artifact could not be removed");
        }
        info!("document deleted");
        Ok(Some(removed.file_path))
    }
}
