// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: owns the document library, the lazily loaded
// vision and OCR runtimes, the platform bridge, and the persisted config.
//
// The library guards its SQLite connection internally, so everything here
// is cheap to clone and safe to hand to spawned tasks.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use scanwerk_bridge::traits::PDF_MIME;
use scanwerk_bridge::{NativeCamera, NativeShare, PlatformBridge};
use scanwerk_core::AppConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{DocumentId, StoredDocument};
use scanwerk_document::vision::imageproc_loader;
use scanwerk_document::{OcrWorker, VisionLoader};
use scanwerk_store::{DocumentLibrary, DocumentQuery};
use tracing::{info, instrument, warn};

use super::data_dir;
use super::session::ReviewSession;

/// Shared application services.
#[derive(Clone)]
pub struct AppServices {
    library: Arc<DocumentLibrary>,
    vision: Arc<VisionLoader>,
    ocr: Arc<OcrWorker>,
    bridge: Arc<dyn PlatformBridge>,
    data_dir: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

impl AppServices {
    /// Initialise all services in the default data directory.
    pub fn init() -> Result<Self> {
        Self::open(data_dir::data_dir())
    }

    /// Initialise all services rooted at `dir`.
    ///
    /// Opens the library and loads `config.json`; neither heavy runtime is
    /// loaded until a session first needs it.
    #[instrument(skip_all, fields(data_dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let config = load_config(&dir).unwrap_or_default();
        let library = DocumentLibrary::open(&dir)?;
        let ocr = ocr_worker(&config);

        info!("app services initialised");
        Ok(Self {
            library: Arc::new(library),
            vision: Arc::new(imageproc_loader()),
            ocr: Arc::new(ocr),
            bridge: Arc::from(scanwerk_bridge::platform_bridge()),
            data_dir: dir,
            config: Arc::new(Mutex::new(config)),
        })
    }

    /// Replace the text recogniser.
    #[cfg(test)]
    pub(crate) fn with_ocr_worker(mut self, worker: OcrWorker) -> Self {
        self.ocr = Arc::new(worker);
        self
    }

    pub fn library(&self) -> &DocumentLibrary {
        &self.library
    }

    pub fn vision(&self) -> &VisionLoader {
        &self.vision
    }

    pub fn ocr(&self) -> &Arc<OcrWorker> {
        &self.ocr
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn platform_name(&self) -> &str {
        self.bridge.platform_name()
    }

    // -- Capture & review ----------------------------------------------------

    /// Take a photo from `source`, or from the platform camera when `None`.
    /// `Ok(None)` means the capture was cancelled.
    pub fn capture_photo(&self, source: Option<&dyn NativeCamera>) -> Result<Option<Vec<u8>>> {
        match source {
            Some(camera) => camera.capture_image(),
            None => self.bridge.capture_image(),
        }
    }

    /// Start reviewing a captured photo.
    pub async fn new_session(&self, photo: &[u8]) -> Result<ReviewSession> {
        ReviewSession::start(self.clone(), photo).await
    }

    // -- Library -------------------------------------------------------------

    pub fn documents(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>> {
        self.library.list(query)
    }

    pub fn document(&self, id: &DocumentId) -> Result<StoredDocument> {
        self.library.require(id)
    }

    /// A full id, or a prefix that matches exactly one stored document.
    pub fn resolve_id(&self, text: &str) -> Result<DocumentId> {
        let text = text.trim();
        if let Some(id) = DocumentId::parse(text) {
            return Ok(id);
        }
        if text.is_empty() {
            return Err(ScanwerkError::InvalidInput("empty document id".into()));
        }
        let mut matches = self
            .library
            .list(&DocumentQuery::default())?
            .into_iter()
            .filter(|doc| doc.id.to_string().starts_with(text));
        match (matches.next(), matches.next()) {
            (Some(doc), None) => Ok(doc.id),
            (None, _) => Err(ScanwerkError::DocumentNotFound(text.to_string())),
            (Some(_), Some(_)) => Err(ScanwerkError::InvalidInput(format!(
                "'{text}' matches more than one document"
            ))),
        }
    }

    pub fn toggle_favorite(&self, id: &DocumentId) -> Result<bool> {
        self.library.toggle_favorite(id)
    }

    pub fn set_tags(&self, id: &DocumentId, tags: &[String]) -> Result<()> {
        let tags: BTreeSet<String> = tags.iter().cloned().collect();
        self.library.set_tags(id, &tags)
    }

    pub fn set_folder(&self, id: &DocumentId, folder: Option<&str>) -> Result<()> {
        self.library.set_folder(id, folder)
    }

    pub fn rename_document(&self, id: &DocumentId, name: &str) -> Result<()> {
        self.library.rename(id, name)
    }

    /// Delete a document; unknown ids report `DocumentNotFound`.
    pub fn delete_document(&self, id: &DocumentId) -> Result<PathBuf> {
        self.library
            .delete(id)?
            .ok_or_else(|| ScanwerkError::DocumentNotFound(id.to_string()))
    }

    /// Hand a stored PDF to `target`, or to the platform share sheet.
    #[instrument(skip(self, target), fields(doc_id = %id))]
    pub fn share_document(
        &self,
        id: &DocumentId,
        target: Option<&dyn NativeShare>,
    ) -> Result<StoredDocument> {
        let doc = self.library.require(id)?;
        if !doc.file_path.is_file() {
            warn!(path = %doc.file_path.display(), "artifact missing on disk");
            return Err(ScanwerkError::DocumentNotFound(format!(
                "{} ({})",
                doc.name,
                doc.file_path.display()
            )));
        }
        match target {
            Some(share) => share.share_file(&doc.file_path, PDF_MIME)?,
            None => self.bridge.share_file(&doc.file_path, PDF_MIME)?,
        }
        info!("document shared");
        Ok(doc)
    }

    // -- Config persistence --------------------------------------------------

    fn config_guard(&self) -> MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A clone of the current config.
    pub fn config(&self) -> AppConfig {
        self.config_guard().clone()
    }

    /// Update and persist the config. Runtime choices made at start-up (the
    /// OCR backend) apply from the next launch.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        *self.config_guard() = config.clone();
        persist_config(&self.data_dir, config)
    }

    /// Restore and persist the defaults.
    pub fn reset_config(&self) -> Result<AppConfig> {
        let defaults = AppConfig::default();
        self.save_config(&defaults)?;
        info!("config reset to defaults");
        Ok(defaults)
    }
}

/// The recogniser the config asks for, or an unavailable one.
fn ocr_worker(config: &AppConfig) -> OcrWorker {
    if !config.ocr_enabled {
        return OcrWorker::unavailable("text recognition is turned off");
    }
    #[cfg(feature = "ocr")]
    {
        OcrWorker::ocrs(scanwerk_document::scan::OcrConfig::from_optional_dir(
            config.ocr_model_dir.as_deref(),
        ))
    }
    #[cfg(not(feature = "ocr"))]
    {
        OcrWorker::unavailable("built without text recognition")
    }
}

// -- Config file persistence -------------------------------------------------

const CONFIG_FILE: &str = "config.json";

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(error = %e, "config.json unreadable; using defaults");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanwerk_bridge::FolderShare;
    use scanwerk_store::NewDocument;

    fn services(dir: &Path) -> AppServices {
        AppServices::open(dir).expect("open services")
    }

    fn saved(svc: &AppServices, name: &str) -> StoredDocument {
        svc.library()
            .save(NewDocument {
                name: name.into(),
                bytes: format!("%PDF-1.7 {name}").into_bytes(),
                page_count: 1,
                ..Default::default()
            })
            .expect("save")
    }

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = services(dir.path());
        assert_eq!(svc.config(), AppConfig::default());

        let mut config = svc.config();
        config.rectify_width = 1200;
        config.default_author = "Archive".into();
        svc.save_config(&config).expect("save");

        let reopened = services(dir.path());
        assert_eq!(reopened.config().rectify_width, 1200);
        assert_eq!(reopened.config().default_author, "Archive");

        reopened.reset_config().expect("reset");
        assert_eq!(services(dir.path()).config(), AppConfig::default());
    }

    #[test]
    fn corrupt_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").expect("write");
        assert_eq!(services(dir.path()).config(), AppConfig::default());
    }

    #[test]
    fn ids_resolve_from_unique_prefixes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = services(dir.path());
        let doc = saved(&svc, "Lease");
        let full = doc.id.to_string();

        assert_eq!(svc.resolve_id(&full).expect("full"), doc.id);
        assert_eq!(svc.resolve_id(&full[..8]).expect("prefix"), doc.id);
        assert!(matches!(
            svc.resolve_id("zzzz"),
            Err(ScanwerkError::DocumentNotFound(_))
        ));
        assert!(matches!(svc.resolve_id("  "), Err(ScanwerkError::InvalidInput(_))));
    }

    #[test]
    fn share_copies_into_the_target_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = services(dir.path());
        let doc = saved(&svc, "Invoice");
        let outbox = dir.path().join("outbox");

        svc.share_document(&doc.id, Some(&FolderShare::new(&outbox)))
            .expect("share");
        let file_name = doc.file_path.file_name().expect("file name");
        assert!(outbox.join(file_name).is_file());
    }

    #[test]
    fn platform_share_is_unavailable_on_desktop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = services(dir.path());
        let doc = saved(&svc, "Invoice");
        assert!(matches!(
            svc.share_document(&doc.id, None),
            Err(ScanwerkError::PlatformUnavailable)
        ));
    }

    #[test]
    fn deleting_twice_reports_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = services(dir.path());
        let doc = saved(&svc, "Draft");

        svc.delete_document(&doc.id).expect("delete");
        assert!(matches!(
            svc.delete_document(&doc.id),
            Err(ScanwerkError::DocumentNotFound(_))
        ));
    }
}
