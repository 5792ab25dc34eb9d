// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Review session: one captured photo on its way to a stored PDF.
//
// Detection, rectification, and adjustments run on the blocking pool and
// never end the session; each fallback they take is recorded as a
// `Degradation`. OCR runs as its own task beside the review and is aborted
// whenever the page it was reading changes, the session is aborted, or the
// session is dropped. Only saving can fail for the user.

use std::collections::BTreeSet;
use std::sync::Arc;

use image::DynamicImage;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{
    AdjustmentState, Degradation, DegradationKind, StoredDocument, default_document_name,
};
use scanwerk_core::{AppConfig, Quad};
use scanwerk_document::image::adjust::fit_within;
use scanwerk_document::image::overlay::composite;
use scanwerk_document::scan::{detect_or_full_frame, rectify};
use scanwerk_document::{
    AdjustedPage, AdjustmentPipeline, CornerEditor, DocumentArtifact, DocumentMetadata,
    PageAssembler, PdfInspector, SignaturePlacement, TextBlock, VisionRuntime,
};
use scanwerk_store::NewDocument;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::app_services::AppServices;

/// What a successful save hands back.
#[derive(Debug, Clone)]
pub struct SavedScan {
    pub document: StoredDocument,
    /// Fallbacks taken along the way, for display.
    pub degradations: Vec<Degradation>,
}

/// State of one capture under review.
pub struct ReviewSession {
    services: AppServices,
    config: AppConfig,
    vision: Option<Arc<dyn VisionRuntime>>,
    photo: Arc<DynamicImage>,
    editor: CornerEditor,
    rectified: Option<Arc<DynamicImage>>,
    adjustments: AdjustmentState,
    page: Option<(AdjustmentState, AdjustedPage)>,
    signature: Option<SignaturePlacement>,
    name: String,
    tags: BTreeSet<String>,
    folder: Option<String>,
    ocr_task: Option<JoinHandle<Result<String>>>,
    ocr_text: Option<String>,
    degradations: Vec<Degradation>,
}

fn task_failed(err: tokio::task::JoinError) -> ScanwerkError {
    ScanwerkError::ImageError(format!("pipeline task failed: {err}"))
}

impl ReviewSession {
    /// Decode the photo and propose corners for it.
    ///
    /// Fails only when the bytes are not an image.
    #[instrument(skip_all, fields(photo_len = photo.len()))]
    pub async fn start(services: AppServices, photo: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(photo)
            .map_err(|e| ScanwerkError::InvalidInput(format!("photo could not be decoded: {e}")))?;
        let photo = Arc::new(decoded);
        let config = services.config();

        let vision = match services.vision().ready().await {
            Ok(vision) => Some(vision),
            Err(err) => {
                warn!(error = %err, "vision runtime unavailable");
                None
            }
        };

        let (corners, detection) = {
            let vision = vision.clone();
            let photo = Arc::clone(&photo);
            let downscale = config.detection_downscale;
            tokio::task::spawn_blocking(move || {
                detect_or_full_frame(vision.as_deref(), &photo, downscale)
            })
            .await
            .map_err(task_failed)?
        };

        let editor = CornerEditor::new(corners, photo.width(), photo.height());
        let mut session = Self {
            services,
            config,
            vision,
            photo,
            editor,
            rectified: None,
            adjustments: AdjustmentState::default(),
            page: None,
            signature: None,
            name: default_document_name(),
            tags: BTreeSet::new(),
            folder: None,
            ocr_task: None,
            ocr_text: None,
            degradations: Vec::new(),
        };
        if let Some(degradation) = detection {
            session.record(degradation);
        }
        info!(corners = ?session.corners(), "review session started");
        Ok(session)
    }

    fn record(&mut self, degradation: Degradation) {
        if !self.degradations.contains(&degradation) {
            warn!(kind = ?degradation.kind, detail = %degradation.detail, "degraded");
            self.degradations.push(degradation);
        }
    }

    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    // -- Corners -------------------------------------------------------------

    pub fn corners(&self) -> Quad {
        *self.editor.quad()
    }

    /// The live corner editor. Handing it out invalidates the rectified page.
    #[cfg(test)]
    pub fn editor_mut(&mut self) -> &mut CornerEditor {
        self.invalidate_rectified();
        &mut self.editor
    }

    /// Replace the corners outright, e.g. from typed coordinates.
    pub fn set_corners(&mut self, corners: Quad) {
        self.editor = CornerEditor::new(corners, self.photo.width(), self.photo.height());
        self.invalidate_rectified();
    }

    fn invalidate_rectified(&mut self) {
        self.rectified = None;
        self.invalidate_page();
    }

    /// The photo warped through the current corners, computed once per set
    /// of corners. A failed warp keeps the photo and records why.
    pub async fn rectified(&mut self) -> Result<Arc<DynamicImage>> {
        if let Some(rectified) = &self.rectified {
            return Ok(Arc::clone(rectified));
        }

        let image = match self.vision.clone() {
            Some(vision) => {
                let photo = Arc::clone(&self.photo);
                let corners = self.corners();
                let (w, h) = (self.config.rectify_width, self.config.rectify_height);
                let outcome = tokio::task::spawn_blocking(move || {
                    rectify(&*vision, &photo, &corners, w, h)
                })
                .await
                .map_err(task_failed)?;
                if let Some(reason) = &outcome.fallback {
                    self.record(Degradation::new(
                        DegradationKind::DegenerateGeometry,
                        reason.to_string(),
                    ));
                }
                Arc::new(outcome.image)
            }
            // Without a vision runtime the photo is used as-is; detection
            // already recorded the missing runtime.
            None => Arc::clone(&self.photo),
        };

        self.rectified = Some(Arc::clone(&image));
        Ok(image)
    }

    // -- Adjustments ---------------------------------------------------------

    #[cfg(test)]
    pub fn adjustments(&self) -> AdjustmentState {
        self.adjustments
    }

    pub fn set_adjustments(&mut self, state: AdjustmentState) {
        if state != self.adjustments {
            self.adjustments = state;
            self.invalidate_page();
        }
    }

    fn invalidate_page(&mut self) {
        self.page = None;
        self.cancel_ocr();
        self.ocr_text = None;
    }

    /// The rectified page with the current adjustments applied, before any
    /// signature. Always recomputed from the rectified original.
    pub async fn render(&mut self) -> Result<&AdjustedPage> {
        let state = self.adjustments;
        let fresh = matches!(&self.page, Some((rendered, _)) if *rendered == state);
        if !fresh {
            let original = self.rectified().await?;
            let vision = self.vision.clone();
            let (radius, offset) = (self.config.bw_block_radius, self.config.bw_offset);
            let quality = self.config.preview_jpeg_quality;
            let page = tokio::task::spawn_blocking(move || {
                AdjustmentPipeline::new(vision.as_deref())
                    .with_threshold(radius, offset)
                    .with_jpeg_quality(quality)
                    .apply(&original, &state)
            })
            .await
            .map_err(task_failed)?;
            debug!(width = page.width(), height = page.height(), "page rendered");
            self.page = Some((state, page));
        }
        self.page
            .as_ref()
            .map(|(_, page)| page)
            .ok_or_else(|| ScanwerkError::ImageError("page was not rendered".into()))
    }

    /// JPEG of the adjusted page, before any signature.
    pub async fn preview_jpeg(&mut self) -> Result<Vec<u8>> {
        self.render().await?.jpeg()
    }

    // -- Signature -----------------------------------------------------------

    #[cfg(test)]
    pub fn signature(&self) -> Option<&SignaturePlacement> {
        self.signature.as_ref()
    }

    /// Place, move, or (with `None`) remove the signature. The adjusted page
    /// is kept; the overlay is applied on export.
    pub fn set_signature(&mut self, placement: Option<SignaturePlacement>) {
        self.signature = placement;
    }

    // -- Details -------------------------------------------------------------

    #[cfg(test)]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
    }

    pub fn set_folder(&mut self, folder: Option<String>) {
        self.folder = folder;
    }

    // -- OCR -----------------------------------------------------------------

    /// Turn text recognition on or off for this session only.
    pub fn set_ocr(&mut self, enabled: bool) {
        self.config.ocr_enabled = enabled;
        if !enabled {
            self.cancel_ocr();
            self.ocr_text = None;
        }
    }

    /// Start reading the current page in the background, replacing any
    /// extraction already running.
    pub async fn start_ocr(&mut self) -> Result<()> {
        self.cancel_ocr();
        self.ocr_text = None;
        let page = Arc::new(DynamicImage::ImageRgba8(self.render().await?.image.clone()));
        let worker = Arc::clone(self.services.ocr());
        self.ocr_task = Some(tokio::spawn(async move { worker.extract(page).await }));
        debug!("text extraction started");
        Ok(())
    }

    /// Wait for the background extraction, if one is running. Failures are
    /// recorded and leave the text empty.
    pub async fn finish_ocr(&mut self) -> Option<&str> {
        if let Some(task) = self.ocr_task.take() {
            match task.await {
                Ok(Ok(text)) if !text.is_empty() => self.ocr_text = Some(text),
                Ok(Ok(_)) => debug!("no text found"),
                Ok(Err(ScanwerkError::RuntimeUnavailable(reason))) => {
                    self.record(Degradation::new(DegradationKind::OcrUnavailable, reason));
                }
                Ok(Err(err)) => {
                    self.record(Degradation::new(DegradationKind::OcrFailed, err.to_string()));
                }
                Err(err) if err.is_cancelled() => debug!("text extraction cancelled"),
                Err(err) => {
                    self.record(Degradation::new(DegradationKind::OcrFailed, err.to_string()));
                }
            }
        }
        self.ocr_text.as_deref()
    }

    fn cancel_ocr(&mut self) {
        if let Some(task) = self.ocr_task.take() {
            task.abort();
            debug!("text extraction aborted");
        }
    }

    // -- Ending the session ----------------------------------------------------

    /// Drop the capture without saving. Any running extraction is aborted
    /// and its result discarded.
    pub fn abort(self) {
        info!("review session aborted");
    }

    /// Export the page and store it in the library.
    ///
    /// Text recognition runs first when enabled and nothing has been read
    /// yet; its absence never blocks the save. A failed export or store
    /// comes back as [`ScanwerkError::Persistence`].
    #[instrument(skip(self), fields(name = %self.name))]
    pub async fn save(mut self) -> Result<SavedScan> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ScanwerkError::InvalidInput("document name is empty".into()));
        }

        if self.config.ocr_enabled && self.ocr_text.is_none() && self.ocr_task.is_none() {
            self.start_ocr().await?;
        }
        let text = self.finish_ocr().await.map(str::to_string);
        let page = self.render().await?.image.clone();

        let artifact = self.export(page, &name, text.as_deref()).await?;
        let document = NewDocument {
            name,
            page_count: artifact.page_count,
            bytes: artifact.bytes,
            tags: std::mem::take(&mut self.tags),
            folder: self.folder.take(),
            ocr_text: text,
        };

        let services = self.services.clone();
        let stored = tokio::task::spawn_blocking(move || services.library().save(document))
            .await
            .map_err(|e| ScanwerkError::Persistence(format!("save task failed: {e}")))??;

        info!(doc_id = %stored.id, byte_size = stored.byte_size, "scan saved");
        Ok(SavedScan {
            document: stored,
            degradations: std::mem::take(&mut self.degradations),
        })
    }

    /// Overlay, downscale, and assemble one page, then check the result
    /// parses with the expected page count.
    async fn export(
        &self,
        page: image::RgbaImage,
        name: &str,
        text: Option<&str>,
    ) -> Result<DocumentArtifact> {
        let config = &self.config;
        let assembler = PageAssembler::new(config.paper_size);
        let (page_w_pt, _) = assembler.page_size_pt();
        let text_layer = text
            .filter(|_| config.embed_text_layer)
            .map(|t| TextBlock::top_band(t, page_w_pt));
        let metadata = DocumentMetadata {
            title: name.to_string(),
            author: Some(config.default_author.clone()).filter(|a| !a.trim().is_empty()),
            keywords: self.tags.iter().cloned().collect(),
        };
        let signature = self.signature.clone();
        let (max_w, max_h) = (config.export_max_width, config.export_max_height);

        let built = tokio::task::spawn_blocking(move || {
            let flat = match &signature {
                Some(placement) => composite(&page, placement),
                None => page,
            };
            let flat = fit_within(flat, max_w, max_h);
            let artifact = assembler.assemble_with_text(&[flat], &[text_layer], &metadata)?;
            PdfInspector::verify(&artifact.bytes, 1)?;
            Ok::<_, ScanwerkError>(artifact)
        })
        .await
        .map_err(|e| ScanwerkError::Persistence(format!("export task failed: {e}")))?;

        built.map_err(|err| ScanwerkError::Persistence(format!("could not build the PDF: {err}")))
    }
}

impl Drop for ReviewSession {
    fn drop(&mut self) {
        self.cancel_ocr();
    }
}
