// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text extraction worker.
//
// The recogniser is loaded once per process and every extraction runs in
// its own lane: one page at a time, on the blocking pool, independent of
// any adjustment work happening meanwhile.

use std::sync::Arc;

use image::DynamicImage;
use scanwerk_core::error::{Result, ScanwerkError};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::runtime::RuntimeLoader;

/// Anything that can turn a page raster into text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &DynamicImage) -> Result<String>;
}

/// Lazy holder for the process-wide recogniser.
pub type OcrLoader = RuntimeLoader<dyn TextExtractor>;

/// Serialised, lazily initialised OCR.
pub struct OcrWorker {
    loader: OcrLoader,
    /// Held by the blocking extraction itself, so an aborted caller keeps
    /// the lane busy until the recogniser really returns.
    lane: Arc<Mutex<()>>,
}

impl OcrWorker {
    pub fn new(loader: OcrLoader) -> Self {
        Self {
            loader,
            lane: Arc::new(Mutex::new(())),
        }
    }

    /// A worker whose recogniser is built by `factory` on first use.
    pub fn with_factory<E, F>(factory: F) -> Self
    where
        E: TextExtractor + 'static,
        F: Fn() -> Result<E> + Send + Sync + 'static,
    {
        Self::new(OcrLoader::new(
            "ocr",
            Arc::new(move || factory().map(|e| Arc::new(e) as Arc<dyn TextExtractor>)),
        ))
    }

    /// A worker that always reports the recogniser as unavailable.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(OcrLoader::unavailable("ocr", reason))
    }

    /// The `ocrs` recogniser with models from `config`.
    #[cfg(feature = "ocr")]
    pub fn ocrs(config: super::ocr::OcrConfig) -> Self {
        Self::with_factory(move || super::ocr::OcrEngine::new(config.clone()))
    }

    /// Load the recogniser now instead of on the first page.
    pub async fn warm_up(&self) -> Result<()> {
        self.loader.ready().await.map(|_| ())
    }

    pub fn is_ready(&self) -> bool {
        self.loader.is_ready()
    }

    /// Recognise text on one page. Calls queue behind each other.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub async fn extract(&self, image: Arc<DynamicImage>) -> Result<String> {
        let engine = self.loader.ready().await?;
        let turn = Arc::clone(&self.lane).lock_owned().await;
        debug!("extraction started");
        let text = tokio::task::spawn_blocking(move || {
            let _turn = turn;
            engine.extract_text(&image)
        })
        .await
        .map_err(|e| ScanwerkError::OcrError(format!("extraction task failed: {e}")))??;
        let text = text.trim().to_string();
        info!(chars = text.len(), "text extracted");
        Ok(text)
    }

    /// Drop the loaded recogniser; the next extraction reloads it.
    pub fn terminate(&self) {
        self.loader.teardown();
    }
}
