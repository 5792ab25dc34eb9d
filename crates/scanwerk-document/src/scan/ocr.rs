// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `ocrs` recogniser for scanned pages (feature `ocr`).
//
// The engine needs two model files, `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them to
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`), which is where they
// are looked for unless a directory is configured.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument};

use super::text::TextExtractor;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where the two model files live.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Models named `text-detection.rten` / `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// The configured directory, or the default cache.
    pub fn from_optional_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::from_dir).unwrap_or_default()
    }

    pub fn models_present(&self) -> bool {
        self.detection_model_path.exists() && self.recognition_model_path.exists()
    }

    /// Both model files must exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(ScanwerkError::RuntimeUnavailable(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Page recogniser backed by `ocrs`.
///
/// Loading the models is the expensive step; the worker keeps one engine
/// for the whole process. Build `ocrs` and `rten` in release mode, debug
/// builds are far too slow for full pages.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                ScanwerkError::RuntimeUnavailable(format!(
                    "failed to load OCR model {}: {err}",
                    path.display()
                ))
            })
        };

        info!("loading OCR models");
        let detection_model = load(&config.detection_model_path)?;
        let recognition_model = load(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| ScanwerkError::RuntimeUnavailable(format!("OCR engine init: {err}")))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    /// All recognised text, one line per text line.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn recognize_text(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            ScanwerkError::OcrError(format!("image source ({width}x{height}): {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| ScanwerkError::OcrError(format!("preprocessing failed: {err}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| ScanwerkError::OcrError(format!("recognition failed: {err}")))?;

        debug!(lines = text.lines().count(), chars = text.len(), "recognition complete");
        Ok(text)
    }
}

impl TextExtractor for OcrEngine {
    fn extract_text(&self, image: &DynamicImage) -> Result<String> {
        self.recognize_text(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_paths_live_in_one_directory() {
        let config = OcrConfig::from_dir("/srv/scanwerk/models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/srv/scanwerk/models/text-detection.rten")
        );
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/srv/scanwerk/models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_are_runtime_unavailable() {
        let config = OcrConfig::from_dir("/nonexistent/path/ocr-models");
        assert!(!config.models_present());
        assert!(matches!(
            config.validate(),
            Err(ScanwerkError::RuntimeUnavailable(_))
        ));
        assert!(OcrEngine::new(config).is_err());
    }

    #[test]
    fn default_config_ends_with_model_names() {
        let config = OcrConfig::from_optional_dir(None);
        assert!(config.detection_model_path.ends_with(DETECTION_MODEL_FILENAME));
        assert!(config.recognition_model_path.ends_with(RECOGNITION_MODEL_FILENAME));
    }
}
