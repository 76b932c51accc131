// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition backend built on `ocrs`, a pure-Rust OCR engine whose neural
// network models run on `rten`.
//
// The engine needs two model files in one directory:
//
// - `text-detection.rten` locates text regions in the image.
// - `text-recognition.rten` decodes characters from the detected regions.
//
// Running `ocrs-cli` once downloads both into `~/.cache/ocrs/`.
//
// `ocrs` and `rten` must be compiled in release mode; debug builds are
// 10-100x slower.

use std::path::{Path, PathBuf};

use docwerk_core::error::{DocwerkError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use super::{OcrBackend, OcrLine, OcrRequest};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrsModelPaths {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl OcrsModelPaths {
    /// Expects `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (role, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(DocwerkError::EngineUnavailable(format!(
                    "{role} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// `ocrs` engine with loaded models. Load once, reuse for every image.
pub struct OcrsBackend {
    engine: OcrsEngine,
}

impl OcrsBackend {
    /// Load both models from `dir`.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load(&OcrsModelPaths::from_dir(dir))
    }

    pub fn load(paths: &OcrsModelPaths) -> Result<Self> {
        paths.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&paths.detection_model_path).map_err(|err| {
            DocwerkError::EngineUnavailable(format!(
                "failed to load detection model from {}: {}",
                paths.detection_model_path.display(),
                err
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model =
            Model::load_file(&paths.recognition_model_path).map_err(|err| {
                DocwerkError::EngineUnavailable(format!(
                    "failed to load recognition model from {}: {}",
                    paths.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            DocwerkError::EngineUnavailable(format!("failed to initialise OCR engine: {}", err))
        })?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }
}

impl OcrBackend for OcrsBackend {
    fn name(&self) -> &str {
        "ocrs"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage, request: &OcrRequest<'_>) -> Result<Vec<OcrLine>> {
        // The bundled models are Latin-script only; languages are not a model input.
        debug!(languages = ?request.languages, "Starting recognition");

        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            DocwerkError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| DocwerkError::OcrError(format!("OCR preprocessing failed: {}", err)))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| DocwerkError::OcrError(format!("word detection failed: {}", err)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(words = word_rects.len(), lines = line_rects.len(), "Text lines found");

        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| DocwerkError::OcrError(format!("line recognition failed: {}", err)))?;

        let lines: Vec<OcrLine> = line_texts
            .iter()
            .flatten()
            .map(|line| line.to_string())
            .filter(|text| !text.trim().is_empty())
            .map(|text| OcrLine {
                text,
                confidence: None,
            })
            .collect();

        debug!(recognized = lines.len(), "Recognition complete");
        Ok(lines)
    }
}
