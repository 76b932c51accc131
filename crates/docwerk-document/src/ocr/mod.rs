// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR — text recognition for images through a pluggable backend, and the
// embedded text layer for PDFs.
//
// The `ocrs` backend is only compiled with the `ocr` feature:
//
// ```toml
// docwerk-document = { path = "crates/docwerk-document", features = ["ocr"] }
// ```

pub mod enhance;
#[cfg(feature = "ocr")]
pub mod ocrs_backend;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use docwerk_core::error::{DocwerkError, Result};
use docwerk_core::{
    OcrLanguage, OcrMetadata, OcrOptions, OcrOutputFormat, OcrResult, PipelineConfig,
    SupportedFormat,
};
use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::io;
use crate::pdf::reader::PdfReader;
use crate::text::html;
use crate::validate::{self, ValidatedSource};

/// Backend name reported for PDFs read through their text layer.
pub const PDF_TEXT_LAYER: &str = "pdf-text-layer";

/// Rotations tried when orientation detection is on.
const ORIENTATIONS: [u16; 4] = [0, 90, 180, 270];

/// Default directory for cached OCR model files: `$XDG_CACHE_HOME/ocrs`,
/// falling back to `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// One recognised line of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrLine {
    pub text: String,
    /// 0-100 when the backend scores lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl OcrLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Per-call hints passed to a backend.
#[derive(Debug, Clone, Copy)]
pub struct OcrRequest<'a> {
    pub languages: &'a [OcrLanguage],
    pub preserve_layout: bool,
}

/// A text recogniser for a single decoded image.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, image: &DynamicImage, request: &OcrRequest<'_>) -> Result<Vec<OcrLine>>;
}

/// Recognised lines of one page.
#[derive(Debug, Clone, Serialize)]
struct PageLines {
    page: u32,
    lines: Vec<OcrLine>,
}

/// OCR over images and PDFs.
#[derive(Clone)]
pub struct OcrEngine {
    backend: Option<Arc<dyn OcrBackend>>,
    max_file_size: u64,
}

impl OcrEngine {
    /// Engine for `config`. With the `ocr` feature the `ocrs` models are
    /// loaded from `ocr_model_dir` (or [`default_model_dir`]); when they are
    /// missing the engine still serves PDFs but image OCR is unavailable.
    pub fn new(config: &PipelineConfig) -> Self {
        let engine = Self::without_backend(config);

        #[cfg(feature = "ocr")]
        {
            let dir = config.ocr_model_dir.clone().unwrap_or_else(default_model_dir);
            match ocrs_backend::OcrsBackend::from_model_dir(&dir) {
                Ok(backend) => return engine.with_backend(backend),
                Err(err) => warn!(%err, "OCR models unavailable; image OCR disabled"),
            }
        }

        engine
    }

    /// Engine with no recognition backend.
    pub fn without_backend(config: &PipelineConfig) -> Self {
        Self {
            backend: None,
            max_file_size: config.max_file_size,
        }
    }

    pub fn with_backend(mut self, backend: impl OcrBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Name of the image backend, if one is loaded.
    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    /// Recognise the text of an image or PDF.
    ///
    /// Invalid options, a missing or non-image/PDF input, and a missing
    /// backend are returned as `Err`. Recognition failures come back as
    /// `success = false`.
    #[instrument(skip_all, fields(path = %input.display()))]
    pub fn perform_ocr(&self, input: &Path, options: &OcrOptions) -> Result<OcrResult> {
        let started = Instant::now();
        let (source, languages) = self.prepare(input, options)?;
        match self.execute(&source, &languages, options, started) {
            Ok(result) => Ok(result),
            Err(err) if err.is_request_error() => Err(err),
            Err(err) => {
                warn!(%err, "OCR failed");
                Ok(failed(&err, languages, started))
            }
        }
    }

    /// Raising variant of [`OcrEngine::perform_ocr`].
    #[instrument(skip_all, fields(path = %input.display()))]
    pub fn try_ocr(&self, input: &Path, options: &OcrOptions) -> Result<OcrResult> {
        let started = Instant::now();
        let (source, languages) = self.prepare(input, options)?;
        self.execute(&source, &languages, options, started)
    }

    /// Run OCR and write the rendered text to `output` on success.
    pub fn perform_ocr_to_file(
        &self,
        input: &Path,
        output: &Path,
        options: &OcrOptions,
    ) -> Result<OcrResult> {
        let result = self.perform_ocr(input, options)?;
        write_result(&result, output)?;
        Ok(result)
    }

    /// Raising variant of [`OcrEngine::perform_ocr_to_file`].
    pub fn try_ocr_to_file(
        &self,
        input: &Path,
        output: &Path,
        options: &OcrOptions,
    ) -> Result<OcrResult> {
        let result = self.try_ocr(input, options)?;
        write_result(&result, output)?;
        Ok(result)
    }

    fn prepare(
        &self,
        input: &Path,
        options: &OcrOptions,
    ) -> Result<(ValidatedSource, Vec<OcrLanguage>)> {
        if options.languages.is_empty() {
            return Err(DocwerkError::Validation(
                "at least one OCR language is required".into(),
            ));
        }
        if options.confidence > 100 {
            return Err(DocwerkError::Validation(format!(
                "confidence must be 0-100, got {}",
                options.confidence
            )));
        }

        let source = validate::validate_source(input, None, self.max_file_size)?;
        if !source.format.is_image() && source.format != SupportedFormat::Pdf {
            return Err(DocwerkError::UnsupportedOperation(format!(
                "OCR needs an image or PDF, {} is {}",
                input.display(),
                source.format
            )));
        }
        if source.format.is_image() && self.backend.is_none() {
            return Err(DocwerkError::EngineUnavailable(
                "no OCR backend is loaded; build with the `ocr` feature and install the models"
                    .into(),
            ));
        }

        Ok((source, dedupe(&options.languages)))
    }

    fn execute(
        &self,
        source: &ValidatedSource,
        languages: &[OcrLanguage],
        options: &OcrOptions,
        started: Instant,
    ) -> Result<OcrResult> {
        let request = OcrRequest {
            languages,
            preserve_layout: options.preserve_layout,
        };

        let (pages, backend) = if source.format == SupportedFormat::Pdf {
            (pdf_pages(&source.bytes)?, PDF_TEXT_LAYER.to_string())
        } else {
            let backend = self.backend.as_deref().ok_or_else(|| {
                DocwerkError::EngineUnavailable("no OCR backend is loaded".into())
            })?;
            let lines = recognize_image(backend, &source.bytes, &request, options)?;
            (vec![PageLines { page: 1, lines }], backend.name().to_string())
        };

        let pages = filter_confidence(pages, options.confidence);
        let average_confidence = average_confidence(&pages);
        let text = render(&pages, options)?;

        debug!(
            pages = pages.len(),
            chars = text.chars().count(),
            backend = %backend,
            "OCR complete"
        );

        Ok(OcrResult {
            success: true,
            text: Some(text),
            metadata: OcrMetadata {
                page_count: (pages.len() as u32).max(1),
                detected_languages: languages.to_vec(),
                processing_time: elapsed(started),
                average_confidence,
                backend: Some(backend),
            },
            error: None,
        })
    }
}

impl std::fmt::Debug for OcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrEngine")
            .field("backend", &self.backend_name())
            .field("max_file_size", &self.max_file_size)
            .finish()
    }
}

// -- Recognition --------------------------------------------------------------

fn pdf_pages(bytes: &[u8]) -> Result<Vec<PageLines>> {
    let reader = PdfReader::from_bytes(bytes)?;
    Ok(reader
        .page_texts()
        .into_iter()
        .enumerate()
        .map(|(index, text)| PageLines {
            page: index as u32 + 1,
            lines: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(OcrLine::new)
                .collect(),
        })
        .collect())
}

fn recognize_image(
    backend: &dyn OcrBackend,
    bytes: &[u8],
    request: &OcrRequest<'_>,
    options: &OcrOptions,
) -> Result<Vec<OcrLine>> {
    let mut image = ImageProcessor::from_bytes(bytes)?.into_dynamic();
    if options.enhance_image {
        image = enhance::enhance_for_ocr(image);
    }

    if !options.detect_orientation {
        return backend.recognize(&image, request);
    }

    let mut best: Option<(f32, u16, Vec<OcrLine>)> = None;
    for degrees in ORIENTATIONS {
        let candidate = ImageProcessor::from_dynamic(image.clone())
            .rotate(degrees)
            .into_dynamic();
        let lines = backend.recognize(&candidate, request)?;
        let score = orientation_score(&lines);
        debug!(degrees, score, "orientation candidate");
        if best.as_ref().is_none_or(|(best_score, _, _)| score > *best_score) {
            best = Some((score, degrees, lines));
        }
    }

    let (score, degrees, lines) = best.unwrap_or((0.0, 0, Vec::new()));
    info!(degrees, score, "orientation selected");
    Ok(lines)
}

/// Confidence-weighted character yield. Unscored lines count at full weight.
fn orientation_score(lines: &[OcrLine]) -> f32 {
    lines
        .iter()
        .map(|line| {
            let chars = line.text.chars().filter(|c| c.is_alphanumeric()).count() as f32;
            chars * line.confidence.unwrap_or(100.0) / 100.0
        })
        .sum()
}

/// Drop lines scored below `threshold`. Unscored lines are kept.
fn filter_confidence(pages: Vec<PageLines>, threshold: u8) -> Vec<PageLines> {
    if threshold == 0 {
        return pages;
    }
    let threshold = f32::from(threshold);
    pages
        .into_iter()
        .map(|page| PageLines {
            page: page.page,
            lines: page
                .lines
                .into_iter()
                .filter(|line| line.confidence.is_none_or(|c| c >= threshold))
                .collect(),
        })
        .collect()
}

fn average_confidence(pages: &[PageLines]) -> Option<f32> {
    let scores: Vec<f32> = pages
        .iter()
        .flat_map(|page| page.lines.iter().filter_map(|line| line.confidence))
        .collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f32>() / scores.len() as f32)
    }
}

// -- Rendering ----------------------------------------------------------------

fn render(pages: &[PageLines], options: &OcrOptions) -> Result<String> {
    let text = match options.output_format {
        OcrOutputFormat::Text => pages
            .iter()
            .map(|page| {
                let lines: Vec<&str> = page.lines.iter().map(|l| l.text.as_str()).collect();
                if options.preserve_layout {
                    lines.join("\n")
                } else {
                    lines.join(" ")
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
        OcrOutputFormat::Html => {
            let mut body = String::new();
            for page in pages {
                body.push_str(&format!("<section class=\"page\" id=\"page-{}\">\n", page.page));
                for line in &page.lines {
                    body.push_str(&format!("<p>{}</p>\n", html::escape(&line.text)));
                }
                body.push_str("</section>\n");
            }
            html::document("OCR", &body)
        }
        OcrOutputFormat::Json => serde_json::to_string_pretty(&pages)?,
    };
    Ok(text)
}

// -- Helpers ------------------------------------------------------------------

/// Remove repeated languages, keeping first occurrences in order.
fn dedupe(languages: &[OcrLanguage]) -> Vec<OcrLanguage> {
    let mut seen = Vec::with_capacity(languages.len());
    for language in languages {
        if !seen.contains(language) {
            seen.push(*language);
        }
    }
    seen
}

/// Elapsed time, never zero.
fn elapsed(started: Instant) -> Duration {
    started.elapsed().max(Duration::from_micros(1))
}

fn failed(err: &DocwerkError, languages: Vec<OcrLanguage>, started: Instant) -> OcrResult {
    OcrResult {
        success: false,
        text: None,
        metadata: OcrMetadata {
            page_count: 1,
            detected_languages: languages,
            processing_time: elapsed(started),
            average_confidence: None,
            backend: None,
        },
        error: Some(err.to_string()),
    }
}

fn write_result(result: &OcrResult, output: &Path) -> Result<()> {
    if let Some(text) = result.text.as_deref().filter(|_| result.success) {
        io::write_output(output, text.as_bytes())?;
        info!(output = %output.display(), "OCR output written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::writer::PdfWriter;
    use crate::test_support::png_bytes;
    use tempfile::TempDir;

    /// Reports the image size it was given, scored higher for landscape.
    struct SizeReporter;

    impl OcrBackend for SizeReporter {
        fn name(&self) -> &str {
            "size-reporter"
        }

        fn recognize(&self, image: &DynamicImage, _: &OcrRequest<'_>) -> Result<Vec<OcrLine>> {
            let confidence = if image.width() > image.height() { 90.0 } else { 10.0 };
            Ok(vec![
                OcrLine::new(format!("{}x{}", image.width(), image.height()))
                    .with_confidence(confidence),
                OcrLine::new("second line").with_confidence(60.0),
            ])
        }
    }

    struct Failing;

    impl OcrBackend for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(&self, _: &DynamicImage, _: &OcrRequest<'_>) -> Result<Vec<OcrLine>> {
            Err(DocwerkError::OcrError("model exploded".into()))
        }
    }

    fn engine() -> OcrEngine {
        OcrEngine::without_backend(&PipelineConfig::default()).with_backend(SizeReporter)
    }

    fn file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn text_files_are_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = file(&dir, "notes.txt", b"plain text");
        let err = engine().perform_ocr(&path, &OcrOptions::default()).unwrap_err();
        assert!(matches!(err, DocwerkError::UnsupportedOperation(_)));
    }

    #[test]
    fn option_validation() {
        let dir = TempDir::new().unwrap();
        let path = file(&dir, "scan.png", &png_bytes(4, 2));

        let empty = OcrOptions {
            languages: Vec::new(),
            ..OcrOptions::default()
        };
        assert!(matches!(
            engine().perform_ocr(&path, &empty),
            Err(DocwerkError::Validation(_))
        ));

        let too_confident = OcrOptions {
            confidence: 101,
            ..OcrOptions::default()
        };
        assert!(matches!(
            engine().perform_ocr(&path, &too_confident),
            Err(DocwerkError::Validation(_))
        ));
    }

    #[test]
    fn languages_are_deduplicated_in_order() {
        let dir = TempDir::new().unwrap();
        let path = file(&dir, "scan.png", &png_bytes(4, 2));
        let options = OcrOptions {
            languages: vec![OcrLanguage::Fra, OcrLanguage::Eng, OcrLanguage::Fra],
            ..OcrOptions::default()
        };
        let result = engine().perform_ocr(&path, &options).unwrap();
        assert!(result.success);
        assert_eq!(
            result.metadata.detected_languages,
            vec![OcrLanguage::Fra, OcrLanguage::Eng]
        );
        assert!(result.metadata.processing_time > Duration::ZERO);
        assert_eq!(result.metadata.page_count, 1);
        assert_eq!(result.metadata.backend.as_deref(), Some("size-reporter"));
    }

    #[test]
    fn confidence_filters_and_layout_joins() {
        let dir = TempDir::new().unwrap();
        let path = file(&dir, "scan.png", &png_bytes(4, 2));

        let joined = engine().perform_ocr(&path, &OcrOptions::default()).unwrap();
        assert_eq!(joined.text.as_deref(), Some("4x2 second line"));

        let options = OcrOptions {
            confidence: 70,
            preserve_layout: true,
            ..OcrOptions::default()
        };
        let filtered = engine().perform_ocr(&path, &options).unwrap();
        assert_eq!(filtered.text.as_deref(), Some("4x2"));
        assert_eq!(filtered.metadata.average_confidence, Some(90.0));
    }

    #[test]
    fn orientation_detection_picks_best_rotation() {
        let dir = TempDir::new().unwrap();
        let path = file(&dir, "portrait.png", &png_bytes(2, 6));
        let options = OcrOptions {
            detect_orientation: true,
            preserve_layout: true,
            ..OcrOptions::default()
        };
        let result = engine().perform_ocr(&path, &options).unwrap();
        assert_eq!(result.text.as_deref(), Some("6x2\nsecond line"));
    }

    #[test]
    fn backend_failure_is_folded() {
        let dir = TempDir::new().unwrap();
        let path = file(&dir, "scan.png", &png_bytes(4, 2));
        let engine = OcrEngine::without_backend(&PipelineConfig::default()).with_backend(Failing);

        let result = engine.perform_ocr(&path, &OcrOptions::default()).unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("model exploded"));

        let err = engine.try_ocr(&path, &OcrOptions::default()).unwrap_err();
        assert!(matches!(err, DocwerkError::OcrError(_)));
    }

    #[test]
    fn images_without_backend_are_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = file(&dir, "scan.png", &png_bytes(4, 2));
        let err = OcrEngine::without_backend(&PipelineConfig::default())
            .perform_ocr(&path, &OcrOptions::default())
            .unwrap_err();
        assert!(matches!(err, DocwerkError::EngineUnavailable(_)));
    }

    #[test]
    fn pdfs_use_the_text_layer_without_backend() {
        let dir = TempDir::new().unwrap();
        let pdf = PdfWriter::new().create_from_text("hello").unwrap();
        let path = file(&dir, "doc.pdf", &pdf);
        let result = OcrEngine::without_backend(&PipelineConfig::default())
            .perform_ocr(&path, &OcrOptions::default())
            .unwrap();
        assert!(result.success);
        assert_eq!(result.metadata.page_count, 1);
        assert_eq!(result.metadata.backend.as_deref(), Some(PDF_TEXT_LAYER));
    }

    #[test]
    fn json_and_html_outputs_and_file_writing() {
        let dir = TempDir::new().unwrap();
        let path = file(&dir, "scan.png", &png_bytes(4, 2));

        let json = OcrOptions {
            output_format: OcrOutputFormat::Json,
            ..OcrOptions::default()
        };
        let result = engine().perform_ocr(&path, &json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(result.text.as_deref().unwrap()).unwrap();
        assert_eq!(parsed[0]["lines"][0]["text"], "4x2");
        assert_eq!(parsed[0]["lines"][1]["confidence"], 60.0);

        let html_options = OcrOptions {
            output_format: OcrOutputFormat::Html,
            ..OcrOptions::default()
        };
        let output = dir.path().join("out/scan.html");
        engine().perform_ocr_to_file(&path, &output, &html_options).unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("<p>second line</p>"));
    }
}
