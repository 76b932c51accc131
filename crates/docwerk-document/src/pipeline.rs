// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DocumentPipeline — every single-file operation behind one configuration.

use std::path::Path;

use docwerk_core::error::Result;
use docwerk_core::{
    ConversionOptions, ConversionQuality, ConversionResult, FileMetadata, OcrOptions, OcrResult,
    PipelineConfig, SupportedFormat,
};
use tracing::{info, instrument};

use crate::convert::{ConversionEngine, ConverterRegistry};
use crate::image::optimize::ImageOptimizer;
use crate::ocr::{OcrBackend, OcrEngine};
use crate::{io, metadata, sniff, text, validate};

/// Shared, cheaply cloneable handle to the single-file operations.
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    config: PipelineConfig,
    converter: ConversionEngine,
    ocr: OcrEngine,
    optimizer: ImageOptimizer,
}

impl DocumentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            converter: ConversionEngine::new(config.clone()),
            ocr: OcrEngine::new(&config),
            optimizer: ImageOptimizer::new(&config),
            config,
        }
    }

    /// Replace the converter registry.
    pub fn with_registry(mut self, registry: ConverterRegistry) -> Self {
        self.converter = ConversionEngine::with_registry(registry, self.config.clone());
        self
    }

    /// Replace the image OCR backend.
    pub fn with_ocr_backend(mut self, backend: impl OcrBackend + 'static) -> Self {
        self.ocr = self.ocr.with_backend(backend);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConverterRegistry {
        self.converter.registry()
    }

    pub fn ocr_backend(&self) -> Option<&str> {
        self.ocr.backend_name()
    }

    // -- Inspection -----------------------------------------------------------

    pub fn detect_format(&self, path: &Path) -> Result<SupportedFormat> {
        sniff::detect_format(path)
    }

    pub fn validate_file(&self, path: &Path, expected: Option<SupportedFormat>) -> bool {
        validate::validate_file(path, expected)
    }

    pub fn extract_metadata(&self, path: &Path) -> Result<FileMetadata> {
        metadata::extract_metadata(path)
    }

    /// Extract text, honouring the configured size limit.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn extract_text(&self, path: &Path) -> Result<String> {
        let source = validate::validate_source(path, None, self.config.max_file_size)?;
        text::extract_text_bytes(&source.bytes, source.format)
    }

    /// Extract text and write it to `output`. Returns the character count.
    pub fn extract_text_to_file(&self, path: &Path, output: &Path) -> Result<usize> {
        let text = self.extract_text(path)?;
        io::write_output(output, text.as_bytes())?;
        info!(output = %output.display(), "extracted text written");
        Ok(text.chars().count())
    }

    // -- Conversion -----------------------------------------------------------

    pub fn convert_document(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionResult> {
        self.converter.convert_document(input, output, options)
    }

    pub fn try_convert(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionResult> {
        self.converter.try_convert(input, output, options)
    }

    // -- OCR ------------------------------------------------------------------

    pub fn perform_ocr(&self, input: &Path, options: &OcrOptions) -> Result<OcrResult> {
        self.ocr.perform_ocr(input, options)
    }

    pub fn try_ocr(&self, input: &Path, options: &OcrOptions) -> Result<OcrResult> {
        self.ocr.try_ocr(input, options)
    }

    pub fn perform_ocr_to_file(
        &self,
        input: &Path,
        output: &Path,
        options: &OcrOptions,
    ) -> Result<OcrResult> {
        self.ocr.perform_ocr_to_file(input, output, options)
    }

    pub fn try_ocr_to_file(
        &self,
        input: &Path,
        output: &Path,
        options: &OcrOptions,
    ) -> Result<OcrResult> {
        self.ocr.try_ocr_to_file(input, output, options)
    }

    // -- Optimisation ---------------------------------------------------------

    pub fn optimize_image(
        &self,
        input: &Path,
        output: &Path,
        quality: ConversionQuality,
    ) -> Result<ConversionResult> {
        self.optimizer.optimize_image(input, output, quality)
    }

    pub fn try_optimize(
        &self,
        input: &Path,
        output: &Path,
        quality: ConversionQuality,
    ) -> Result<ConversionResult> {
        self.optimizer.try_optimize(input, output, quality)
    }
}

impl Default for DocumentPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
