// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion engine — an explicit registry of (source, target) converters and
// the file-level operation that drives them.

mod converters;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use docwerk_core::error::{DocwerkError, Result};
use docwerk_core::{
    ConversionMetadata, ConversionOptions, ConversionQuality, ConversionResult, PipelineConfig,
    SupportedFormat,
};
use tracing::{debug, info, instrument, warn};

use crate::io;
use crate::validate::{self, ValidatedSource};

/// Everything a converter needs to produce its output bytes.
pub struct ConversionInput<'a> {
    pub bytes: &'a [u8],
    pub source: SupportedFormat,
    pub target: SupportedFormat,
    pub options: &'a ConversionOptions,
    /// Title for targets that carry one (HTML, PDF).
    pub title: &'a str,
}

/// Turns the content of one format into another.
pub trait Converter: Send + Sync {
    fn convert(&self, input: &ConversionInput<'_>) -> Result<Vec<u8>>;
}

impl<F> Converter for F
where
    F: Fn(&ConversionInput<'_>) -> Result<Vec<u8>> + Send + Sync,
{
    fn convert(&self, input: &ConversionInput<'_>) -> Result<Vec<u8>> {
        self(input)
    }
}

// -- Registry -----------------------------------------------------------------

/// Converters keyed by `(source, target)`.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: BTreeMap<(SupportedFormat, SupportedFormat), Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in conversion pairs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        converters::register_defaults(&mut registry);
        registry
    }

    /// Add or replace the converter for `source -> target`.
    pub fn register(
        &mut self,
        source: SupportedFormat,
        target: SupportedFormat,
        converter: impl Converter + 'static,
    ) {
        self.converters.insert((source, target), Arc::new(converter));
    }

    pub fn get(&self, source: SupportedFormat, target: SupportedFormat) -> Option<Arc<dyn Converter>> {
        self.converters.get(&(source, target)).cloned()
    }

    pub fn supports(&self, source: SupportedFormat, target: SupportedFormat) -> bool {
        self.converters.contains_key(&(source, target))
    }

    /// Every registered pair, sorted.
    pub fn pairs(&self) -> Vec<(SupportedFormat, SupportedFormat)> {
        self.converters.keys().copied().collect()
    }

    /// Registered pairs grouped by source format.
    pub fn targets_by_source(&self) -> BTreeMap<SupportedFormat, Vec<SupportedFormat>> {
        let mut grouped: BTreeMap<SupportedFormat, Vec<SupportedFormat>> = BTreeMap::new();
        for (source, target) in self.converters.keys() {
            grouped.entry(*source).or_default().push(*target);
        }
        grouped
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("pairs", &self.converters.len())
            .finish()
    }
}

// -- Result bookkeeping -------------------------------------------------------

/// What is known about a conversion before its converter runs.
pub(crate) struct ConversionRecord<'a> {
    pub output: &'a Path,
    pub source_format: SupportedFormat,
    pub target_format: SupportedFormat,
    pub original_size: u64,
    pub quality: ConversionQuality,
    pub started: Instant,
}

impl ConversionRecord<'_> {
    fn metadata(&self, converted_size: u64) -> ConversionMetadata {
        ConversionMetadata {
            original_size: self.original_size,
            converted_size,
            quality: self.quality,
            source_format: self.source_format,
            target_format: self.target_format,
            processing_time: self.started.elapsed(),
        }
    }

    pub fn succeeded(&self, converted_size: u64) -> ConversionResult {
        ConversionResult {
            success: true,
            output_path: self.output.to_path_buf(),
            metadata: self.metadata(converted_size),
            error: None,
        }
    }

    pub fn failed(&self, err: &DocwerkError) -> ConversionResult {
        ConversionResult {
            success: false,
            output_path: self.output.to_path_buf(),
            metadata: self.metadata(0),
            error: Some(err.to_string()),
        }
    }
}

// -- Engine -------------------------------------------------------------------

/// File-level conversion driven by a [`ConverterRegistry`].
#[derive(Debug, Clone)]
pub struct ConversionEngine {
    registry: Arc<ConverterRegistry>,
    config: PipelineConfig,
}

impl ConversionEngine {
    /// Engine with the default converters.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_registry(ConverterRegistry::with_defaults(), config)
    }

    pub fn with_registry(registry: ConverterRegistry, config: PipelineConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Convert `input` into `options.target_format`, writing `output`.
    ///
    /// Request errors (missing input, undetectable or mismatched format,
    /// unregistered pair) are returned as `Err`. Failures while converting
    /// valid input come back as `success = false` with the error message.
    #[instrument(skip_all, fields(path = %input.display(), target = %options.target_format))]
    pub fn convert_document(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionResult> {
        let started = Instant::now();
        let (source, converter) = self.prepare(input, options)?;
        let record = self.record(&source, output, options, started);

        match self.execute(&source, converter.as_ref(), output, options) {
            Ok(size) => Ok(record.succeeded(size)),
            Err(err) if err.is_request_error() => Err(err),
            Err(err) => {
                warn!(%err, "conversion failed");
                Ok(record.failed(&err))
            }
        }
    }

    /// Like [`ConversionEngine::convert_document`] but every failure is
    /// returned as `Err`, so callers can classify it.
    #[instrument(skip_all, fields(path = %input.display(), target = %options.target_format))]
    pub fn try_convert(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionResult> {
        let started = Instant::now();
        let (source, converter) = self.prepare(input, options)?;
        let size = self.execute(&source, converter.as_ref(), output, options)?;
        Ok(self.record(&source, output, options, started).succeeded(size))
    }

    /// Validate the input and look up its converter.
    fn prepare(
        &self,
        input: &Path,
        options: &ConversionOptions,
    ) -> Result<(ValidatedSource, Arc<dyn Converter>)> {
        let source = validate::validate_source(input, None, self.config.max_file_size)?;
        let converter = self
            .registry
            .get(source.format, options.target_format)
            .ok_or_else(|| {
                DocwerkError::UnsupportedOperation(format!(
                    "no converter from {} to {}",
                    source.format, options.target_format
                ))
            })?;
        Ok((source, converter))
    }

    /// Run the converter and write its output. Returns the output size.
    fn execute(
        &self,
        source: &ValidatedSource,
        converter: &dyn Converter,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<u64> {
        let title = io::title_of(&source.path);
        let input = ConversionInput {
            bytes: &source.bytes,
            source: source.format,
            target: options.target_format,
            options,
            title: &title,
        };

        let bytes = converter.convert(&input)?;
        io::write_output(output, &bytes)?;

        info!(
            source = %source.format,
            target = %options.target_format,
            original_size = source.size(),
            converted_size = bytes.len(),
            "Conversion complete"
        );
        Ok(bytes.len() as u64)
    }

    fn record<'a>(
        &self,
        source: &ValidatedSource,
        output: &'a Path,
        options: &ConversionOptions,
        started: Instant,
    ) -> ConversionRecord<'a> {
        debug!(quality = ?options.quality, "recording conversion");
        ConversionRecord {
            output,
            source_format: source.format,
            target_format: options.target_format,
            original_size: source.size(),
            quality: options.quality,
            started,
        }
    }
}
