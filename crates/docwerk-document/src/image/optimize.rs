// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image optimizer — downscale to the tier's maximum edge and re-encode.

use std::path::Path;
use std::time::Instant;

use docwerk_core::error::{DocwerkError, Result};
use docwerk_core::{ConversionQuality, ConversionResult, PipelineConfig, SupportedFormat};
use tracing::{info, instrument, warn};

use super::processor::ImageProcessor;
use crate::convert::ConversionRecord;
use crate::io;
use crate::validate::{self, ValidatedSource};

/// Re-encodes images at a quality tier.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    max_file_size: u64,
}

impl ImageOptimizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
        }
    }

    /// Optimise `input` into `output`.
    ///
    /// The output format follows `output`'s extension when that names a
    /// raster format, otherwise the source format is kept. Decode and encode
    /// failures come back as `success = false`.
    #[instrument(skip_all, fields(path = %input.display(), quality = ?quality))]
    pub fn optimize_image(
        &self,
        input: &Path,
        output: &Path,
        quality: ConversionQuality,
    ) -> Result<ConversionResult> {
        let started = Instant::now();
        let (source, target) = self.prepare(input, output)?;
        let record = record(&source, target, output, quality, started);

        match optimize_bytes(&source.bytes, target, quality)
            .and_then(|bytes| write(output, bytes))
        {
            Ok(size) => Ok(record.succeeded(size)),
            Err(err) if err.is_request_error() => Err(err),
            Err(err) => {
                warn!(%err, "optimisation failed");
                Ok(record.failed(&err))
            }
        }
    }

    /// Raising variant of [`ImageOptimizer::optimize_image`].
    #[instrument(skip_all, fields(path = %input.display(), quality = ?quality))]
    pub fn try_optimize(
        &self,
        input: &Path,
        output: &Path,
        quality: ConversionQuality,
    ) -> Result<ConversionResult> {
        let started = Instant::now();
        let (source, target) = self.prepare(input, output)?;
        let size = write(output, optimize_bytes(&source.bytes, target, quality)?)?;
        Ok(record(&source, target, output, quality, started).succeeded(size))
    }

    fn prepare(&self, input: &Path, output: &Path) -> Result<(ValidatedSource, SupportedFormat)> {
        let source = validate::validate_source(input, None, self.max_file_size)?;
        if !source.format.is_image() {
            return Err(DocwerkError::UnsupportedOperation(format!(
                "{} is {}, not an image",
                input.display(),
                source.format
            )));
        }
        let target = io::extension_of(output)
            .and_then(|ext| SupportedFormat::from_extension(&ext))
            .filter(SupportedFormat::is_image)
            .unwrap_or(source.format);
        Ok((source, target))
    }
}

impl Default for ImageOptimizer {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

/// Downscale to the tier's maximum edge and encode as `target`.
pub fn optimize_bytes(
    bytes: &[u8],
    target: SupportedFormat,
    quality: ConversionQuality,
) -> Result<Vec<u8>> {
    let mut processor = ImageProcessor::from_bytes(bytes)?;
    if let Some(max_edge) = quality.max_dimension() {
        processor = processor.fit_within(max_edge);
    }
    let encoded = processor.encode(target, quality)?;
    info!(
        %target,
        width = processor.width(),
        height = processor.height(),
        original_size = bytes.len(),
        optimised_size = encoded.len(),
        "Image optimised"
    );
    Ok(encoded)
}

fn write(output: &Path, bytes: Vec<u8>) -> Result<u64> {
    io::write_output(output, &bytes)?;
    Ok(bytes.len() as u64)
}

fn record<'a>(
    source: &ValidatedSource,
    target: SupportedFormat,
    output: &'a Path,
    quality: ConversionQuality,
    started: Instant,
) -> ConversionRecord<'a> {
    ConversionRecord {
        output,
        source_format: source.format,
        target_format: target,
        original_size: source.size(),
        quality,
        started,
    }
}
