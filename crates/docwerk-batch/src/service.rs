// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FileProcessor — single entry point for callers.
//
// Wraps the document pipeline and the batch scheduler. Single-file
// operations are synchronous; `process_batch` is async. Clones share the
// scheduler's queues and stats.

use std::path::Path;
use std::time::Instant;

use docwerk_core::error::Result;
use docwerk_core::{
    BatchJob, BatchOptions, BatchResult, ConversionOptions, ConversionQuality, ConversionResult,
    FileMetadata, OcrOptions, OcrResult, PipelineConfig, SupportedFormat,
};
use docwerk_document::DocumentPipeline;
use tracing::info;

use crate::capabilities::{ProcessingCapabilities, processing_capabilities};
use crate::scheduler::BatchScheduler;
use crate::stats::ProcessingStats;

#[derive(Debug, Clone)]
pub struct FileProcessor {
    pipeline: DocumentPipeline,
    scheduler: BatchScheduler,
}

impl FileProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_pipeline(DocumentPipeline::new(config))
    }

    /// Build around a customised pipeline (registry, OCR backend).
    pub fn with_pipeline(pipeline: DocumentPipeline) -> Self {
        let scheduler = BatchScheduler::for_pipeline(pipeline.clone());
        info!(
            conversions = pipeline.registry().pairs().len(),
            ocr_backend = pipeline.ocr_backend().unwrap_or("none"),
            "file processor ready"
        );
        Self { pipeline, scheduler }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.pipeline
    }

    pub fn scheduler(&self) -> &BatchScheduler {
        &self.scheduler
    }

    // -- Single-file operations -----------------------------------------------
    //
    // Every call except `validate_file` is counted in `processing_stats`.

    pub fn detect_format(&self, path: &Path) -> Result<SupportedFormat> {
        self.counted(|| self.pipeline.detect_format(path), |_| true)
    }

    /// Never fails; problems come back as `false`. Not counted in stats.
    pub fn validate_file(&self, path: &Path, expected: Option<SupportedFormat>) -> bool {
        self.pipeline.validate_file(path, expected)
    }

    pub fn extract_text(&self, path: &Path) -> Result<String> {
        self.counted(|| self.pipeline.extract_text(path), |_| true)
    }

    pub fn extract_metadata(&self, path: &Path) -> Result<FileMetadata> {
        self.counted(|| self.pipeline.extract_metadata(path), |_| true)
    }

    pub fn convert_document(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionResult> {
        self.counted(
            || self.pipeline.convert_document(input, output, options),
            |result| result.success,
        )
    }

    pub fn perform_ocr(&self, input: &Path, options: &OcrOptions) -> Result<OcrResult> {
        self.counted(|| self.pipeline.perform_ocr(input, options), |result| result.success)
    }

    pub fn optimize_image(
        &self,
        input: &Path,
        output: &Path,
        quality: ConversionQuality,
    ) -> Result<ConversionResult> {
        self.counted(
            || self.pipeline.optimize_image(input, output, quality),
            |result| result.success,
        )
    }

    /// Run `operation` and record its outcome and duration. An `Err` is a
    /// failure; an `Ok` value is judged by `succeeded`.
    fn counted<T>(
        &self,
        operation: impl FnOnce() -> Result<T>,
        succeeded: impl FnOnce(&T) -> bool,
    ) -> Result<T> {
        let started = Instant::now();
        let result = operation();
        let success = result.as_ref().is_ok_and(succeeded);
        self.scheduler.record_operation(success, started.elapsed());
        result
    }

    // -- Batches --------------------------------------------------------------

    pub async fn process_batch(
        &self,
        jobs: Vec<BatchJob>,
        options: BatchOptions,
    ) -> Result<BatchResult> {
        self.scheduler.process_batch(jobs, options).await
    }

    /// Batch options seeded from this processor's configuration.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions::from_config(self.config())
    }

    // -- Reporting ------------------------------------------------------------

    pub fn processing_capabilities(&self) -> ProcessingCapabilities {
        processing_capabilities(&self.pipeline)
    }

    pub fn processing_stats(&self) -> ProcessingStats {
        self.scheduler.processing_stats()
    }

    pub fn reset_stats(&self) {
        self.scheduler.reset_stats();
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Cancel queued and running batch jobs. Returns how many were cancelled.
    pub fn clear_queue(&self) -> usize {
        self.scheduler.clear_queue()
    }

    /// Cancel outstanding work and stop accepting batches.
    pub fn cleanup(&self) {
        let cancelled = self.scheduler.shutdown();
        info!(cancelled, "file processor cleaned up");
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
