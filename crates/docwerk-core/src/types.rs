// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docwerk file pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{DocwerkError, ErrorKind};

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// Every file format the pipeline recognises.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SupportedFormat {
    Txt,
    Html,
    Csv,
    Pdf,
    Doc,
    Docx,
    Rtf,
    Xlsx,
    Xls,
    Pptx,
    Ppt,
    Png,
    Jpg,
    Jpeg,
    Tiff,
    Bmp,
    Webp,
    Odt,
    Ods,
    Odp,
}

/// Coarse grouping reported as the `type` field of [`FileMetadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatCategory {
    Document,
    Image,
    Spreadsheet,
    Presentation,
}

impl SupportedFormat {
    pub const ALL: [SupportedFormat; 20] = [
        Self::Txt,
        Self::Html,
        Self::Csv,
        Self::Pdf,
        Self::Doc,
        Self::Docx,
        Self::Rtf,
        Self::Xlsx,
        Self::Xls,
        Self::Pptx,
        Self::Ppt,
        Self::Png,
        Self::Jpg,
        Self::Jpeg,
        Self::Tiff,
        Self::Bmp,
        Self::Webp,
        Self::Odt,
        Self::Ods,
        Self::Odp,
    ];

    /// Canonical lowercase name, also used as the file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Rtf => "rtf",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Pptx => "pptx",
            Self::Ppt => "ppt",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
            Self::Odt => "odt",
            Self::Ods => "ods",
            Self::Odp => "odp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Txt => "text/plain",
            Self::Html => "text/html",
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Rtf => "application/rtf",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Ppt => "application/vnd.ms-powerpoint",
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Webp => "image/webp",
            Self::Odt => "application/vnd.oasis.opendocument.text",
            Self::Ods => "application/vnd.oasis.opendocument.spreadsheet",
            Self::Odp => "application/vnd.oasis.opendocument.presentation",
        }
    }

    pub fn category(&self) -> FormatCategory {
        match self {
            Self::Png | Self::Jpg | Self::Jpeg | Self::Tiff | Self::Bmp | Self::Webp => {
                FormatCategory::Image
            }
            Self::Csv | Self::Xlsx | Self::Xls | Self::Ods => FormatCategory::Spreadsheet,
            Self::Pptx | Self::Ppt | Self::Odp => FormatCategory::Presentation,
            Self::Txt
            | Self::Html
            | Self::Pdf
            | Self::Doc
            | Self::Docx
            | Self::Rtf
            | Self::Odt => FormatCategory::Document,
        }
    }

    pub fn is_image(&self) -> bool {
        self.category() == FormatCategory::Image
    }

    /// Formats whose content is laid out in pages or slides.
    pub fn is_paginated(&self) -> bool {
        matches!(
            self,
            Self::Pdf
                | Self::Doc
                | Self::Docx
                | Self::Rtf
                | Self::Odt
                | Self::Pptx
                | Self::Ppt
                | Self::Odp
        )
    }

    /// `Jpg` and `Jpeg` name the same encoding; everything else is itself.
    pub fn canonical(&self) -> Self {
        match self {
            Self::Jpg => Self::Jpeg,
            other => *other,
        }
    }

    /// Format equality that treats JPG and JPEG as one format.
    pub fn same_as(&self, other: SupportedFormat) -> bool {
        self.canonical() == other.canonical()
    }

    /// Infer a format from a file extension, including common aliases.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "txt" | "text" | "log" => Some(Self::Txt),
            "html" | "htm" | "xhtml" => Some(Self::Html),
            "csv" | "tsv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "rtf" => Some(Self::Rtf),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpg),
            "jpeg" | "jpe" => Some(Self::Jpeg),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "webp" => Some(Self::Webp),
            "odt" => Some(Self::Odt),
            "ods" => Some(Self::Ods),
            "odp" => Some(Self::Odp),
            _ => None,
        }
    }
}

impl fmt::Display for SupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SupportedFormat {
    type Err = DocwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.extension() == lower)
            .ok_or_else(|| DocwerkError::Validation(format!("unknown format name: {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Descriptive metadata for one file. Built fresh on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_name: String,
    pub format: SupportedFormat,
    #[serde(rename = "type")]
    pub category: FormatCategory,
    pub mime_type: String,
    pub size: u64,
    /// Lowercase hex SHA-256 of the full content.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_count: Option<u32>,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Output quality tier for lossy encoders and the image optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl ConversionQuality {
    /// JPEG encoder quality (1-100).
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            Self::Low => 50,
            Self::Medium => 75,
            Self::High => 92,
        }
    }

    /// Longest edge the optimizer allows, `None` for unbounded.
    pub fn max_dimension(&self) -> Option<u32> {
        match self {
            Self::Low => Some(1024),
            Self::Medium => Some(2048),
            Self::High => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub target_format: SupportedFormat,
    #[serde(default)]
    pub quality: ConversionQuality,
    /// Keep line structure where the target allows it (TXT/CSV -> HTML).
    #[serde(default)]
    pub preserve_formatting: bool,
}

impl ConversionOptions {
    pub fn new(target_format: SupportedFormat) -> Self {
        Self {
            target_format,
            quality: ConversionQuality::default(),
            preserve_formatting: false,
        }
    }

    pub fn with_quality(mut self, quality: ConversionQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn preserving_formatting(mut self) -> Self {
        self.preserve_formatting = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionMetadata {
    pub original_size: u64,
    pub converted_size: u64,
    pub quality: ConversionQuality,
    pub source_format: SupportedFormat,
    pub target_format: SupportedFormat,
    #[serde(with = "elapsed_ms")]
    pub processing_time: Duration,
}

/// Outcome of a conversion or optimisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    pub output_path: PathBuf,
    pub metadata: ConversionMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// OCR
// ---------------------------------------------------------------------------

/// Recognition languages, serialised as ISO 639-2 codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrLanguage {
    Eng,
    Spa,
    Fra,
    Deu,
    Ita,
    Por,
    Nld,
    Rus,
    Ara,
    ChiSim,
    Jpn,
    Kor,
}

impl OcrLanguage {
    pub const ALL: [OcrLanguage; 12] = [
        Self::Eng,
        Self::Spa,
        Self::Fra,
        Self::Deu,
        Self::Ita,
        Self::Por,
        Self::Nld,
        Self::Rus,
        Self::Ara,
        Self::ChiSim,
        Self::Jpn,
        Self::Kor,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Eng => "eng",
            Self::Spa => "spa",
            Self::Fra => "fra",
            Self::Deu => "deu",
            Self::Ita => "ita",
            Self::Por => "por",
            Self::Nld => "nld",
            Self::Rus => "rus",
            Self::Ara => "ara",
            Self::ChiSim => "chi_sim",
            Self::Jpn => "jpn",
            Self::Kor => "kor",
        }
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OcrLanguage {
    type Err = DocwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.code() == lower)
            .ok_or_else(|| DocwerkError::Validation(format!("unknown OCR language: {s:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrOutputFormat {
    #[default]
    Text,
    Html,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrOptions {
    pub languages: Vec<OcrLanguage>,
    /// Minimum line confidence to keep, 0-100.
    pub confidence: u8,
    pub preserve_layout: bool,
    pub detect_orientation: bool,
    pub enhance_image: bool,
    pub output_format: OcrOutputFormat,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            languages: vec![OcrLanguage::Eng],
            confidence: 0,
            preserve_layout: false,
            detect_orientation: false,
            enhance_image: false,
            output_format: OcrOutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrMetadata {
    pub page_count: u32,
    /// Requested languages in request order, de-duplicated.
    pub detected_languages: Vec<OcrLanguage>,
    #[serde(with = "elapsed_ms")]
    pub processing_time: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub metadata: OcrMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// Identifier for one `process_batch` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling tier. Higher tiers are dispatched first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// What a batch job does, with the options for that operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchOperation {
    Convert(ConversionOptions),
    Extract,
    Ocr(OcrOptions),
    Optimize {
        #[serde(default)]
        quality: ConversionQuality,
    },
}

impl BatchOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Convert(_) => "convert",
            Self::Extract => "extract",
            Self::Ocr(_) => "ocr",
            Self::Optimize { .. } => "optimize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    /// Unique within its batch.
    pub id: String,
    pub input_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub operation: BatchOperation,
    /// Overrides the batch-wide priority for this job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl BatchJob {
    pub fn new(id: impl Into<String>, input_path: impl Into<PathBuf>, operation: BatchOperation) -> Self {
        Self {
            id: id.into(),
            input_path: input_path.into(),
            output_path: None,
            operation,
            priority: None,
        }
    }

    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// How the delay between retries grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Every retry waits `retry_delay`.
    #[default]
    Fixed,
    /// `retry_delay * 2^(attempt - 1)` with jitter, capped by `max_retry_delay`.
    Exponential,
}

/// Progress callback invoked with `(current, total)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Clone)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub priority: Priority,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub backoff: Backoff,
    pub on_progress: Option<ProgressCallback>,
}

impl BatchOptions {
    /// Options seeded from the pipeline defaults.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            concurrency: config.default_concurrency,
            priority: Priority::Normal,
            retry_attempts: config.default_retry_attempts,
            retry_delay: config.default_retry_delay,
            backoff: Backoff::Fixed,
            on_progress: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("concurrency", &self.concurrency)
            .field("priority", &self.priority)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("backoff", &self.backoff)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Terminal state of a job within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// I/O hiccup or timeout; safe to retry automatically.
    Transient,
    /// Retrying cannot help: bad input, unsupported pair, malformed content.
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Product of a successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobOutput {
    Conversion(ConversionResult),
    Text {
        chars: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_path: Option<PathBuf>,
    },
    Ocr(OcrResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    /// Attempts actually started (0 when cancelled before running).
    pub attempts: u32,
    #[serde(with = "elapsed_ms")]
    pub processing_time: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<JobOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Percentage of jobs that completed, 0-100.
    pub success_rate: f64,
    pub total_retries: u32,
    #[serde(with = "elapsed_ms")]
    pub average_job_time: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: BatchId,
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    /// One outcome per submitted job, in submission order.
    pub results: Vec<JobOutcome>,
    #[serde(with = "elapsed_ms")]
    pub processing_time: Duration,
    pub summary: BatchSummary,
}

impl BatchResult {
    /// Assemble a result from ordered outcomes, deriving counts and summary.
    pub fn from_outcomes(batch_id: BatchId, results: Vec<JobOutcome>, elapsed: Duration) -> Self {
        let total_jobs = results.len();
        let completed_jobs = results.iter().filter(|r| r.is_success()).count();
        let failed_jobs = total_jobs - completed_jobs;
        let total_retries = results
            .iter()
            .map(|r| r.attempts.saturating_sub(1))
            .sum();
        let success_rate = if total_jobs == 0 {
            0.0
        } else {
            completed_jobs as f64 * 100.0 / total_jobs as f64
        };
        let average_job_time = mean_duration(
            results.iter().map(|r| r.processing_time).sum(),
            total_jobs as u64,
        );

        Self {
            batch_id,
            total_jobs,
            completed_jobs,
            failed_jobs,
            results,
            processing_time: elapsed,
            summary: BatchSummary {
                success_rate,
                total_retries,
                average_job_time,
            },
        }
    }
}

/// `total / count`, or zero when nothing was counted.
pub fn mean_duration(total: Duration, count: u64) -> Duration {
    if count == 0 {
        Duration::ZERO
    } else {
        total.div_f64(count as f64)
    }
}

// ---------------------------------------------------------------------------
// Duration serialisation
// ---------------------------------------------------------------------------

/// Measured durations as fractional milliseconds.
pub mod elapsed_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}

/// Configured durations as whole milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_round_trip_case_insensitively() {
        assert_eq!("DOCX".parse::<SupportedFormat>().unwrap(), SupportedFormat::Docx);
        assert_eq!(" png ".parse::<SupportedFormat>().unwrap(), SupportedFormat::Png);
        let err = "mp3".parse::<SupportedFormat>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn format_serialises_lowercase() {
        let json = serde_json::to_string(&SupportedFormat::Xlsx).unwrap();
        assert_eq!(json, "\"xlsx\"");
    }

    #[test]
    fn jpg_and_jpeg_are_the_same_format() {
        assert!(SupportedFormat::Jpg.same_as(SupportedFormat::Jpeg));
        assert!(!SupportedFormat::Png.same_as(SupportedFormat::Jpeg));
        assert_eq!(SupportedFormat::Jpg.mime_type(), "image/jpeg");
    }

    #[test]
    fn extension_aliases() {
        assert_eq!(SupportedFormat::from_extension("TIF"), Some(SupportedFormat::Tiff));
        assert_eq!(SupportedFormat::from_extension(".htm"), Some(SupportedFormat::Html));
        assert_eq!(SupportedFormat::from_extension("exe"), None);
    }

    #[test]
    fn categories() {
        assert_eq!(SupportedFormat::Ods.category(), FormatCategory::Spreadsheet);
        assert_eq!(SupportedFormat::Odp.category(), FormatCategory::Presentation);
        assert!(SupportedFormat::Webp.is_image());
        assert!(SupportedFormat::Pdf.is_paginated());
        assert!(!SupportedFormat::Csv.is_paginated());
    }

    #[test]
    fn ocr_language_codes() {
        let json = serde_json::to_string(&OcrLanguage::ChiSim).unwrap();
        assert_eq!(json, "\"chi_sim\"");
        assert_eq!("FRA".parse::<OcrLanguage>().unwrap(), OcrLanguage::Fra);
    }

    #[test]
    fn priority_orders_high_first() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn batch_job_deserialises_tagged_operation() {
        let json = r#"{
            "id": "a",
            "input_path": "/tmp/in.png",
            "output_path": "/tmp/out.jpg",
            "operation": { "type": "convert", "target_format": "jpg", "quality": "high" }
        }"#;
        let job: BatchJob = serde_json::from_str(json).unwrap();
        assert_eq!(
            job.operation,
            BatchOperation::Convert(
                ConversionOptions::new(SupportedFormat::Jpg).with_quality(ConversionQuality::High)
            )
        );
        assert_eq!(job.priority, None);

        let json = r#"{ "id": "b", "input_path": "x.png", "operation": { "type": "optimize" } }"#;
        let job: BatchJob = serde_json::from_str(json).unwrap();
        assert_eq!(
            job.operation,
            BatchOperation::Optimize { quality: ConversionQuality::Medium }
        );
    }

    #[test]
    fn batch_result_accounting() {
        let ok = JobOutcome {
            job_id: "a".into(),
            status: JobStatus::Completed,
            attempts: 2,
            processing_time: Duration::from_millis(10),
            output: None,
            error: None,
        };
        let failed = JobOutcome {
            job_id: "b".into(),
            status: JobStatus::Failed,
            attempts: 1,
            processing_time: Duration::from_millis(30),
            output: None,
            error: None,
        };
        let result =
            BatchResult::from_outcomes(BatchId::new(), vec![ok, failed], Duration::from_millis(40));
        assert_eq!(result.total_jobs, 2);
        assert_eq!(result.completed_jobs + result.failed_jobs, result.total_jobs);
        assert_eq!(result.summary.success_rate, 50.0);
        assert_eq!(result.summary.total_retries, 1);
        assert_eq!(result.summary.average_job_time, Duration::from_millis(20));
    }

    #[test]
    fn mean_duration_handles_counts_beyond_u32() {
        assert_eq!(mean_duration(Duration::from_secs(9), 0), Duration::ZERO);
        assert_eq!(
            mean_duration(Duration::from_secs(1 << 33), 1 << 32),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn empty_batch_result_is_all_zero() {
        let result = BatchResult::from_outcomes(BatchId::new(), Vec::new(), Duration::ZERO);
        assert_eq!(result.total_jobs, 0);
        assert_eq!(result.summary.success_rate, 0.0);
        assert!(result.results.is_empty());
    }
}
