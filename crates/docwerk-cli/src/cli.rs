// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use docwerk_core::{
    Backoff, ConversionQuality, OcrLanguage, OcrOutputFormat, Priority, SupportedFormat,
};

#[derive(Debug, Parser)]
#[command(name = "docwerk", version)]
#[command(about = "Detect, inspect, convert, OCR and batch-process documents and images")]
pub struct Cli {
    /// JSON pipeline configuration; defaults apply to missing keys.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Identify a file's format from its content.
    Detect { path: PathBuf },
    /// Check that a file is readable, non-empty and of a supported format.
    Validate {
        path: PathBuf,
        /// Also require this format.
        #[arg(long)]
        expect: Option<SupportedFormat>,
    },
    /// Size, checksum, timestamps and format-specific properties.
    Metadata { path: PathBuf },
    /// Extract plain text.
    Text {
        path: PathBuf,
        /// Write the text here instead of embedding it in the output.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Target format; defaults to the output file's extension.
        #[arg(long, short)]
        to: Option<SupportedFormat>,
        #[arg(long, value_enum, default_value_t = QualityArg::Medium)]
        quality: QualityArg,
        #[arg(long)]
        preserve_formatting: bool,
    },
    Ocr {
        input: PathBuf,
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Recognition languages, in order of preference.
        #[arg(long = "lang", value_delimiter = ',', default_value = "eng")]
        languages: Vec<OcrLanguage>,
        /// Drop lines scored below this, 0-100.
        #[arg(long, default_value_t = 0)]
        confidence: u8,
        #[arg(long)]
        preserve_layout: bool,
        #[arg(long)]
        detect_orientation: bool,
        #[arg(long)]
        enhance: bool,
        #[arg(long, value_enum, default_value_t = OcrFormatArg::Text)]
        format: OcrFormatArg,
    },
    /// Downscale and re-encode an image.
    Optimize {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = QualityArg::Medium)]
        quality: QualityArg,
    },
    /// Run a JSON array of jobs.
    Batch {
        jobs: PathBuf,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long, value_enum, default_value_t = PriorityArg::Normal)]
        priority: PriorityArg,
        #[arg(long)]
        retries: Option<u32>,
        #[arg(long)]
        retry_delay_ms: Option<u64>,
        #[arg(long, value_enum, default_value_t = BackoffArg::Fixed)]
        backoff: BackoffArg,
    },
    /// Formats, conversions, OCR languages and limits.
    Capabilities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    Low,
    Medium,
    High,
}

impl From<QualityArg> for ConversionQuality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Low => Self::Low,
            QualityArg::Medium => Self::Medium,
            QualityArg::High => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OcrFormatArg {
    Text,
    Html,
    Json,
}

impl From<OcrFormatArg> for OcrOutputFormat {
    fn from(arg: OcrFormatArg) -> Self {
        match arg {
            OcrFormatArg::Text => Self::Text,
            OcrFormatArg::Html => Self::Html,
            OcrFormatArg::Json => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Normal,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Normal => Self::Normal,
            PriorityArg::High => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackoffArg {
    Fixed,
    Exponential,
}

impl From<BackoffArg> for Backoff {
    fn from(arg: BackoffArg) -> Self {
        match arg {
            BackoffArg::Fixed => Self::Fixed,
            BackoffArg::Exponential => Self::Exponential,
        }
    }
}
