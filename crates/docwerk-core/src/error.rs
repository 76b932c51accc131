// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Docwerk operations.
#[derive(Debug, Error)]
pub enum DocwerkError {
    // -- Request errors (raised straight back to the caller) --
    #[error("file not found or unreadable: {0}")]
    NotFound(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid request: {0}")]
    Validation(String),

    // -- Processing errors --
    #[error("transient processing failure: {0}")]
    TransientProcessing(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("processing engine unavailable: {0}")]
    EngineUnavailable(String),

    // -- Scheduler lifecycle --
    #[error("job cancelled: {0}")]
    Cancelled(String),

    #[error("pipeline has been shut down")]
    ShutDown,

    #[error("internal error: {0}")]
    Internal(String),

    // -- I/O --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serialisable error category reported in job outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    UnsupportedFormat,
    UnsupportedOperation,
    Validation,
    TransientProcessing,
    Processing,
    Cancelled,
    Internal,
}

impl DocwerkError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::UnsupportedOperation(_) | Self::EngineUnavailable(_) => {
                ErrorKind::UnsupportedOperation
            }
            Self::Validation(_) | Self::ShutDown => ErrorKind::Validation,
            Self::TransientProcessing(_) => ErrorKind::TransientProcessing,
            Self::PdfError(_)
            | Self::ImageError(_)
            | Self::OcrError(_)
            | Self::Malformed(_)
            | Self::Serialization(_) => ErrorKind::Processing,
            Self::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    ErrorKind::NotFound
                }
                _ => ErrorKind::TransientProcessing,
            },
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error describes a bad request rather than a failure while
    /// processing a valid one.
    ///
    /// Request errors are raised by the single-file operations; processing
    /// failures are folded into `success = false` results.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::UnsupportedFormat
                | ErrorKind::UnsupportedOperation
                | ErrorKind::Validation
        )
    }

    /// Map an I/O error for `path` onto the taxonomy: missing and unreadable
    /// sources become `NotFound`, everything else stays `Io`.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound
            | std::io::ErrorKind::PermissionDenied
            | std::io::ErrorKind::IsADirectory => {
                Self::NotFound(format!("{}: {}", path.display(), err))
            }
            _ => Self::Io(err),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocwerkError>;
