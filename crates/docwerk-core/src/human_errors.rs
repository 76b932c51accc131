// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language explanations for pipeline errors.
//
// Every technical error is mapped to a short message with a concrete
// suggestion. The suggestion is what batch outcomes report as `hint`.

use crate::error::DocwerkError;

/// Severity of an error from the caller's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Disk hiccup or timeout; retrying may succeed.
    Transient,
    /// The request itself must change (path, format, options).
    ActionRequired,
    /// The input cannot be processed as it stands.
    Permanent,
}

/// A human-readable error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What to try next.
    pub suggestion: String,
    /// Whether an automatic retry is worthwhile.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: impl Into<String>, retriable: bool, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable,
            severity,
        }
    }
}

/// Convert a `DocwerkError` into a `HumanError`.
pub fn humanize_error(err: &DocwerkError) -> HumanError {
    match err {
        // -- Request errors --
        DocwerkError::NotFound(_) => HumanError::new(
            "The file couldn't be found or read.",
            "Check the path exists and is readable, then submit it again.",
            false,
            Severity::ActionRequired,
        ),

        DocwerkError::UnsupportedFormat(detail) => HumanError::new(
            "This type of file isn't supported.",
            format!("Save the file as PDF, DOCX, PNG or plain text and try again. ({detail})"),
            false,
            Severity::Permanent,
        ),

        DocwerkError::UnsupportedOperation(detail) => HumanError::new(
            "That operation isn't available for this file.",
            format!("Check the capability report for supported conversions. ({detail})"),
            false,
            Severity::ActionRequired,
        ),

        DocwerkError::Validation(detail) => HumanError::new(
            "The request wasn't valid.",
            format!("Fix the request and resubmit it. ({detail})"),
            false,
            Severity::ActionRequired,
        ),

        // -- Processing errors --
        DocwerkError::TransientProcessing(detail) => humanize_transient(detail),

        DocwerkError::PdfError(_) => HumanError::new(
            "There's a problem with this PDF file.",
            "The file may be damaged or encrypted. Try re-saving it from the original application.",
            false,
            Severity::Permanent,
        ),

        DocwerkError::ImageError(_) => HumanError::new(
            "There's a problem with this image.",
            "The image may be damaged or truncated. Try re-exporting it as PNG or JPEG.",
            false,
            Severity::Permanent,
        ),

        DocwerkError::OcrError(_) => HumanError::new(
            "Text recognition didn't work on this image.",
            "Try a sharper scan, or enable image enhancement and orientation detection.",
            false,
            Severity::Permanent,
        ),

        DocwerkError::Malformed(_) => HumanError::new(
            "The file's contents don't match its format.",
            "The file may be corrupted. Try opening and re-saving it in its original application.",
            false,
            Severity::Permanent,
        ),

        DocwerkError::EngineUnavailable(detail) => HumanError::new(
            "The processing engine for this operation isn't installed.",
            format!("Install the required models or enable the matching build feature. ({detail})"),
            false,
            Severity::Permanent,
        ),

        // -- Scheduler lifecycle --
        DocwerkError::Cancelled(_) => HumanError::new(
            "The job was cancelled before it finished.",
            "Resubmit the job if it is still needed.",
            false,
            Severity::ActionRequired,
        ),

        DocwerkError::ShutDown => HumanError::new(
            "The processor has been shut down.",
            "Create a new processor before submitting more work.",
            false,
            Severity::ActionRequired,
        ),

        DocwerkError::Internal(_) => HumanError::new(
            "Something went wrong inside the pipeline.",
            "Try again. If this keeps happening, please report it.",
            true,
            Severity::Transient,
        ),

        // -- I/O --
        DocwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "A file couldn't be found.",
                "It may have been moved or deleted while processing. Check the input and output paths.",
                false,
                Severity::ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "Permission was denied while reading or writing a file.",
                "Check the permissions of the input file and the output directory.",
                false,
                Severity::ActionRequired,
            ),
            _ => HumanError::new(
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, the disk may be full.",
                true,
                Severity::Transient,
            ),
        },

        DocwerkError::Serialization(_) => HumanError::new(
            "A result couldn't be encoded.",
            "Try again. If this keeps happening, please report it.",
            false,
            Severity::Permanent,
        ),
    }
}

fn humanize_transient(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") {
        HumanError::new(
            "The operation took too long.",
            "Large files can exceed the time limit. Raise operation_timeout or split the file.",
            true,
            Severity::Transient,
        )
    } else {
        HumanError::new(
            "The operation failed temporarily.",
            format!("It will be retried automatically. (Detail: {detail})"),
            true,
            Severity::Transient,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_transient() {
        let err = DocwerkError::TransientProcessing("attempt timed out after 120s".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
        assert!(human.suggestion.contains("operation_timeout"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let human = humanize_error(&DocwerkError::NotFound("/tmp/x".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn unsupported_format_is_permanent() {
        let human = humanize_error(&DocwerkError::UnsupportedFormat("mp3".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.suggestion.contains("mp3"));
    }

    #[test]
    fn full_disk_is_retriable() {
        let io = std::io::Error::new(std::io::ErrorKind::StorageFull, "no space");
        let human = humanize_error(&DocwerkError::Io(io));
        assert!(human.retriable);
    }
}
