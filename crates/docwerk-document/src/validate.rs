// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validator — existence, emptiness, size, and format checks.

use std::path::{Path, PathBuf};

use docwerk_core::SupportedFormat;
use docwerk_core::error::{DocwerkError, Result};
use tracing::{debug, instrument};

use crate::io;
use crate::sniff;

/// A source file that passed validation, with its content already loaded.
#[derive(Debug, Clone)]
pub struct ValidatedSource {
    pub path: PathBuf,
    pub format: SupportedFormat,
    pub bytes: Vec<u8>,
}

impl ValidatedSource {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// `true` when `path` exists, is non-empty, has a detectable format, and
/// (if given) matches `expected`. Never fails.
#[instrument(skip_all, fields(path = %path.display(), expected = ?expected))]
pub fn validate_file(path: &Path, expected: Option<SupportedFormat>) -> bool {
    match validate_source(path, expected, u64::MAX) {
        Ok(_) => true,
        Err(err) => {
            debug!(%err, "validation failed");
            false
        }
    }
}

/// Raising variant of [`validate_file`] used by operations that go on to
/// process the content.
pub fn validate_source(
    path: &Path,
    expected: Option<SupportedFormat>,
    max_file_size: u64,
) -> Result<ValidatedSource> {
    let bytes = io::read_source(path, max_file_size)?;
    if bytes.is_empty() {
        return Err(DocwerkError::Validation(format!(
            "{} is empty",
            path.display()
        )));
    }

    let file_name = path.file_name().and_then(|n| n.to_str());
    let format = sniff::detect_format_bytes(&bytes, file_name)?;

    if let Some(expected) = expected
        && !format.same_as(expected)
    {
        return Err(DocwerkError::Validation(format!(
            "{} is {format}, expected {expected}",
            path.display()
        )));
    }

    Ok(ValidatedSource {
        path: path.to_path_buf(),
        format,
        bytes,
    })
}
