// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata extractor — size, checksum, timestamps, and per-format facts
// (image dimensions, page and sheet counts).

use std::io::Cursor;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use docwerk_core::error::{DocwerkError, Result};
use docwerk_core::{FileMetadata, FormatCategory, SupportedFormat};
use tracing::{debug, instrument, warn};

use crate::integrity::hash_bytes;
use crate::io;
use crate::pdf::reader::PdfReader;
use crate::sniff;
use crate::text::{office, spreadsheet};

/// Describe the file at `path`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract_metadata(path: &Path) -> Result<FileMetadata> {
    let bytes = io::read_source(path, u64::MAX)?;
    describe(path, &bytes)
}

/// Build metadata for `path` whose content has already been read.
pub fn describe(path: &Path, bytes: &[u8]) -> Result<FileMetadata> {
    let file_name = io::file_name_of(path);
    let format = sniff::detect_format_bytes(bytes, Some(&file_name))?;
    let fs_meta = std::fs::metadata(path).map_err(|e| DocwerkError::from_io(path, e))?;

    let modified_at = fs_meta.modified().map(to_utc).unwrap_or_else(|_| epoch());
    let created_at = fs_meta.created().map(to_utc).unwrap_or(modified_at);

    let mut metadata = FileMetadata {
        file_name,
        format,
        category: format.category(),
        mime_type: format.mime_type().to_string(),
        size: bytes.len() as u64,
        checksum: hash_bytes(bytes),
        created_at,
        modified_at,
        width: None,
        height: None,
        page_count: None,
        sheet_count: None,
    };

    match format.category() {
        FormatCategory::Image => {
            if let Some((width, height)) = image_dimensions(bytes, format) {
                metadata.width = Some(width);
                metadata.height = Some(height);
            }
        }
        FormatCategory::Spreadsheet => {
            metadata.sheet_count = Some(sheet_count(bytes, format));
        }
        FormatCategory::Document | FormatCategory::Presentation => {}
    }
    if format.is_paginated() {
        metadata.page_count = Some(page_count(bytes, format));
    }

    debug!(
        %format,
        size = metadata.size,
        page_count = ?metadata.page_count,
        "metadata extracted"
    );
    Ok(metadata)
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Width and height read from the image header.
fn image_dimensions(bytes: &[u8], format: SupportedFormat) -> Option<(u32, u32)> {
    if format == SupportedFormat::Png
        && let Some(dims) = png_ihdr_dimensions(bytes)
    {
        return Some(dims);
    }

    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok(dims) => Some(dims),
        Err(err) => {
            warn!(%format, %err, "could not read image header");
            None
        }
    }
}

/// The IHDR chunk always follows the 8-byte signature: length (4), type (4),
/// then big-endian width and height.
fn png_ihdr_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    Some((width, height))
}

// ---------------------------------------------------------------------------
// Pages and sheets
// ---------------------------------------------------------------------------

/// Page (or slide) count, falling back to 1 when the format does not
/// record one.
fn page_count(bytes: &[u8], format: SupportedFormat) -> u32 {
    let counted = match format {
        SupportedFormat::Pdf => PdfReader::from_bytes(bytes)
            .map(|reader| reader.page_count() as u32)
            .ok(),
        SupportedFormat::Docx => office::docx_page_count(bytes),
        SupportedFormat::Pptx => office::pptx_slide_count(bytes),
        SupportedFormat::Odt | SupportedFormat::Odp => office::odf_page_count(bytes),
        _ => None,
    };
    counted.filter(|&n| n > 0).unwrap_or(1)
}

fn sheet_count(bytes: &[u8], format: SupportedFormat) -> u32 {
    if format == SupportedFormat::Csv {
        return 1;
    }
    match spreadsheet::sheet_count(bytes, format) {
        Ok(count) => count as u32,
        Err(err) => {
            warn!(%format, %err, "could not count sheets");
            1
        }
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(SystemTime::UNIX_EPOCH)
}
