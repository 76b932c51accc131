// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text extraction — one strategy per format, selected by detected format.

pub mod delimited;
pub mod html;
pub mod office;
pub mod rtf;
pub mod spreadsheet;

use std::path::Path;

use docwerk_core::SupportedFormat;
use docwerk_core::error::{DocwerkError, Result};
use tracing::{debug, instrument};

use crate::pdf::reader::PdfReader;
use crate::validate;

/// Extract readable text from the file at `path`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract_text(path: &Path) -> Result<String> {
    let source = validate::validate_source(path, None, u64::MAX)?;
    extract_text_bytes(&source.bytes, source.format)
}

/// Extract readable text from content already known to be `format`.
pub fn extract_text_bytes(bytes: &[u8], format: SupportedFormat) -> Result<String> {
    let text = match format {
        SupportedFormat::Txt => decode_plain(bytes),
        SupportedFormat::Html => html::html_to_text(&decode_plain(bytes)),
        SupportedFormat::Csv => delimited::render(bytes)?,
        SupportedFormat::Pdf => PdfReader::from_bytes(bytes)?.extract_text()?,
        SupportedFormat::Docx => office::docx_text(bytes)?,
        SupportedFormat::Pptx => office::pptx_text(bytes)?,
        SupportedFormat::Odt | SupportedFormat::Odp => office::odf_text(bytes)?,
        SupportedFormat::Xlsx | SupportedFormat::Xls | SupportedFormat::Ods => {
            spreadsheet::workbook_text(bytes, format)?
        }
        SupportedFormat::Rtf => rtf::rtf_to_text(bytes),
        SupportedFormat::Doc
        | SupportedFormat::Ppt
        | SupportedFormat::Png
        | SupportedFormat::Jpg
        | SupportedFormat::Jpeg
        | SupportedFormat::Tiff
        | SupportedFormat::Bmp
        | SupportedFormat::Webp => {
            return Err(DocwerkError::UnsupportedFormat(format!(
                "text extraction is not available for {format}"
            )));
        }
    };

    debug!(%format, chars = text.chars().count(), "text extracted");
    Ok(text)
}

/// Formats [`extract_text_bytes`] can handle.
pub fn text_formats() -> Vec<SupportedFormat> {
    SupportedFormat::ALL
        .into_iter()
        .filter(|f| {
            !f.is_image() && !matches!(f, SupportedFormat::Doc | SupportedFormat::Ppt)
        })
        .collect()
}

/// Lossy UTF-8 decode with any byte-order mark removed.
pub(crate) fn decode_plain(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
