// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format sniffer — content signatures first, file extension second.
//
// Container formats are opened just far enough to tell their members apart:
// ZIP archives by their well-known entries, OLE2 compound files by the
// UTF-16LE names of their streams. Detection never writes.

use std::io::{Cursor, Read};
use std::path::Path;

use docwerk_core::SupportedFormat;
use docwerk_core::error::{DocwerkError, Result};
use tracing::{debug, instrument};

const PDF_MAGIC: &[u8] = b"%PDF-";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const RTF_MAGIC: &[u8] = b"{\\rtf";

/// `%PDF-` may be preceded by junk, but only this far in.
const PDF_SEARCH_WINDOW: usize = 1024;
/// Prefix inspected for NUL bytes when deciding whether content is text.
const TEXT_PROBE_LEN: usize = 8 * 1024;
/// Valid BITMAPINFOHEADER family sizes.
const DIB_HEADER_SIZES: [u32; 7] = [12, 40, 52, 56, 64, 108, 124];

/// Detect the format of the file at `path`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn detect_format(path: &Path) -> Result<SupportedFormat> {
    if path.is_dir() {
        return Err(DocwerkError::NotFound(format!("{} is a directory", path.display())));
    }
    let bytes = std::fs::read(path).map_err(|e| DocwerkError::from_io(path, e))?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    let format = detect_format_bytes(&bytes, file_name)?;
    debug!(%format, "format detected");
    Ok(format)
}

/// Detect the format of in-memory content. `file_name` only supplies the
/// extension used to disambiguate text and container families.
pub fn detect_format_bytes(bytes: &[u8], file_name: Option<&str>) -> Result<SupportedFormat> {
    let ext = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let ext = ext.as_deref();

    if let Some(format) = sniff_signature(bytes, ext) {
        return Ok(format);
    }
    if bytes.starts_with(ZIP_MAGIC) {
        return sniff_zip(bytes, ext);
    }
    if bytes.starts_with(OLE2_MAGIC) {
        return sniff_ole2(bytes, ext);
    }
    if looks_textual(bytes) {
        return sniff_text(bytes, ext);
    }

    Err(DocwerkError::UnsupportedFormat(describe(file_name, "binary content with no known signature")))
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

fn sniff_signature(bytes: &[u8], ext: Option<&str>) -> Option<SupportedFormat> {
    let window = &bytes[..bytes.len().min(PDF_SEARCH_WINDOW)];
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Some(SupportedFormat::Pdf);
    }
    if bytes.starts_with(PNG_MAGIC) {
        return Some(SupportedFormat::Png);
    }
    if bytes.starts_with(JPEG_MAGIC) {
        return Some(if ext == Some("jpg") {
            SupportedFormat::Jpg
        } else {
            SupportedFormat::Jpeg
        });
    }
    if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        return Some(SupportedFormat::Tiff);
    }
    if is_bmp(bytes) {
        return Some(SupportedFormat::Bmp);
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(SupportedFormat::Webp);
    }
    if bytes.starts_with(RTF_MAGIC) {
        return Some(SupportedFormat::Rtf);
    }
    None
}

fn is_bmp(bytes: &[u8]) -> bool {
    if bytes.len() < 18 || !bytes.starts_with(b"BM") {
        return false;
    }
    let dib_size = u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]);
    DIB_HEADER_SIZES.contains(&dib_size)
}

// ---------------------------------------------------------------------------
// ZIP family (OOXML, ODF)
// ---------------------------------------------------------------------------

fn sniff_zip(bytes: &[u8], ext: Option<&str>) -> Result<SupportedFormat> {
    let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
        debug!("unreadable ZIP container, falling back to extension");
        return zip_family_extension(ext);
    };

    if let Ok(mut entry) = archive.by_name("mimetype") {
        let mut mimetype = String::new();
        if entry.read_to_string(&mut mimetype).is_ok() {
            match mimetype.trim() {
                "application/vnd.oasis.opendocument.text" => return Ok(SupportedFormat::Odt),
                "application/vnd.oasis.opendocument.spreadsheet" => {
                    return Ok(SupportedFormat::Ods);
                }
                "application/vnd.oasis.opendocument.presentation" => {
                    return Ok(SupportedFormat::Odp);
                }
                _ => {}
            }
        }
    }

    let has = |name: &str| archive.file_names().any(|n| n == name);
    if has("word/document.xml") {
        return Ok(SupportedFormat::Docx);
    }
    if has("xl/workbook.xml") {
        return Ok(SupportedFormat::Xlsx);
    }
    if has("ppt/presentation.xml") {
        return Ok(SupportedFormat::Pptx);
    }

    zip_family_extension(ext)
}

fn zip_family_extension(ext: Option<&str>) -> Result<SupportedFormat> {
    match ext.and_then(SupportedFormat::from_extension) {
        Some(
            f @ (SupportedFormat::Docx
            | SupportedFormat::Xlsx
            | SupportedFormat::Pptx
            | SupportedFormat::Odt
            | SupportedFormat::Ods
            | SupportedFormat::Odp),
        ) => Ok(f),
        _ => Err(DocwerkError::UnsupportedFormat(format!(
            "ZIP archive is not an office document (extension: {})",
            ext.unwrap_or("none")
        ))),
    }
}

// ---------------------------------------------------------------------------
// OLE2 compound files (legacy Office)
// ---------------------------------------------------------------------------

fn sniff_ole2(bytes: &[u8], ext: Option<&str>) -> Result<SupportedFormat> {
    if contains_utf16le(bytes, "WordDocument") {
        return Ok(SupportedFormat::Doc);
    }
    if contains_utf16le(bytes, "PowerPoint Document") {
        return Ok(SupportedFormat::Ppt);
    }
    if contains_utf16le(bytes, "Workbook") || contains_utf16le(bytes, "Book") {
        return Ok(SupportedFormat::Xls);
    }

    match ext.and_then(SupportedFormat::from_extension) {
        Some(f @ (SupportedFormat::Doc | SupportedFormat::Xls | SupportedFormat::Ppt)) => Ok(f),
        _ => Err(DocwerkError::UnsupportedFormat(format!(
            "compound file with no recognised Office stream (extension: {})",
            ext.unwrap_or("none")
        ))),
    }
}

fn contains_utf16le(haystack: &[u8], needle: &str) -> bool {
    let encoded: Vec<u8> = needle.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    haystack.windows(encoded.len()).any(|w| w == encoded.as_slice())
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

fn looks_textual(bytes: &[u8]) -> bool {
    !bytes[..bytes.len().min(TEXT_PROBE_LEN)].contains(&0)
}

fn sniff_text(bytes: &[u8], ext: Option<&str>) -> Result<SupportedFormat> {
    match ext {
        Some("txt" | "text" | "log") => Ok(SupportedFormat::Txt),
        Some("html" | "htm" | "xhtml") => Ok(SupportedFormat::Html),
        Some("csv" | "tsv") => Ok(SupportedFormat::Csv),
        None => {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(TEXT_PROBE_LEN)])
                .to_ascii_lowercase();
            if head.contains("<!doctype html") || head.contains("<html") {
                Ok(SupportedFormat::Html)
            } else {
                Ok(SupportedFormat::Txt)
            }
        }
        Some(other) => Err(DocwerkError::UnsupportedFormat(format!(
            "text content with unsupported extension .{other}"
        ))),
    }
}

fn describe(file_name: Option<&str>, reason: &str) -> String {
    match file_name {
        Some(name) => format!("{name}: {reason}"),
        None => reason.to_string(),
    }
}
