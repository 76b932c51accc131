// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in converters.

use docwerk_core::SupportedFormat;
use docwerk_core::SupportedFormat::*;
use docwerk_core::error::{DocwerkError, Result};

use super::{ConversionInput, ConverterRegistry};
use crate::image::processor::ImageProcessor;
use crate::pdf::reader::PdfReader;
use crate::pdf::writer::PdfWriter;
use crate::text::{self, delimited, html, spreadsheet};

const RASTER: [SupportedFormat; 6] = [Png, Jpg, Jpeg, Tiff, Bmp, Webp];
const WORKBOOKS: [SupportedFormat; 3] = [Xlsx, Xls, Ods];
const WORD_PROCESSING: [SupportedFormat; 5] = [Docx, Odt, Rtf, Pptx, Odp];

pub(super) fn register_defaults(registry: &mut ConverterRegistry) {
    registry.register(Txt, Html, plain_to_html);
    registry.register(Txt, Pdf, to_pdf);
    registry.register(Html, Txt, to_txt);
    registry.register(Html, Pdf, to_pdf);
    registry.register(Csv, Txt, to_txt);
    registry.register(Csv, Html, csv_to_html);
    registry.register(Csv, Pdf, to_pdf);
    registry.register(Pdf, Txt, to_txt);
    registry.register(Pdf, Html, pdf_to_html);

    for source in WORD_PROCESSING {
        registry.register(source, Txt, to_txt);
        registry.register(source, Html, lines_to_html);
        registry.register(source, Pdf, to_pdf);
    }

    for source in WORKBOOKS {
        registry.register(source, Csv, workbook_to_csv);
        registry.register(source, Txt, to_txt);
        registry.register(source, Html, workbook_to_html);
    }

    for source in RASTER {
        for target in RASTER {
            if source != target {
                registry.register(source, target, transcode_image);
            }
        }
        registry.register(source, Pdf, image_to_pdf);
    }
}

// -- Text targets -------------------------------------------------------------

fn to_txt(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let mut text = text::extract_text_bytes(input.bytes, input.source)?;
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text.into_bytes())
}

fn to_pdf(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let text = text::extract_text_bytes(input.bytes, input.source)?;
    PdfWriter::new().with_title(input.title).create_from_text(&text)
}

// -- HTML targets -------------------------------------------------------------

fn plain_to_html(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let text = text::decode_plain(input.bytes);
    Ok(html::text_to_html(input.title, &text, input.options.preserve_formatting).into_bytes())
}

fn lines_to_html(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let text = text::extract_text_bytes(input.bytes, input.source)?;
    Ok(html::lines_to_html(input.title, &text).into_bytes())
}

fn pdf_to_html(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let reader = PdfReader::from_bytes(input.bytes)?;
    let mut body = String::new();
    for (index, page) in reader.page_texts().iter().enumerate() {
        body.push_str(&format!("<section class=\"page\" id=\"page-{}\">\n", index + 1));
        for line in page.lines().map(str::trim).filter(|l| !l.is_empty()) {
            body.push_str(&format!("<p>{}</p>\n", html::escape(line)));
        }
        body.push_str("</section>\n");
    }
    Ok(html::document(input.title, &body).into_bytes())
}

fn csv_to_html(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let rows = delimited::parse_rows(input.bytes)?;
    let body = table(&rows, input.options.preserve_formatting);
    Ok(html::document(input.title, &body).into_bytes())
}

fn workbook_to_html(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let sheets = spreadsheet::read_sheets(input.bytes, input.source)?;
    let mut body = String::new();
    for sheet in &sheets {
        body.push_str(&format!("<h2>{}</h2>\n", html::escape(&sheet.name)));
        body.push_str(&table(&sheet.rows, false));
    }
    Ok(html::document(input.title, &body).into_bytes())
}

/// An HTML table. With `preserve` cell text keeps its whitespace and line
/// breaks; otherwise it is trimmed and collapsed.
fn table(rows: &[Vec<String>], preserve: bool) -> String {
    let mut out = String::from("<table>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            let content = if preserve {
                html::escape(cell).replace('\n', "<br>")
            } else {
                html::escape(&cell.split_whitespace().collect::<Vec<_>>().join(" "))
            };
            out.push_str("<td>");
            out.push_str(&content);
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    out
}

// -- CSV target ---------------------------------------------------------------

/// First worksheet as comma-separated values.
fn workbook_to_csv(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let sheets = spreadsheet::read_sheets(input.bytes, input.source)?;
    let first = sheets
        .first()
        .ok_or_else(|| DocwerkError::Malformed("workbook has no readable sheets".into()))?;
    delimited::rows_to_csv(&first.rows)
}

// -- Image targets ------------------------------------------------------------

fn transcode_image(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    ImageProcessor::from_bytes(input.bytes)?.encode(input.target, input.options.quality)
}

fn image_to_pdf(input: &ConversionInput<'_>) -> Result<Vec<u8>> {
    let image = ImageProcessor::from_bytes(input.bytes)?.into_dynamic();
    PdfWriter::new().with_title(input.title).create_from_dynamic(&image)
}
