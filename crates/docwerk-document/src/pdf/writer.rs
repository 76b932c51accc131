// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — renders converted text and raster images as A4 PDFs with
// `printpdf` 0.8.
//
// printpdf builds pages from `Op` lists and serialises the whole document in
// one `save` call.

use docwerk_core::error::{DocwerkError, Result};
use image::DynamicImage;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, instrument};

// A4.
const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);

const TEXT_MARGIN: Mm = Mm(20.0);
const FONT_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 14.0;
/// Mean Helvetica advance as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f32 = 0.5;

const IMAGE_MARGIN: Mm = Mm(15.0);
const IMAGE_DPI: f32 = 150.0;

/// Produces the PDF output of conversions.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    /// Written to the document info dictionary.
    title: Option<String>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Lay `text` out in Helvetica, wrapping long lines and breaking pages as
    /// needed. Empty text gives one blank page.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn create_from_text(&self, text: &str) -> Result<Vec<u8>> {
        let margin = TEXT_MARGIN.into_pt().0;
        let top = PAGE_HEIGHT.into_pt().0 - margin;
        let usable_width = PAGE_WIDTH.into_pt().0 - 2.0 * margin;
        let usable_height = top - margin;

        let chars_per_line = ((usable_width / (GLYPH_WIDTH_RATIO * FONT_SIZE)) as usize).max(1);
        let lines_per_page = ((usable_height / LINE_HEIGHT) as usize).max(1);
        let lines = wrap_text(text, chars_per_line);

        let mut pages: Vec<PdfPage> = lines
            .chunks(lines_per_page)
            .map(|chunk| {
                let mut ops = Vec::new();
                for (row, line) in chunk.iter().enumerate() {
                    if !line.is_empty() {
                        push_text_line(&mut ops, line, margin, top - row as f32 * LINE_HEIGHT);
                    }
                }
                PdfPage::new(PAGE_WIDTH, PAGE_HEIGHT, ops)
            })
            .collect();
        if pages.is_empty() {
            pages.push(PdfPage::new(PAGE_WIDTH, PAGE_HEIGHT, Vec::new()));
        }

        debug!(lines = lines.len(), pages = pages.len(), "text laid out");
        let mut doc = self.document("Docwerk Document");
        doc.with_pages(pages);
        Ok(save(&doc))
    }

    /// One page holding `image`, centred inside the margins. Images larger
    /// than the page at 150 DPI are scaled down; smaller ones keep their size.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn create_from_dynamic(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if width == 0 || height == 0 {
            return Err(DocwerkError::ImageError("image has no pixels".into()));
        }

        let mut doc = self.document("Docwerk Image");
        let xobject = doc.add_image(&RawImage {
            pixels: RawImageData::U8(image.to_rgb8().into_raw()),
            width,
            height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        });

        let margin = IMAGE_MARGIN.into_pt().0;
        let box_width = PAGE_WIDTH.into_pt().0 - 2.0 * margin;
        let box_height = PAGE_HEIGHT.into_pt().0 - 2.0 * margin;
        let natural_width = width as f32 / IMAGE_DPI * 72.0;
        let natural_height = height as f32 / IMAGE_DPI * 72.0;
        let scale = (box_width / natural_width)
            .min(box_height / natural_height)
            .min(1.0);

        let place = Op::UseXobject {
            id: xobject,
            transform: XObjectTransform {
                translate_x: Some(Pt(margin + (box_width - natural_width * scale) / 2.0)),
                translate_y: Some(Pt(margin + (box_height - natural_height * scale) / 2.0)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                rotate: None,
            },
        };
        doc.with_pages(vec![PdfPage::new(PAGE_WIDTH, PAGE_HEIGHT, vec![place])]);

        debug!(scale, "image placed");
        Ok(save(&doc))
    }

    fn document(&self, fallback_title: &str) -> PdfDocument {
        PdfDocument::new(self.title.as_deref().unwrap_or(fallback_title))
    }
}

fn push_text_line(ops: &mut Vec<Op>, line: &str, x: f32, y: f32) {
    ops.extend([
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point { x: Pt(x), y: Pt(y) },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(FONT_SIZE),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(line.to_string())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]);
}

fn save(doc: &PdfDocument) -> Vec<u8> {
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    doc.save(&PdfSaveOptions::default(), &mut warnings)
}

/// Split on newlines, then word-wrap each paragraph to `width` characters.
/// Words longer than `width` are broken on character boundaries. Trailing
/// blank lines are dropped so they never add an empty page.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;
        let mut any_word = false;

        for word in paragraph.split_whitespace() {
            any_word = true;
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(width) {
                let needed = if current_len == 0 { piece.len() } else { current_len + 1 + piece.len() };
                if current_len > 0 && needed > width {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.extend(piece);
                current_len += piece.len();
            }
        }

        if any_word {
            lines.push(current);
        } else {
            lines.push(String::new());
        }
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}
