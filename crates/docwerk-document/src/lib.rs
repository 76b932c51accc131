// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docwerk-document — Single-file operations of the Docwerk pipeline.
//
// Provides content-based format detection, validation, metadata extraction,
// text extraction, a registry-driven conversion engine, OCR over pluggable
// backends, and image optimisation. `DocumentPipeline` bundles them behind
// one configuration.

pub mod convert;
pub mod image;
pub mod integrity;
pub mod io;
pub mod metadata;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod sniff;
pub mod text;
pub mod validate;

// Re-export the primary entry points so callers can use `docwerk_document::DocumentPipeline` etc.
pub use convert::{ConversionEngine, ConversionInput, Converter, ConverterRegistry};
pub use image::optimize::ImageOptimizer;
pub use image::processor::ImageProcessor;
pub use metadata::extract_metadata;
pub use ocr::{OcrBackend, OcrEngine, OcrLine, OcrRequest};
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use pipeline::DocumentPipeline;
pub use sniff::{detect_format, detect_format_bytes};
pub use text::{extract_text, extract_text_bytes};
pub use validate::{ValidatedSource, validate_file, validate_source};

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;

    /// Build an in-memory ZIP archive from `(name, content)` pairs.
    pub fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Encode a solid-colour RGB PNG of the given size.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    /// Minimal DOCX with one paragraph per entry.
    pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
            .collect();
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#
        );
        zip_with(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", &document),
            (
                "docProps/app.xml",
                "<Properties><Pages>3</Pages></Properties>",
            ),
        ])
    }
}
