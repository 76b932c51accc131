// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end checks of the single-file operations through DocumentPipeline.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use docwerk_core::{ConversionOptions, DocwerkError, OcrOptions, SupportedFormat};
use docwerk_document::{DocumentPipeline, PdfReader};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([10, 120, 200]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn one_pixel_png_is_detected_with_dimensions() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "dot.png", &png(1, 1));
    let pipeline = DocumentPipeline::default();

    assert_eq!(pipeline.detect_format(&input).unwrap(), SupportedFormat::Png);
    let meta = pipeline.extract_metadata(&input).unwrap();
    assert_eq!((meta.width, meta.height), (Some(1), Some(1)));
}

#[test]
fn png_round_trips_through_jpeg() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "dot.png", &png(1, 1));
    let pipeline = DocumentPipeline::default();

    let jpeg = dir.path().join("dot.jpeg");
    let result = pipeline
        .convert_document(&input, &jpeg, &ConversionOptions::new(SupportedFormat::Jpeg))
        .unwrap();
    assert!(result.success);

    let back = dir.path().join("back.png");
    let result = pipeline
        .convert_document(&jpeg, &back, &ConversionOptions::new(SupportedFormat::Png))
        .unwrap();
    assert!(result.success);

    let meta = pipeline.extract_metadata(&back).unwrap();
    assert_eq!(meta.format, SupportedFormat::Png);
    assert_eq!((meta.width, meta.height), (Some(1), Some(1)));
}

#[test]
fn optimizing_one_pixel_png_keeps_png() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "dot.png", &png(1, 1));
    let output = dir.path().join("dot-small.png");
    let pipeline = DocumentPipeline::default();

    let result = pipeline
        .optimize_image(&input, &output, Default::default())
        .unwrap();
    assert!(result.success);
    let meta = pipeline.extract_metadata(&output).unwrap();
    assert_eq!((meta.width, meta.height), (Some(1), Some(1)));
}

#[test]
fn sample_text_is_extracted() {
    let dir = TempDir::new().unwrap();
    let input = write(
        dir.path(),
        "sample.txt",
        b"This is a sample text file used for extraction.\n",
    );
    let text = DocumentPipeline::default().extract_text(&input).unwrap();
    assert!(text.contains("sample text file"));
}

#[test]
fn html_to_text_to_html_keeps_content_words() {
    let dir = TempDir::new().unwrap();
    let input = write(
        dir.path(),
        "page.html",
        b"<html><head><title>t</title></head><body><p>Remarkable findings</p></body></html>",
    );
    let pipeline = DocumentPipeline::default();

    let txt = dir.path().join("page.txt");
    pipeline
        .convert_document(&input, &txt, &ConversionOptions::new(SupportedFormat::Txt))
        .unwrap();
    let html = dir.path().join("again.html");
    let result = pipeline
        .convert_document(&txt, &html, &ConversionOptions::new(SupportedFormat::Html))
        .unwrap();
    assert!(result.success);

    let round_tripped = std::fs::read_to_string(&html).unwrap();
    assert!(round_tripped.contains("Remarkable"));
}

#[test]
fn png_to_docx_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "pic.png", &png(2, 2));
    let err = DocumentPipeline::default()
        .convert_document(
            &input,
            &dir.path().join("pic.docx"),
            &ConversionOptions::new(SupportedFormat::Docx),
        )
        .unwrap_err();
    assert!(matches!(err, DocwerkError::UnsupportedOperation(_)));
}

#[test]
fn ocr_on_text_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "notes.txt", b"hello");
    let err = DocumentPipeline::default()
        .perform_ocr(&input, &OcrOptions::default())
        .unwrap_err();
    assert!(matches!(err, DocwerkError::UnsupportedOperation(_)));
}

#[test]
fn zero_byte_file_is_invalid() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "empty.pdf", b"");
    assert!(!DocumentPipeline::default().validate_file(&input, None));
    assert!(!DocumentPipeline::default().validate_file(&dir.path().join("missing.pdf"), None));
}

#[test]
fn jpg_and_jpeg_validate_interchangeably() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "pic.png", &png(3, 3));
    let jpg = dir.path().join("pic.jpg");
    let pipeline = DocumentPipeline::default();
    pipeline
        .convert_document(&input, &jpg, &ConversionOptions::new(SupportedFormat::Jpg))
        .unwrap();

    assert!(pipeline.validate_file(&jpg, Some(SupportedFormat::Jpeg)));
    assert!(pipeline.validate_file(&jpg, Some(SupportedFormat::Jpg)));
    assert!(!pipeline.validate_file(&jpg, Some(SupportedFormat::Png)));
}

#[test]
fn detection_and_metadata_are_idempotent_and_read_only() {
    let dir = TempDir::new().unwrap();
    let bytes = png(5, 7);
    let input = write(dir.path(), "pic.png", &bytes);
    let pipeline = DocumentPipeline::default();

    let first = pipeline.detect_format(&input).unwrap();
    let second = pipeline.detect_format(&input).unwrap();
    assert_eq!(first, second);

    let a = pipeline.extract_metadata(&input).unwrap();
    let b = pipeline.extract_metadata(&input).unwrap();
    assert_eq!(a.checksum, b.checksum);
    assert_eq!(a.size, bytes.len() as u64);

    assert_eq!(std::fs::read(&input).unwrap(), bytes);
}

#[test]
fn conversions_are_deterministic() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "data.csv", b"name;qty\nbolts;12\nnuts;40\n");
    let pipeline = DocumentPipeline::default();
    let options = ConversionOptions::new(SupportedFormat::Html).preserving_formatting();

    let a = dir.path().join("a.html");
    let b = dir.path().join("b.html");
    pipeline.convert_document(&input, &a, &options).unwrap();
    pipeline.convert_document(&input, &b, &options).unwrap();
    assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
}

#[test]
fn pdf_output_is_content_identical() {
    let dir = TempDir::new().unwrap();
    let body = (0..120).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let input = write(dir.path(), "long.txt", body.as_bytes());
    let pipeline = DocumentPipeline::default();
    let options = ConversionOptions::new(SupportedFormat::Pdf);

    let a = dir.path().join("a.pdf");
    let b = dir.path().join("b.pdf");
    pipeline.convert_document(&input, &a, &options).unwrap();
    pipeline.convert_document(&input, &b, &options).unwrap();

    let pages_a = PdfReader::from_bytes(&std::fs::read(&a).unwrap()).unwrap().page_count();
    let pages_b = PdfReader::from_bytes(&std::fs::read(&b).unwrap()).unwrap().page_count();
    assert_eq!(pages_a, pages_b);
    assert!(pages_a >= 2);
    assert_eq!(pipeline.detect_format(&a).unwrap(), SupportedFormat::Pdf);
}
