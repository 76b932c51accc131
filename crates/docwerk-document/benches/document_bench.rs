// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for format detection and conversion hot paths.

use std::io::{Cursor, Write};

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use docwerk_core::{ConversionQuality, SupportedFormat};
use docwerk_document::{ImageProcessor, PdfWriter, detect_format_bytes, extract_text_bytes};
use image::{DynamicImage, Rgb, RgbImage};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn png_fixture() -> Vec<u8> {
    let img = RgbImage::from_fn(256, 256, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encode fixture");
    buffer
}

fn docx_fixture() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).expect("zip entry");
    writer.write_all(b"<Types/>").expect("zip write");
    writer.start_file("word/document.xml", options).expect("zip entry");
    writer.write_all(b"<w:document/>").expect("zip write");
    writer.finish().expect("zip finish").into_inner()
}

fn html_fixture() -> String {
    let rows: String = (0..500)
        .map(|i| format!("<tr><td>row {i}</td><td>{}</td></tr>", i * 7))
        .collect();
    format!(
        "<!DOCTYPE html><html><head><style>td{{}}</style></head><body><h1>Report</h1><table>{rows}</table></body></html>"
    )
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_detection(c: &mut Criterion) {
    let png = png_fixture();
    let docx = docx_fixture();
    let text = b"plain text content\n".repeat(200);

    c.bench_function("detect png", |b| {
        b.iter(|| detect_format_bytes(black_box(&png), Some("a.png")))
    });
    c.bench_function("detect docx (zip members)", |b| {
        b.iter(|| detect_format_bytes(black_box(&docx), Some("a.docx")))
    });
    c.bench_function("detect txt", |b| {
        b.iter(|| detect_format_bytes(black_box(&text), Some("a.txt")))
    });
}

fn bench_conversion(c: &mut Criterion) {
    let html = html_fixture();
    let png = png_fixture();
    let text = "The quick brown fox jumps over the lazy dog.\n".repeat(300);

    c.bench_function("html -> text (500 rows)", |b| {
        b.iter(|| extract_text_bytes(black_box(html.as_bytes()), SupportedFormat::Html))
    });
    c.bench_function("png -> jpeg (256x256, medium)", |b| {
        b.iter(|| {
            ImageProcessor::from_bytes(black_box(&png))
                .and_then(|p| p.encode(SupportedFormat::Jpeg, ConversionQuality::Medium))
        })
    });
    c.bench_function("text -> pdf (300 lines)", |b| {
        b.iter(|| PdfWriter::new().create_from_text(black_box(&text)))
    });
}

criterion_group!(benches, bench_detection, bench_conversion);
criterion_main!(benches);
