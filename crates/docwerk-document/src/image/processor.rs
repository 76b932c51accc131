// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, downscale, rotate and re-encode raster images.
// The `image` crate is the codec boundary.

use std::io::Cursor;

use docwerk_core::error::{DocwerkError, Result};
use docwerk_core::{ConversionQuality, SupportedFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument};

/// One decoded image. Transformations consume `self`, so calls chain:
///
/// ```ignore
/// let bytes = ImageProcessor::from_bytes(&data)?
///     .fit_within(2048)
///     .encode(SupportedFormat::Png, ConversionQuality::High)?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    #[instrument(skip_all, fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|err| DocwerkError::ImageError(format!("failed to decode image: {err}")))?;
        debug!(width = image.width(), height = image.height(), "image decoded");
        Ok(Self { image })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Shrink so the longest edge is at most `max_edge`, keeping the aspect
    /// ratio (Lanczos3). Never upscales.
    pub fn fit_within(self, max_edge: u32) -> Self {
        if self.image.width() <= max_edge && self.image.height() <= max_edge {
            return self;
        }
        let image = self.image.resize(max_edge, max_edge, FilterType::Lanczos3);
        debug!(width = image.width(), height = image.height(), max_edge, "image downscaled");
        Self { image }
    }

    /// Rotate clockwise by a multiple of 90 degrees. Other angles are rounded
    /// down to the previous quarter turn.
    pub fn rotate(self, degrees: u16) -> Self {
        let image = match (degrees / 90) % 4 {
            1 => self.image.rotate90(),
            2 => self.image.rotate180(),
            3 => self.image.rotate270(),
            _ => self.image,
        };
        Self { image }
    }

    pub fn grayscale(self) -> Self {
        Self {
            image: self.image.grayscale(),
        }
    }

    /// Scale each colour channel's distance from mid-grey by `factor`.
    /// Alpha is untouched.
    pub fn adjust_contrast(self, factor: f32) -> Self {
        let mut rgba = self.image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            for channel in &mut pixel.0[..3] {
                *channel = (factor * (*channel as f32 - 128.0) + 128.0).clamp(0.0, 255.0) as u8;
            }
        }
        Self {
            image: DynamicImage::ImageRgba8(rgba),
        }
    }

    /// Encode as `format` with the encoder settings of `quality`.
    ///
    /// JPEG quality and PNG compression follow the tier; TIFF, BMP and
    /// lossless WebP ignore it. Identical input gives identical bytes.
    pub fn encode(&self, format: SupportedFormat, quality: ConversionQuality) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let written = match format.canonical() {
            SupportedFormat::Jpeg => self.image.to_rgb8().write_with_encoder(
                JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_quality()),
            ),
            SupportedFormat::Png => self.image.write_with_encoder(PngEncoder::new_with_quality(
                &mut buffer,
                png_compression(quality),
                PngFilter::Adaptive,
            )),
            SupportedFormat::Tiff => DynamicImage::ImageRgb8(self.image.to_rgb8())
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Tiff),
            SupportedFormat::Bmp => DynamicImage::ImageRgb8(self.image.to_rgb8())
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Bmp),
            SupportedFormat::Webp => DynamicImage::ImageRgba8(self.image.to_rgba8())
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::WebP),
            other => {
                return Err(DocwerkError::UnsupportedOperation(format!(
                    "{other} is not a raster image format"
                )));
            }
        };
        written.map_err(|err| DocwerkError::ImageError(format!("{format} encoding failed: {err}")))?;
        Ok(buffer)
    }
}

fn png_compression(quality: ConversionQuality) -> CompressionType {
    match quality {
        ConversionQuality::Low => CompressionType::Best,
        ConversionQuality::Medium => CompressionType::Default,
        ConversionQuality::High => CompressionType::Fast,
    }
}
