// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pre-OCR cleanup: grayscale, contrast boost, Gaussian denoise, and Otsu
// binarisation.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;

/// Contrast factor applied before thresholding.
const CONTRAST: f32 = 1.4;
/// Gaussian sigma for denoising. Must stay positive.
const DENOISE_SIGMA: f32 = 1.0;

/// Produce a black-and-white version of `image` suited to text recognition.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn enhance_for_ocr(image: DynamicImage) -> DynamicImage {
    let gray = ImageProcessor::from_dynamic(image)
        .grayscale()
        .adjust_contrast(CONTRAST)
        .into_dynamic()
        .to_luma8();

    let blurred = gaussian_blur_f32(&gray, DENOISE_SIGMA);
    let threshold = otsu_threshold(&blurred);
    debug!(threshold, "Otsu threshold computed");

    DynamicImage::ImageLuma8(binarize(&blurred, threshold))
}

/// Pixels below `threshold` become black, the rest white.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let binary = if pixel.0[0] < threshold { 0u8 } else { 255u8 };
        output.put_pixel(x, y, Luma([binary]));
    }
    output
}

/// Global threshold maximising between-class variance (Otsu's method).
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            // The threshold separates `t` (background) from `t + 1`.
            best_threshold = (t as u8).saturating_add(1);
        }
    }

    best_threshold
}
