// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoding, transformation, tiered re-encoding, and the
// optimizer built on top of them.

pub mod optimize;
pub mod processor;

pub use optimize::ImageOptimizer;
pub use processor::ImageProcessor;
