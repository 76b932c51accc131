// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// What this build of the pipeline can do.

use std::collections::BTreeMap;

use docwerk_core::{OcrLanguage, SupportedFormat};
use docwerk_document::DocumentPipeline;
use serde::Serialize;

/// Snapshot of formats, conversions, languages and limits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingCapabilities {
    pub supported_formats: Vec<SupportedFormat>,
    /// Source format to the targets it converts into.
    pub supported_conversions: BTreeMap<SupportedFormat, Vec<SupportedFormat>>,
    pub ocr_languages: Vec<OcrLanguage>,
    /// Formats `extract_text` understands.
    pub text_formats: Vec<SupportedFormat>,
    pub max_file_size: u64,
    pub max_batch_size: usize,
    /// Image OCR backend, if one is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_backend: Option<String>,
}

pub fn processing_capabilities(pipeline: &DocumentPipeline) -> ProcessingCapabilities {
    let config = pipeline.config();
    ProcessingCapabilities {
        supported_formats: SupportedFormat::ALL.to_vec(),
        supported_conversions: pipeline.registry().targets_by_source(),
        ocr_languages: OcrLanguage::ALL.to_vec(),
        text_formats: docwerk_document::text::text_formats(),
        max_file_size: config.max_file_size,
        max_batch_size: config.max_batch_size,
        ocr_backend: pipeline.ocr_backend().map(str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwerk_core::PipelineConfig;

    #[test]
    fn capabilities_are_populated() {
        let caps = processing_capabilities(&DocumentPipeline::default());
        assert_eq!(caps.supported_formats.len(), SupportedFormat::ALL.len());
        assert!(!caps.ocr_languages.is_empty());
        assert!(!caps.text_formats.is_empty());
        assert!(caps.max_file_size > 0);
        assert!(caps.max_batch_size > 0);

        let png_targets = &caps.supported_conversions[&SupportedFormat::Png];
        assert!(png_targets.contains(&SupportedFormat::Jpg));
        assert!(!png_targets.contains(&SupportedFormat::Docx));
    }

    #[test]
    fn limits_follow_config() {
        let config = PipelineConfig {
            max_batch_size: 7,
            ..PipelineConfig::default()
        };
        let caps = processing_capabilities(&DocumentPipeline::new(config));
        assert_eq!(caps.max_batch_size, 7);
    }

    #[test]
    fn serialises_conversions_by_format_name() {
        let caps = processing_capabilities(&DocumentPipeline::default());
        let json = serde_json::to_value(&caps).unwrap();
        assert!(json["supported_conversions"]["txt"].is_array());
        assert!(json["ocr_languages"].as_array().unwrap().contains(&"eng".into()));
    }
}
