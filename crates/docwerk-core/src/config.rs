// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocwerkError, Result};
use crate::types::duration_ms;

/// Limits and defaults shared by every pipeline operation.
///
/// Durations are (de)serialised as whole milliseconds. Missing keys fall back
/// to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest input accepted by any operation, in bytes.
    pub max_file_size: u64,
    /// Largest number of jobs accepted in one batch.
    pub max_batch_size: usize,
    /// Wall-clock limit for a single job attempt.
    #[serde(with = "duration_ms")]
    pub operation_timeout: Duration,
    pub default_concurrency: usize,
    pub default_retry_attempts: u32,
    #[serde(with = "duration_ms")]
    pub default_retry_delay: Duration,
    /// Upper bound on exponential backoff.
    #[serde(with = "duration_ms")]
    pub max_retry_delay: Duration,
    /// Directory holding the OCR detection/recognition models.
    pub ocr_model_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024,
            max_batch_size: 1000,
            operation_timeout: Duration::from_secs(120),
            default_concurrency: 4,
            default_retry_attempts: 2,
            default_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(60),
            ocr_model_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| DocwerkError::from_io(path, e))?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make every operation fail.
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(DocwerkError::Validation("max_file_size must be positive".into()));
        }
        if self.max_batch_size == 0 {
            return Err(DocwerkError::Validation("max_batch_size must be positive".into()));
        }
        if self.default_concurrency == 0 {
            return Err(DocwerkError::Validation(
                "default_concurrency must be at least 1".into(),
            ));
        }
        if self.operation_timeout.is_zero() {
            return Err(DocwerkError::Validation("operation_timeout must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_file_size, 104_857_600);
        assert_eq!(config.max_batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "default_concurrency": 8, "operation_timeout": 5000 }}"#).unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.default_concurrency, 8);
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert_eq!(config.max_batch_size, 1000);
    }

    #[test]
    fn durations_serialise_as_millis() {
        let json = serde_json::to_value(PipelineConfig::default()).unwrap();
        assert_eq!(json["default_retry_delay"], 1000);
        assert_eq!(json["max_retry_delay"], 60_000);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "default_concurrency": 0 }}"#).unwrap();
        assert!(PipelineConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = PipelineConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, DocwerkError::NotFound(_)));
    }
}
