// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand handlers. Each produces the JSON document printed on stdout.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use docwerk_batch::FileProcessor;
use docwerk_core::{BatchJob, ConversionOptions, OcrOptions, SupportedFormat};
use serde_json::{Value, json};
use tracing::info;

use crate::cli::Command;

/// JSON output plus whether the operation succeeded.
#[derive(Debug)]
pub struct Report {
    pub value: Value,
    pub ok: bool,
}

impl Report {
    fn ok(value: Value) -> Self {
        Self { value, ok: true }
    }
}

pub async fn execute(cmd: Command, processor: &FileProcessor) -> anyhow::Result<Report> {
    match cmd {
        Command::Detect { path } => {
            let format = processor.detect_format(&path)?;
            Ok(Report::ok(json!({
                "path": path,
                "format": format,
                "mime_type": format.mime_type(),
                "category": format.category(),
            })))
        }

        Command::Validate { path, expect } => {
            let valid = processor.validate_file(&path, expect);
            Ok(Report {
                value: json!({ "path": path, "valid": valid }),
                ok: valid,
            })
        }

        Command::Metadata { path } => {
            Ok(Report::ok(serde_json::to_value(processor.extract_metadata(&path)?)?))
        }

        Command::Text { path, output } => match output {
            Some(output) => {
                let chars = processor.pipeline().extract_text_to_file(&path, &output)?;
                Ok(Report::ok(json!({ "chars": chars, "output_path": output })))
            }
            None => {
                let text = processor.extract_text(&path)?;
                Ok(Report::ok(json!({ "chars": text.chars().count(), "text": text })))
            }
        },

        Command::Convert {
            input,
            output,
            to,
            quality,
            preserve_formatting,
        } => {
            let target = match to {
                Some(target) => target,
                None => target_from_extension(&output)?,
            };
            let mut options = ConversionOptions::new(target).with_quality(quality.into());
            if preserve_formatting {
                options = options.preserving_formatting();
            }
            let result = processor.convert_document(&input, &output, &options)?;
            Ok(Report {
                ok: result.success,
                value: serde_json::to_value(result)?,
            })
        }

        Command::Ocr {
            input,
            output,
            languages,
            confidence,
            preserve_layout,
            detect_orientation,
            enhance,
            format,
        } => {
            let options = OcrOptions {
                languages,
                confidence,
                preserve_layout,
                detect_orientation,
                enhance_image: enhance,
                output_format: format.into(),
            };
            let result = match output {
                Some(output) => processor
                    .pipeline()
                    .perform_ocr_to_file(&input, &output, &options)?,
                None => processor.perform_ocr(&input, &options)?,
            };
            Ok(Report {
                ok: result.success,
                value: serde_json::to_value(result)?,
            })
        }

        Command::Optimize {
            input,
            output,
            quality,
        } => {
            let result = processor.optimize_image(&input, &output, quality.into())?;
            Ok(Report {
                ok: result.success,
                value: serde_json::to_value(result)?,
            })
        }

        Command::Batch {
            jobs,
            concurrency,
            priority,
            retries,
            retry_delay_ms,
            backoff,
        } => {
            let data = std::fs::read_to_string(&jobs)
                .with_context(|| format!("reading job file {}", jobs.display()))?;
            let batch: Vec<BatchJob> = serde_json::from_str(&data)
                .with_context(|| format!("parsing job file {}", jobs.display()))?;

            let defaults = processor.batch_options();
            let options = defaults
                .clone()
                .with_concurrency(concurrency.unwrap_or(defaults.concurrency))
                .with_priority(priority.into())
                .with_retries(
                    retries.unwrap_or(defaults.retry_attempts),
                    retry_delay_ms.map_or(defaults.retry_delay, Duration::from_millis),
                )
                .with_backoff(backoff.into())
                .on_progress(|current, total| info!(current, total, "batch progress"));

            let result = processor.process_batch(batch, options).await?;
            Ok(Report {
                ok: result.failed_jobs == 0,
                value: serde_json::to_value(result)?,
            })
        }

        Command::Capabilities => Ok(Report::ok(serde_json::to_value(
            processor.processing_capabilities(),
        )?)),
    }
}

fn target_from_extension(output: &Path) -> anyhow::Result<SupportedFormat> {
    let Some(ext) = output.extension().and_then(|ext| ext.to_str()) else {
        bail!("{} has no extension; pass --to", output.display());
    };
    SupportedFormat::from_extension(ext)
        .with_context(|| format!("unknown target extension '.{ext}'; pass --to"))
}
