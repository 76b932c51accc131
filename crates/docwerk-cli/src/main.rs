// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docwerk — file processing pipeline
//
// Entry point. Initialises logging, loads the pipeline configuration, runs
// one subcommand and prints its JSON result. Logs go to stderr.
//
// Exit codes: 0 success, 1 the operation ran but failed, 2 bad request.

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use docwerk_batch::FileProcessor;
use docwerk_core::PipelineConfig;
use docwerk_core::error::DocwerkError;
use docwerk_core::human_errors::humanize_error;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(docwerk) = err.downcast_ref::<DocwerkError>() {
                eprintln!("hint: {}", humanize_error(docwerk).suggestion);
            }
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    tracing::debug!(?config, "configuration loaded");

    let processor = FileProcessor::new(config);
    let report = commands::execute(cli.cmd, &processor).await?;
    println!("{}", serde_json::to_string_pretty(&report.value)?);
    Ok(report.ok)
}
