//! CLI runner - executes commands

use crate::cities::{CityCatalog, CityValidator};
use crate::cli::commands::{Cli, Commands, SummaryFormat};
use crate::config::{load_config, PipelineConfig};
use crate::pipeline::{Pipeline, RunSummary};
use crate::types::{OutputFormat, PartitionLayout};
use anyhow::Context;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command and return the process exit code
    pub async fn run(&self) -> anyhow::Result<i32> {
        match &self.cli.command {
            Commands::Run {
                format,
                layout,
                output,
                summary,
            } => {
                self.run_batch(*format, *layout, output.clone(), *summary)
                    .await
            }
            Commands::Validate => self.validate(),
        }
    }

    async fn run_batch(
        &self,
        format: Option<OutputFormat>,
        layout: Option<PartitionLayout>,
        output: Option<PathBuf>,
        summary_format: SummaryFormat,
    ) -> anyhow::Result<i32> {
        let mut config = self.load_config()?;
        apply_overrides(&mut config, format, layout, output);
        config
            .validate()
            .context("configuration invalid after applying overrides")?;

        let catalog = self.load_catalog()?;
        let pipeline = Pipeline::from_config(config, Arc::new(catalog))?;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run");
                trigger.cancel();
            }
        });

        let summary = pipeline.run(&cancel).await;
        signal.abort();

        match summary_format {
            SummaryFormat::Pretty => print!("{}", render_summary(&summary)),
            SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        }

        Ok(summary.exit_code())
    }

    fn validate(&self) -> anyhow::Result<i32> {
        let config = self.load_config()?;
        let catalog = self.load_catalog()?;

        let mut invalid = 0;
        for city in config.city_ids() {
            if catalog.is_valid(&city) {
                println!("  ok       {}, {}", city.name, city.country);
            } else {
                invalid += 1;
                println!("  unknown  {}, {}", city.name, city.country);
            }
        }

        println!(
            "\n{} cities configured, {} not in the reference list",
            config.cities.len(),
            invalid
        );
        println!(
            "format: {}  layout: {}  base path: {}",
            config.storage.format,
            config.storage.layout,
            config.storage.base_path.display()
        );
        Ok(0)
    }

    fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let config = load_config(&self.cli.config)
            .with_context(|| format!("loading {}", self.cli.config.display()))?;
        info!(path = %self.cli.config.display(), cities = config.cities.len(), "Configuration loaded");
        Ok(config)
    }

    fn load_catalog(&self) -> anyhow::Result<CityCatalog> {
        let catalog = CityCatalog::from_path(&self.cli.city_list)
            .with_context(|| format!("loading city list {}", self.cli.city_list.display()))?;
        info!(entries = catalog.len(), "City list loaded");
        Ok(catalog)
    }
}

fn apply_overrides(
    config: &mut PipelineConfig,
    format: Option<OutputFormat>,
    layout: Option<PartitionLayout>,
    output: Option<PathBuf>,
) {
    if let Some(format) = format {
        config.storage.format = format;
    }
    if let Some(layout) = layout {
        config.storage.layout = layout;
    }
    if let Some(output) = output {
        config.storage.base_path = output;
    }
}

/// Human-readable run summary
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Run {} {}", summary.run_timestamp, summary.state);
    let _ = writeln!(
        out,
        "Cities: {} succeeded, {} failed",
        summary.succeeded(),
        summary.failed()
    );

    for outcome in &summary.cities {
        let city = format!("{}, {}", outcome.city.name, outcome.city.country);
        match outcome.disposition.error_message() {
            None => {
                let _ = writeln!(out, "  {city:<28} {}", outcome.disposition.kind());
            }
            Some(cause) => {
                let _ = writeln!(
                    out,
                    "  {city:<28} {:<22} {cause}",
                    outcome.disposition.kind()
                );
            }
        }
    }

    if let Some(report) = &summary.write_report {
        let _ = writeln!(
            out,
            "Files: {} written, {} failed ({} records)",
            report.files_written(),
            report.failed().count(),
            report.records_written()
        );
        for partition in &report.partitions {
            match &partition.error {
                None => {
                    let _ = writeln!(out, "  {}", partition.path.display());
                }
                Some(e) => {
                    let _ = writeln!(out, "  {} FAILED: {}", partition.path.display(), e.message);
                }
            }
        }
    }

    if let Some(error) = &summary.error {
        let _ = writeln!(out, "Error: {error}");
    }
    out
}
