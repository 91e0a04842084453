//! CLI commands and argument parsing

use crate::types::{OutputFormat, PartitionLayout};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Batch ingestion of current-weather observations
#[derive(Parser, Debug)]
#[command(name = "weather-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true, default_value = "config/config.yaml")]
    pub config: PathBuf,

    /// OpenWeather city list used to validate configured cities
    #[arg(long, global = true, default_value = "config/city.list.json")]
    pub city_list: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one ingestion batch
    Run {
        /// Override the output format
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Override the partition layout
        #[arg(short, long)]
        layout: Option<PartitionLayout>,

        /// Override the dataset root directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// How to print the run summary
        #[arg(long, default_value = "pretty")]
        summary: SummaryFormat,
    },

    /// Validate the configuration and the configured cities
    Validate,
}

/// Run summary rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryFormat {
    /// Human-readable table
    Pretty,
    /// Single JSON document
    Json,
}
