mod aggregate;
mod combine;
mod input;
mod peak;
mod reduce;
mod stats;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::{
    cli::{
        aggregate::AggregateArgs,
        combine::CombineArgs,
        peak::PeakArgs,
        reduce::ReduceArgs,
        stats::StatsArgs,
    },
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: find the peak rolling sum over the time-binned records.
    #[clap(name = "peak")]
    Peak(Box<PeakArgs>),

    /// Reduce a single column to a number.
    #[clap(name = "reduce")]
    Reduce(Box<ReduceArgs>),

    /// Derive a new column from two numeric columns and write the table out.
    #[clap(name = "combine")]
    Combine(Box<CombineArgs>),

    /// Group the records by a column and aggregate the other columns.
    #[clap(name = "aggregate")]
    Aggregate(Box<AggregateArgs>),

    /// Describe columns by their mean and percentiles.
    #[clap(name = "stats")]
    Stats(Box<StatsArgs>),
}

impl Command {
    pub fn run(self) -> Result {
        match self {
            Self::Peak(args) => args.run(),
            Self::Reduce(args) => args.run(),
            Self::Combine(args) => args.run(),
            Self::Aggregate(args) => args.run(),
            Self::Stats(args) => args.run(),
        }
    }
}

#[derive(Copy, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Terminal tables.
    #[default]
    Table,

    /// Pretty-printed JSON.
    Json,
}

#[derive(Parser)]
pub struct OutputArgs {
    #[clap(long = "format", value_enum, default_value_t, env = "FLOWPEAK_FORMAT")]
    pub format: OutputFormat,
}

impl OutputArgs {
    /// Print the value as JSON, or the table otherwise.
    pub fn print<T: Serialize>(
        &self,
        value: &T,
        build_table: impl FnOnce() -> comfy_table::Table,
    ) -> Result {
        match self.format {
            OutputFormat::Table => println!("{}", build_table()),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value).context("failed to serialize")?);
            }
        }
        Ok(())
    }
}
