use clap::Parser;

use crate::{
    cli::{OutputArgs, input::InputArgs},
    prelude::*,
    tables::build_stats_table,
};

#[derive(Parser)]
pub struct StatsArgs {
    #[clap(flatten)]
    input: InputArgs,

    /// Comma-separated columns to describe, text and empty cells are skipped.
    #[clap(long, value_delimiter = ',', num_args = 1.., required = true)]
    columns: Vec<String>,

    /// Comma-separated quantiles to report, each within `[0, 1]`.
    #[clap(
        long,
        value_delimiter = ',',
        num_args = 1..,
        default_value = "0.6,0.7,0.75,0.8,0.9,0.95,0.99",
        env = "FLOWPEAK_PERCENTILES"
    )]
    percentiles: Vec<f64>,

    /// Replace the negative values of the columns with zero first.
    #[clap(long, env = "FLOWPEAK_CLIP_NEGATIVE")]
    clip_negative: bool,

    #[clap(flatten)]
    output: OutputArgs,
}

impl StatsArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let mut table = self.input.load()?;
        if self.clip_negative {
            let n_clipped = table.clip_negative(&self.columns)?;
            info!(n_clipped, "removed the negative values");
        }
        let stats = self
            .columns
            .iter()
            .map(|column| table.describe(column, &self.percentiles))
            .collect::<Result<Vec<_>, _>>()?;
        self.output.print(&stats, || build_stats_table(&self.percentiles, &stats))
    }
}
