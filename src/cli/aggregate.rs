use std::ops::RangeInclusive;

use clap::Parser;

use crate::{
    cli::{
        OutputArgs,
        input::{InputArgs, TimeFormatArgs},
    },
    prelude::*,
    table::{Aggregation, Reduction, Table},
    tables::build_aggregated_table,
};

#[derive(Parser)]
pub struct AggregateArgs {
    #[clap(flatten)]
    input: InputArgs,

    /// Column to group by. Use `Hour` together with `--hour-of`.
    #[clap(long, env = "FLOWPEAK_GROUP_BY")]
    group_by: String,

    /// Comma-separated columns to aggregate.
    #[clap(long, value_delimiter = ',', num_args = 1.., required = true)]
    columns: Vec<String>,

    #[clap(long, value_enum, default_value = "mean", env = "FLOWPEAK_REDUCTION")]
    reduction: Reduction,

    /// Aggregate by the percentile instead, within `[0, 1]`.
    #[clap(long, conflicts_with = "reduction", env = "FLOWPEAK_PERCENTILE")]
    percentile: Option<f64>,

    /// Derive the `Hour` column from this time column.
    #[clap(long = "hour-of", env = "FLOWPEAK_HOUR_OF")]
    hour_of: Option<String>,

    #[clap(flatten)]
    time_format: TimeFormatArgs,

    /// Keep only the records within these hours of the `Hour` column, for example `4-11`.
    #[clap(long, value_parser = parse_hours, env = "FLOWPEAK_HOURS")]
    hours: Option<RangeInclusive<u32>>,

    /// Replace the negative values of the aggregated columns with zero first.
    #[clap(long, env = "FLOWPEAK_CLIP_NEGATIVE")]
    clip_negative: bool,

    #[clap(flatten)]
    output: OutputArgs,
}

/// Parse an inclusive range of hours, `START-END` or `START..=END`.
fn parse_hours(range: &str) -> Result<RangeInclusive<u32>> {
    let (start, end) = range
        .split_once("..=")
        .or_else(|| range.split_once('-'))
        .with_context(|| format!("expected `START-END`, got `{range}`"))?;
    let start: u32 = start.trim().parse().context("invalid start hour")?;
    let end: u32 = end.trim().parse().context("invalid end hour")?;
    ensure!(start <= end && end < 24, "expected ordered hours within 0-23, got `{range}`");
    Ok(start..=end)
}

impl AggregateArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let aggregation = match self.percentile {
            Some(quantile) => Aggregation::percentile(quantile)?,
            None => Aggregation::Reduction(self.reduction),
        };
        let mut table = self.input.load()?;
        if let Some(time_column) = &self.hour_of {
            self.time_format.convert(&mut table, time_column)?;
            table.push_hour_column(time_column)?;
        } else if self.group_by == Table::HOUR_COLUMN {
            warn!("grouping by `{}` without `--hour-of`", Table::HOUR_COLUMN);
        }
        if self.clip_negative {
            let n_clipped = table.clip_negative(&self.columns)?;
            info!(n_clipped, "removed the negative values");
        }
        if let Some(hours) = &self.hours {
            let range = f64::from(*hours.start())..=f64::from(*hours.end());
            let n_dropped = table.retain_within(Table::HOUR_COLUMN, &range)?;
            info!(n_dropped, n_left = table.len(), "filtered the hours");
        }
        let aggregated = table.aggregate(&self.group_by, &self.columns, aggregation)?;
        self.output.print(&aggregated, || build_aggregated_table(&aggregated))
    }
}
