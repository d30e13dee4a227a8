use clap::Parser;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    cli::{
        OutputArgs,
        input::{InputArgs, TimeFormatArgs},
    },
    core::{
        BinDensity,
        Cancellation,
        GroupPeak,
        OutOfDomainPolicy,
        PeakRequest,
        PeakRollingEngine,
        WindowPolicy,
    },
    prelude::*,
    tables::{build_group_peaks_table, build_peak_table, build_series_table},
};

#[derive(Parser)]
pub struct PeakArgs {
    #[clap(flatten)]
    input: InputArgs,

    /// Column with the minutes since midnight, or textual times with `--time-format`.
    #[clap(long, env = "FLOWPEAK_TIME_COLUMN")]
    time_column: String,

    #[clap(flatten)]
    time_format: TimeFormatArgs,

    /// Column with the quantity to sum, every record counts as one if omitted.
    #[clap(long, env = "FLOWPEAK_VALUE_COLUMN")]
    value_column: Option<String>,

    /// Column to compute the peaks for each of its values separately.
    #[clap(long, env = "FLOWPEAK_GROUP_COLUMN")]
    group_column: Option<String>,

    /// Bin width in minutes.
    #[clap(long = "bin-interval-minutes", default_value = "1", env = "FLOWPEAK_BIN_INTERVAL")]
    bin_interval: u32,

    /// Rolling window size in bins.
    #[clap(long = "window-bins", default_value = "60", env = "FLOWPEAK_WINDOW")]
    window: usize,

    /// Print the peak time as `H:MM` instead of minutes.
    #[clap(long, env = "FLOWPEAK_CLOCK")]
    clock: bool,

    #[clap(long, value_enum, default_value_t, env = "FLOWPEAK_DENSITY")]
    density: BinDensity,

    #[clap(long, value_enum, default_value_t, env = "FLOWPEAK_WINDOW_POLICY")]
    window_policy: WindowPolicy,

    #[clap(long, value_enum, default_value_t, env = "FLOWPEAK_OUT_OF_DOMAIN")]
    out_of_domain: OutOfDomainPolicy,

    /// Give up on the grouped computation after this long, for example `30s`.
    #[clap(long, env = "FLOWPEAK_DEADLINE")]
    deadline: Option<humantime::Duration>,

    /// Also print the binned and rolling series.
    #[clap(long)]
    series: bool,

    #[clap(flatten)]
    output: OutputArgs,
}

impl PeakArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let mut table = self.input.load()?;
        if table.is_empty() {
            warn!("no records to bin");
        }
        self.time_format.convert(&mut table, &self.time_column)?;
        let rows = table.rows().collect_vec();

        let engine = PeakRollingEngine::try_new(
            PeakRequest::builder()
                .time_field(self.time_column)
                .maybe_value_field(self.value_column)
                .bin_interval(self.bin_interval)
                .window(self.window)
                .format_as_clock(self.clock)
                .density(self.density)
                .window_policy(self.window_policy)
                .out_of_domain(self.out_of_domain)
                .build(),
        )?;

        let Some(group_column) = self.group_column else {
            let report = engine.peak(&rows)?;
            return self.output.print(&report, || {
                if self.series {
                    println!("{}", build_series_table(&report, engine.binner()));
                }
                build_peak_table(&report.peak)
            });
        };

        // Signals only interrupt the grouped computation, which is checked between the groups:
        let cancellation = Cancellation::default()
            .on_termination_signals()
            .context("failed to register the signal handlers")?;
        let cancellation = match self.deadline {
            Some(deadline) => cancellation.with_timeout(deadline.into()),
            None => cancellation,
        };
        let group_peaks = engine.peak_by_group(&rows, &group_column, &cancellation)?;
        let grouped = Grouped { group_field: &group_column, groups: &group_peaks };
        self.output.print(&grouped, || {
            if self.series {
                for group_peak in &group_peaks {
                    println!("{group_column}: {}", group_peak.group);
                    println!("{}", build_series_table(&group_peak.report, engine.binner()));
                }
            }
            build_group_peaks_table(&group_peaks)
        })
    }
}

#[derive(Serialize)]
struct Grouped<'a> {
    group_field: &'a str,
    groups: &'a [GroupPeak],
}
