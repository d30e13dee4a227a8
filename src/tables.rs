use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{GroupPeak, Peak, PeakReport, TimeBinner},
    fmt::ClockTime,
    table::{Aggregated, Aggregation, ColumnStats, Reduction},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn peak_cells(peak: &Peak) -> [Cell; 2] {
    let is_defined = peak.max_time.is_some();
    [
        Cell::new(peak.max_value)
            .set_alignment(CellAlignment::Right)
            .fg(if is_defined { Color::Red } else { Color::DarkGrey })
            .add_attribute(Attribute::Bold),
        Cell::new(peak.time_label()).set_alignment(CellAlignment::Right),
    ]
}

pub fn build_peak_table(peak: &Peak) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Peak", "Time"]);
    table.add_row(Vec::from(peak_cells(peak)));
    table
}

pub fn build_group_peaks_table(group_peaks: &[GroupPeak]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Group", "Peak", "Time", "Bins"]);
    for group_peak in group_peaks {
        let [peak_cell, time_cell] = peak_cells(&group_peak.report.peak);
        table.add_row(vec![
            Cell::new(&group_peak.group),
            peak_cell,
            time_cell,
            Cell::new(group_peak.report.binned.len())
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

/// Binned and rolling series side by side, the peak bin highlighted.
pub fn build_series_table(report: &PeakReport, binner: TimeBinner) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Start", "End", "Sum", "Rolling"]);
    for ((bin_start, sum), (_, rolling_sum)) in report.binned.iter().zip(&report.rolling) {
        let is_peak = report.peak.max_time == Some(*bin_start);
        let rolling_cell = match rolling_sum {
            Some(rolling_sum) => Cell::new(rolling_sum).fg(if is_peak {
                Color::Red
            } else {
                Color::Reset
            }),
            None => Cell::new("-").add_attribute(Attribute::Dim),
        };
        table.add_row(vec![
            Cell::new(ClockTime(*bin_start)),
            Cell::new(ClockTime(binner.bin_end(*bin_start))).add_attribute(Attribute::Dim),
            Cell::new(sum)
                .set_alignment(CellAlignment::Right)
                .fg(if *sum == 0.0 { Color::DarkGrey } else { Color::Reset }),
            rolling_cell.set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Aggregated values are rounded to whole numbers.
pub fn build_aggregated_table(aggregated: &Aggregated) -> Table {
    let mut table = new_table();
    let mut header = vec![aggregated.group_by.clone()];
    header.extend(
        aggregated.columns.iter().map(|column| format!("{column} ({})", aggregated.aggregation)),
    );
    table.set_header(header);
    for (key, values) in &aggregated.rows {
        let mut row = vec![Cell::new(key).add_attribute(Attribute::Bold)];
        row.extend(values.iter().map(|value| match value {
            Some(value) => Cell::new(format!("{value:.0}")).set_alignment(CellAlignment::Right),
            None => Cell::new("-").add_attribute(Attribute::Dim),
        }));
        table.add_row(row);
    }
    table
}

pub fn build_stats_table(quantiles: &[f64], stats: &[ColumnStats]) -> Table {
    let mut table = new_table();
    let mut header = vec!["Column".to_owned(), "Count".to_owned(), "Mean".to_owned()];
    header.extend(quantiles.iter().map(|&quantile| Aggregation::Percentile(quantile).to_string()));
    table.set_header(header);
    for column_stats in stats {
        let mut row = vec![
            Cell::new(&column_stats.column).add_attribute(Attribute::Bold),
            Cell::new(column_stats.count)
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ];
        row.extend(
            std::iter::once(column_stats.mean)
                .chain(column_stats.percentiles.iter().map(|(_, value)| *value))
                .map(|value| match value {
                    Some(value) => {
                        Cell::new(format!("{value:.1}")).set_alignment(CellAlignment::Right)
                    }
                    None => Cell::new("-").add_attribute(Attribute::Dim),
                }),
        );
        table.add_row(row);
    }
    table
}

pub fn build_reduction_table(column: &str, reduction: Reduction, value: Option<f64>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Column", "Reduction", "Value"]);
    table.add_row(vec![
        Cell::new(column),
        Cell::new(format!("{reduction:?}")).add_attribute(Attribute::Dim),
        value.map_or_else(
            || Cell::new("-").add_attribute(Attribute::Dim),
            |value| Cell::new(value).set_alignment(CellAlignment::Right),
        ),
    ]);
    table
}
