use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::{info, instrument};

use crate::table::{Error, GroupKey, Reduction, Scalar, Table};

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub enum Aggregation {
    Reduction(Reduction),

    /// Quantile within `[0, 1]`, linearly interpolated between the closest ranks.
    Percentile(f64),
}

impl Display for Aggregation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reduction(reduction) => write!(f, "{reduction:?}"),
            Self::Percentile(quantile) => write!(f, "P{:.0}", quantile * 100.0),
        }
    }
}

impl Aggregation {
    pub fn percentile(quantile: f64) -> Result<Self, Error> {
        if (0.0..=1.0).contains(&quantile) {
            Ok(Self::Percentile(quantile))
        } else {
            Err(Error::InvalidQuantile(quantile))
        }
    }

    #[must_use]
    pub fn apply(self, values: Vec<f64>) -> Option<f64> {
        match self {
            Self::Reduction(reduction) => reduction.apply(values),
            Self::Percentile(quantile) => interpolate_quantile(values, quantile),
        }
    }
}

fn interpolate_quantile(mut values: Vec<f64>, quantile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by_key(|value| OrderedFloat(*value));
    #[expect(clippy::cast_precision_loss)]
    let position = quantile * (values.len() - 1) as f64;
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (lower, upper) = (position.floor() as usize, position.ceil() as usize);
    Some((values[upper] - values[lower]).mul_add(position.fract(), values[lower]))
}

/// Aggregated columns per group, ordered by the group key.
#[derive(Clone, Debug, Serialize)]
#[must_use]
pub struct Aggregated {
    pub group_by: String,
    pub columns: Vec<String>,
    pub aggregation: Aggregation,
    pub rows: Vec<(Scalar, Vec<Option<f64>>)>,
}

/// Mean and percentiles of the numeric cells in a column.
#[derive(Clone, Debug, Serialize)]
#[must_use]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,

    /// Pairs of the quantile and its interpolated value.
    pub percentiles: Vec<(f64, Option<f64>)>,
}

impl Table {
    /// Describe the column by its mean and the quantiles, each within `[0, 1]`.
    pub fn describe(&self, column: &str, quantiles: &[f64]) -> Result<ColumnStats, Error> {
        let values: Vec<f64> = self.numbers(column)?.collect();
        let percentiles = quantiles
            .iter()
            .map(|&quantile| {
                let value = Aggregation::percentile(quantile)?.apply(values.clone());
                Ok::<_, Error>((quantile, value))
            })
            .collect::<Result<_, _>>()?;
        Ok(ColumnStats {
            column: column.to_owned(),
            count: values.len(),
            mean: Reduction::Mean.apply(values),
            percentiles,
        })
    }

    /// Group the rows by a column and aggregate the numeric cells of the selected columns.
    #[instrument(skip(self, columns), fields(n_columns = columns.len()))]
    pub fn aggregate(
        &self,
        group_by: &str,
        columns: &[String],
        aggregation: Aggregation,
    ) -> Result<Aggregated, Error> {
        let key_index = self.column_index(group_by)?;
        let value_indices: Vec<usize> =
            columns.iter().map(|column| self.column_index(column)).collect::<Result<_, _>>()?;

        let mut groups: BTreeMap<GroupKey, Vec<&[Scalar]>> = BTreeMap::new();
        for row in &self.rows {
            if let Some(key) = GroupKey::new(&row[key_index]) {
                groups.entry(key).or_default().push(row);
            }
        }

        let rows: Vec<_> = groups
            .into_iter()
            .map(|(key, rows)| {
                let values = value_indices
                    .iter()
                    .map(|&index| {
                        let cells = rows.iter().filter_map(|row| row[index].as_number());
                        aggregation.apply(cells.collect())
                    })
                    .collect();
                (Scalar::from(key), values)
            })
            .collect();
        info!(n_groups = rows.len(), "aggregated");

        Ok(Aggregated {
            group_by: group_by.to_owned(),
            columns: columns.to_vec(),
            aggregation,
            rows,
        })
    }
}
