use std::ops::RangeInclusive;

use average::Mean;
use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::table::{Error, Scalar, Table};

/// Arithmetic between two columns.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    /// Apply the operation, `None` on division by zero.
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> Option<f64> {
        match self {
            Self::Add => Some(lhs + rhs),
            Self::Subtract => Some(lhs - rhs),
            Self::Multiply => Some(lhs * rhs),
            Self::Divide => (rhs != 0.0).then(|| lhs / rhs),
        }
    }
}

/// Reduction of a column to a single number.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum, serde::Serialize)]
pub enum Reduction {
    Mean,
    Sum,
    Max,
    Min,
}

impl Reduction {
    /// Reduce the values, `None` when there are none.
    #[must_use]
    pub fn apply(self, values: impl IntoIterator<Item = f64>) -> Option<f64> {
        let mut values = values.into_iter().peekable();
        values.peek()?;
        match self {
            Self::Mean => {
                let estimate: Mean = values.collect();
                Some(estimate.mean())
            }
            Self::Sum => Some(values.sum()),
            Self::Max => values.reduce(f64::max),
            Self::Min => values.reduce(f64::min),
        }
    }
}

impl Table {
    pub const HOUR_COLUMN: &'static str = "Hour";

    /// Append the column `name` computed row-wise from two numeric columns.
    ///
    /// Rows where either operand is not a number, or the operation is undefined, get a null.
    #[instrument(skip(self))]
    pub fn derive_column(
        &mut self,
        name: &str,
        lhs: &str,
        op: BinaryOp,
        rhs: &str,
    ) -> Result<(), Error> {
        let cells = self
            .column(lhs)?
            .zip(self.column(rhs)?)
            .map(|(lhs, rhs)| match (lhs.as_number(), rhs.as_number()) {
                (Some(lhs), Some(rhs)) => op.apply(lhs, rhs).into(),
                _ => Scalar::Null,
            })
            .collect_vec();
        let n_nulls = cells.iter().filter(|cell| **cell == Scalar::Null).count();
        debug!(n_nulls, "derived");
        self.push_column(name.to_owned(), cells)
    }

    /// Append the `Hour` column: the hour of day of the minutes since midnight in `time_column`.
    pub fn push_hour_column(&mut self, time_column: &str) -> Result<(), Error> {
        let cells = self
            .column(time_column)?
            .map(|cell| Scalar::from(cell.as_number().map(|minutes| (minutes / 60.0).floor())))
            .collect_vec();
        self.push_column(Self::HOUR_COLUMN.to_owned(), cells)
    }

    /// Replace the negative numbers of the columns with zero.
    ///
    /// Returns the number of rows having a negative number in at least one of the columns.
    #[instrument(skip(self, columns), fields(n_columns = columns.len()))]
    pub fn clip_negative(&mut self, columns: &[String]) -> Result<usize, Error> {
        let indices: Vec<usize> =
            columns.iter().map(|column| self.column_index(column)).collect::<Result<_, _>>()?;
        let mut n_clipped = 0;
        for row in &mut self.rows {
            let mut is_clipped = false;
            for &index in &indices {
                if row[index].as_number().is_some_and(|number| number < 0.0) {
                    row[index] = Scalar::Number(0.0);
                    is_clipped = true;
                }
            }
            n_clipped += usize::from(is_clipped);
        }
        info!(n_clipped, "clipped the negative values");
        Ok(n_clipped)
    }

    /// Keep the rows whose number in the column lies within the range, and return how many
    /// rows were dropped. Rows without a number in the column are dropped as well.
    pub fn retain_within(
        &mut self,
        column: &str,
        range: &RangeInclusive<f64>,
    ) -> Result<usize, Error> {
        let index = self.column_index(column)?;
        let n_rows = self.rows.len();
        self.rows.retain(|row| row[index].as_number().is_some_and(|value| range.contains(&value)));
        let n_dropped = n_rows - self.rows.len();
        debug!(column, n_dropped, "filtered");
        Ok(n_dropped)
    }

    /// Reduce the numeric cells of the column, skipping text and nulls.
    pub fn reduce(&self, column: &str, reduction: Reduction) -> Result<Option<f64>, Error> {
        Ok(reduction.apply(self.numbers(column)?))
    }
}
