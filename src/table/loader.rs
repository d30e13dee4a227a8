use std::{fs::File, io, path::Path};

use bon::Builder;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexSet;
use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::table::{Error, Scalar, Table};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Semicolon => b';',
            Self::Tab => b'\t',
        }
    }
}

#[derive(Builder)]
#[must_use]
pub struct LoadOptions {
    #[builder(default)]
    delimiter: Delimiter,

    /// Whether the first line holds the column names.
    #[builder(default = true)]
    has_header: bool,

    /// Names to assign to the columns, replacing the header if there is one.
    column_names: Option<Vec<String>>,
}

impl LoadOptions {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_path(&self, path: &Path) -> Result<Table, Error> {
        let table = self.load(File::open(path).map_err(csv::Error::from)?)?;
        info!(n_rows = table.len(), "loaded the records");
        Ok(table)
    }

    pub fn load<R: io::Read>(&self, reader: R) -> Result<Table, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter.as_byte())
            .has_headers(self.has_header)
            .trim(csv::Trim::All)
            .from_reader(reader);

        // Without a header, this is the first record, which is still yielded by `records()`:
        let header = reader.headers()?.clone();
        let rows: Vec<Vec<Scalar>> = reader
            .records()
            .map_ok(|record| record.iter().map(Scalar::parse).collect())
            .collect::<Result<_, _>>()?;

        let columns = match &self.column_names {
            Some(column_names) => validate_column_names(column_names, header.len())?,
            None if self.has_header => {
                validate_column_names(&header.iter().collect_vec(), header.len())?
            }
            None => (0..header.len()).map(|index| index.to_string()).collect(),
        };
        let table = Table::new(columns, rows);
        debug!(columns = %table.columns().join(", "), n_rows = table.len(), "parsed");
        Ok(table)
    }
}

/// Check the names against the column count.
///
/// Surrounding whitespace and quote characters are stripped.
fn validate_column_names<S: AsRef<str>>(
    names: &[S],
    n_columns: usize,
) -> Result<IndexSet<String>, Error> {
    if names.len() != n_columns {
        return Err(Error::ColumnCountMismatch { expected: n_columns, actual: names.len() });
    }
    let mut columns = IndexSet::with_capacity(n_columns);
    for name in names {
        let name = name.as_ref().trim().replace(['"', '\''], "");
        if name.is_empty() {
            return Err(Error::EmptyColumnName);
        }
        if columns.contains(&name) {
            return Err(Error::DuplicateColumnName(name));
        }
        columns.insert(name);
    }
    Ok(columns)
}

impl Table {
    /// Replace textual times in the column with minutes since midnight.
    ///
    /// The format is tried as a full date and time first, then as a time of day.
    /// Numeric cells are taken as minutes already and are left intact.
    pub fn convert_clock_column(&mut self, column: &str, format: &str) -> Result<(), Error> {
        let index = self.column_index(column)?;
        let mut n_converted = 0_usize;
        for row in &mut self.rows {
            if let Scalar::Text(text) = &row[index] {
                let minutes = parse_minutes_since_midnight(text, format).ok_or_else(|| {
                    Error::TimeFormat {
                        column: column.to_owned(),
                        value: text.clone(),
                        format: format.to_owned(),
                    }
                })?;
                row[index] = Scalar::Number(minutes);
                n_converted += 1;
            }
        }
        debug!(column, n_converted, "converted clock times");
        Ok(())
    }
}

fn parse_minutes_since_midnight(text: &str, format: &str) -> Option<f64> {
    let time = NaiveDateTime::parse_from_str(text, format)
        .map(|date_time| date_time.time())
        .or_else(|_| NaiveTime::parse_from_str(text, format))
        .ok()?;
    Some(f64::from(time.num_seconds_from_midnight()) / 60.0)
}
