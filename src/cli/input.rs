//! Records file CLI arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::{
    prelude::*,
    table::{Delimiter, LoadOptions, Table},
};

#[must_use]
#[derive(Parser)]
pub struct InputArgs {
    /// Delimited records file.
    #[clap(env = "FLOWPEAK_INPUT")]
    pub path: PathBuf,

    #[clap(long, value_enum, default_value_t, env = "FLOWPEAK_DELIMITER")]
    pub delimiter: Delimiter,

    /// The first line is a record, not the column names.
    #[clap(long, env = "FLOWPEAK_NO_HEADER")]
    pub no_header: bool,

    /// Comma-separated names to assign to the columns, replacing the header if any.
    #[clap(long, value_delimiter = ',', env = "FLOWPEAK_COLUMN_NAMES")]
    pub column_names: Option<Vec<String>>,
}

impl InputArgs {
    pub fn load(&self) -> Result<Table> {
        LoadOptions::builder()
            .delimiter(self.delimiter)
            .has_header(!self.no_header)
            .maybe_column_names(self.column_names.clone())
            .build()
            .load_path(&self.path)
            .with_context(|| format!("failed to load `{}`", self.path.display()))
    }
}

/// Optional conversion of a textual clock column into minutes since midnight.
#[must_use]
#[derive(Parser)]
pub struct TimeFormatArgs {
    /// `chrono` format of textual times, for example `%m/%d/%Y %H:%M` or `%H:%M`.
    #[clap(long, env = "FLOWPEAK_TIME_FORMAT")]
    pub time_format: Option<String>,
}

impl TimeFormatArgs {
    pub fn convert(&self, table: &mut Table, column: &str) -> Result {
        if let Some(time_format) = &self.time_format {
            table.convert_clock_column(column, time_format)?;
        }
        Ok(())
    }
}
