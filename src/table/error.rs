#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("expected {expected} column names, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("column names cannot be empty")]
    EmptyColumnName,

    #[error("duplicate column name `{0}`")]
    DuplicateColumnName(String),

    #[error("there is no column `{0}`")]
    UnknownColumn(String),

    #[error("cannot parse `{value}` from column `{column}` with format `{format}`")]
    TimeFormat { column: String, value: String, format: String },

    #[error("percentile must be within [0, 1], got {0}")]
    InvalidQuantile(f64),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
