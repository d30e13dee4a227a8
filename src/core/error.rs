#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("time {time} of record #{index} is outside of the day [0, 1440) minutes")]
    OutOfDomain { index: usize, time: f64 },

    #[error("window must be a positive number of bins, got {0}")]
    InvalidWindow(usize),

    #[error("bin interval must be a positive number of minutes, got {0}")]
    InvalidBinInterval(u32),

    #[error("record #{index} has no `{field}` field")]
    MissingField { index: usize, field: String },

    #[error("field `{field}` of record #{index} is not a finite number: `{value}`")]
    NotNumeric { index: usize, field: String, value: String },

    #[error("the computation has been cancelled")]
    Cancelled,

    #[error("the computation has exceeded its deadline")]
    DeadlineExceeded,
}
