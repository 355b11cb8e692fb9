/// Errors raised by aggregation operations.
///
/// Only parameter-validation problems are errors. Missing fields in
/// individual records and degenerate statistics are represented in the
/// outputs as missing values instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    #[error("confidence must lie strictly between 0 and 1 (got {0})")]
    InvalidConfidence(f64),

    #[error("bootstrap iterations must be at least 1 (got {0})")]
    InvalidIterations(usize),

    #[error("unsupported grouping field `{0}`: not present in the records")]
    UnsupportedGroupField(String),

    #[error("unsupported ordering field `{0}`: not present in the records")]
    UnknownOrderField(String),

    #[error("at least one grouping field is required")]
    EmptyGrouping,
}

pub type Result<T> = std::result::Result<T, StatsError>;
