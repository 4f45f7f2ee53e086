//! Errors raised while loading a donation dataset

use thiserror::Error;

/// Failure to turn a CSV source into donation records.
///
/// Aggregation itself never fails; every variant here comes from the
/// loading stage in [`crate::data`].
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    /// A `designated_value` cell that is not a finite number.
    #[error("Invalid designated_value on row {row}: {value:?}")]
    DataFormat { row: usize, value: String },
}

/// Result type for dataset loading
pub type DataResult<T> = std::result::Result<T, DataError>;
