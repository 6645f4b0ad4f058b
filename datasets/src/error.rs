//! Error definitions for dataset loading
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("cannot read dataset: {0}")]
    Io(#[from] std::io::Error),
    /// The buffer does not contain a whole number of records
    #[error("truncated batch: {len} bytes is not a multiple of the {record_len} bytes record")]
    Truncated { len: usize, record_len: usize },
    #[error("invalid label {label} in record {record}")]
    InvalidLabel { record: usize, label: u8 },
    #[error(transparent)]
    UflError(#[from] ufl::error::Error),
}
