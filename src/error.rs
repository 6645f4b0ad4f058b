//! Error types shared by the ufl crates
//!

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("patch size {rf_size} exceeds the image bounds ({height}x{width})")]
    InvalidDimension {
        rf_size: usize,
        height: usize,
        width: usize,
    },
    #[error("record of length {found} does not match the declared dimension of length {expected}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("not enough samples")]
    NotEnoughSamples,
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
}
