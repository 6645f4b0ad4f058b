//! Error definitions for preprocessing
use thiserror::Error;
pub type Result<T> = std::result::Result<T, PreprocessingError>;

#[derive(Error, Debug, Clone)]
pub enum PreprocessingError {
    #[error("number of patches cannot be 0")]
    NPatches,
    #[error("receptive field size cannot be 0")]
    RfSize,
    #[error("epsilon must be strictly positive and finite")]
    Epsilon,
    #[error("not enough samples")]
    NotEnoughSamples,
    /// The eigendecomposition of the patch covariance failed. Fatal for the current run, retry
    /// with a different `eps_zca` if desired.
    #[error("covariance matrix cannot be decomposed: {0}")]
    SingularCovariance(String),
    #[error(transparent)]
    UflError(#[from] ufl::error::Error),
}
