use thiserror::Error;

/// An error when fitting with an invalid hyperparameter
#[derive(Error, Debug)]
pub enum BatchKMeansParamsError {
    #[error("n_centroids cannot be 0")]
    NCentroids,
    #[error("n_iterations cannot be 0")]
    NIterations,
    #[error("batch_size cannot be 0")]
    BatchSize,
    #[error("initialization scale must be strictly positive and finite")]
    InitScale,
    #[error("precomputed initialization has {found} centroids, expected {expected}")]
    PrecomputedCentroids { expected: usize, found: usize },
}

/// An error when modeling a batched K-means
///
/// Empty clusters are not an error: a centroid which receives no patch during an iteration is
/// reset to the zero vector and training goes on.
#[derive(Error, Debug)]
pub enum BatchKMeansError {
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] BatchKMeansParamsError),
    #[error(transparent)]
    UflError(#[from] ufl::error::Error),
}
