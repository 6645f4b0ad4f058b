//! Error definitions for dictionary learning and feature extraction
use thiserror::Error;
use ufl::ImageDim;
use ufl_clustering::{BatchKMeansError, BatchKMeansParamsError};
use ufl_preprocessing::PreprocessingError;

pub type Result<T> = std::result::Result<T, FeatureError>;

#[derive(Error, Debug)]
pub enum FeatureError {
    /// The images or the stored transform do not have the shape the dictionary was learned with
    #[error("dictionary expects {expected}, found {found}")]
    MismatchedDictionary { expected: String, found: String },
    #[error("stride cannot be 0")]
    Stride,
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),
    #[error(transparent)]
    Clustering(#[from] BatchKMeansError),
    #[error(transparent)]
    ClusteringParams(#[from] BatchKMeansParamsError),
    #[error(transparent)]
    UflError(#[from] ufl::error::Error),
}

impl FeatureError {
    pub(crate) fn mismatched_dim(expected: ImageDim, found: ImageDim) -> Self {
        FeatureError::MismatchedDictionary {
            expected: format!("images of shape {}", expected),
            found: format!("images of shape {}", found),
        }
    }

    pub(crate) fn mismatched_len(what: &str, expected: usize, found: usize) -> Self {
        FeatureError::MismatchedDictionary {
            expected: format!("{} of length {}", what, expected),
            found: format!("length {}", found),
        }
    }
}
