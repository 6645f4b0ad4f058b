use ndarray::Array2;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use ufl::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::errors::BatchKMeansError;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Specifies centroid initialization algorithm for batched K-means.
pub enum BatchKMeansInit<F: Float> {
    /// Draw every coordinate from a standard normal distribution and multiply it by the given
    /// scale. Whitened patches have unit variance, a small scale keeps the initial centroids
    /// close to the origin.
    Gaussian(F),
    /// Use the given centroids, with shape `(n_centroids, n_features)`.
    Precomputed(Array2<F>),
}

impl<F: Float> Default for BatchKMeansInit<F> {
    fn default() -> Self {
        BatchKMeansInit::Gaussian(F::cast(0.1))
    }
}

impl<F: Float> BatchKMeansInit<F> {
    /// Runs the chosen initialization routine
    pub(crate) fn run<R: Rng + ?Sized>(
        &self,
        n_centroids: usize,
        n_features: usize,
        rng: &mut R,
    ) -> Result<Array2<F>, BatchKMeansError> {
        match self {
            Self::Gaussian(scale) => {
                let noise: Array2<f64> =
                    Array2::random_using((n_centroids, n_features), StandardNormal, rng);
                Ok(noise.mapv(|v| F::cast(v) * *scale))
            }
            Self::Precomputed(centroids) => {
                if centroids.ncols() != n_features {
                    return Err(ufl::error::Error::ShapeMismatch {
                        expected: n_features,
                        found: centroids.ncols(),
                    }
                    .into());
                }
                Ok(centroids.clone())
            }
        }
    }
}
