use crate::BatchKMeansParamsError;

use super::init::BatchKMeansInit;
use ndarray_rand::rand::Rng;
use ufl::{Float, ParamGuard};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Which part of the patch set takes part in an iteration
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchWindow {
    /// Only the first batch, patches `[0, min(batch_size, n_patches))`, is assigned and
    /// accumulated in every iteration. The remaining patches never influence the centroids.
    FirstBatch,
    /// Every batch of the patch set is visited in every iteration.
    FullPass,
}

impl Default for BatchWindow {
    fn default() -> Self {
        BatchWindow::FirstBatch
    }
}

#[derive(Clone, Debug, PartialEq)]
/// The set of hyperparameters that can be specified for the execution of
/// the [batched K-means algorithm](crate::BatchKMeans).
pub struct BatchKMeansValidParams<F: Float, R: Rng> {
    /// The number of centroids of the learned dictionary.
    n_centroids: usize,
    /// The exact number of training iterations. There is no convergence check.
    n_iterations: u64,
    /// Number of patches assigned together in one update step.
    batch_size: usize,
    /// Batches visited in every iteration.
    batch_window: BatchWindow,
    /// The initialization strategy used to initialize the centroids.
    init: BatchKMeansInit<F>,
    /// The random number generator
    rng: R,
}

#[derive(Clone, Debug, PartialEq)]
/// A helper struct used to construct a set of [valid hyperparameters](BatchKMeansValidParams)
/// for the [batched K-means algorithm](crate::BatchKMeans) (using the builder pattern).
pub struct BatchKMeansParams<F: Float, R: Rng>(BatchKMeansValidParams<F, R>);

impl<F: Float, R: Rng> BatchKMeansParams<F, R> {
    /// `new` lets us configure our training algorithm parameters:
    /// * we will be looking for `n_centroids` in the training patches;
    /// * the centroids are refined exactly `n_iterations` times;
    /// * every update step assigns `batch_size` patches.
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `n_iterations = 50`
    /// * `batch_size = 1000`
    /// * `batch_window = FirstBatch`
    /// * `init = Gaussian(0.1)`
    pub fn new(n_centroids: usize, rng: R) -> Self {
        Self(BatchKMeansValidParams {
            n_centroids,
            n_iterations: 50,
            batch_size: 1000,
            batch_window: BatchWindow::default(),
            init: BatchKMeansInit::default(),
            rng,
        })
    }

    /// Change the value of `n_iterations`
    pub fn n_iterations(mut self, n_iterations: u64) -> Self {
        self.0.n_iterations = n_iterations;
        self
    }

    /// Change the value of `batch_size`
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.0.batch_size = batch_size;
        self
    }

    /// Change the batches visited in every iteration
    pub fn batch_window(mut self, batch_window: BatchWindow) -> Self {
        self.0.batch_window = batch_window;
        self
    }

    /// Change the value of `init`
    pub fn init_method(mut self, init: BatchKMeansInit<F>) -> Self {
        self.0.init = init;
        self
    }
}

impl<F: Float, R: Rng> ParamGuard for BatchKMeansParams<F, R> {
    type Checked = BatchKMeansValidParams<F, R>;
    type Error = BatchKMeansParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.n_centroids == 0 {
            return Err(BatchKMeansParamsError::NCentroids);
        } else if self.0.n_iterations == 0 {
            return Err(BatchKMeansParamsError::NIterations);
        } else if self.0.batch_size == 0 {
            return Err(BatchKMeansParamsError::BatchSize);
        }

        match &self.0.init {
            BatchKMeansInit::Gaussian(scale) if !(*scale > F::zero() && scale.is_finite()) => {
                Err(BatchKMeansParamsError::InitScale)
            }
            BatchKMeansInit::Precomputed(centroids) if centroids.nrows() != self.0.n_centroids => {
                Err(BatchKMeansParamsError::PrecomputedCentroids {
                    expected: self.0.n_centroids,
                    found: centroids.nrows(),
                })
            }
            _ => Ok(&self.0),
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng> BatchKMeansValidParams<F, R> {
    /// The number of centroids of the learned dictionary.
    pub fn n_centroids(&self) -> usize {
        self.n_centroids
    }

    /// The exact number of training iterations.
    pub fn n_iterations(&self) -> u64 {
        self.n_iterations
    }

    /// Number of patches assigned together in one update step.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Batches visited in every iteration.
    pub fn batch_window(&self) -> BatchWindow {
        self.batch_window
    }

    /// Cluster initialization strategy
    pub fn init_method(&self) -> &BatchKMeansInit<F> {
        &self.init
    }

    /// Returns the random generator
    pub fn rng(&self) -> &R {
        &self.rng
    }
}
