//! Dictionary learning pipeline
//!
//! A dictionary is learned in four steps, each one feeding the next:
//!
//! 1. `n_patches` random patches are cropped from the images;
//! 2. every patch is contrast-normalized with `eps_norm`;
//! 3. the patch set is ZCA-whitened with `eps_zca`;
//! 4. batched K-means groups the whitened patches into `n_centroids` centroids.
//!
//! The same random generator drives the patch offsets and then the centroid initialization,
//! so a seeded generator reproduces the whole dictionary.
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use tracing::info;
use ufl::traits::Fit;
use ufl::{Float, ImageSet, ParamGuard};
use ufl_clustering::{BatchKMeans, BatchKMeansParamsError, BatchWindow};
use ufl_preprocessing::{
    extract_random_patches, pre_process, whiten, FittedWhitener, PreprocessingError,
};

use crate::dictionary::PatchDictionary;
use crate::error::{FeatureError, Result};

/// Learns a [`PatchDictionary`] from an [`ImageSet`]
///
/// ```
/// use ndarray::Array2;
/// use ndarray_rand::{rand_distr::Uniform, RandomExt};
/// use ufl::{traits::Fit, ImageSet};
/// use ufl_features::DictionaryLearner;
///
/// let records = Array2::random((20, 8 * 8 * 3), Uniform::new(0., 255.));
/// let images = ImageSet::new(records, [8, 8, 3]).unwrap();
///
/// let dictionary = DictionaryLearner::params(500, 4, 10)
///     .n_iterations(5)
///     .fit(&images)
///     .unwrap();
/// assert_eq!(dictionary.centroids().dim(), (10, 4 * 4 * 3));
/// ```
pub struct DictionaryLearner;

impl DictionaryLearner {
    /// Defaults: `eps_norm = 10`, `eps_zca = 0.01`, `n_iterations = 50`, first batch window and
    /// a `Xoshiro256Plus` generator seeded with 42
    pub fn params<F: Float>(
        n_patches: usize,
        rf_size: usize,
        n_centroids: usize,
    ) -> DictionaryLearnerParams<F, Xoshiro256Plus> {
        Self::params_with_rng(
            n_patches,
            rf_size,
            n_centroids,
            Xoshiro256Plus::seed_from_u64(42),
        )
    }

    pub fn params_with_rng<F: Float, R: Rng>(
        n_patches: usize,
        rf_size: usize,
        n_centroids: usize,
        rng: R,
    ) -> DictionaryLearnerParams<F, R> {
        DictionaryLearnerParams(DictionaryLearnerValidParams {
            n_patches,
            rf_size,
            n_centroids,
            eps_norm: F::cast(10.),
            eps_zca: F::cast(0.01),
            n_iterations: 50,
            batch_window: BatchWindow::FirstBatch,
            rng,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DictionaryLearnerValidParams<F, R> {
    n_patches: usize,
    rf_size: usize,
    n_centroids: usize,
    eps_norm: F,
    eps_zca: F,
    n_iterations: u64,
    batch_window: BatchWindow,
    rng: R,
}

impl<F: Float, R> DictionaryLearnerValidParams<F, R> {
    pub fn n_patches(&self) -> usize {
        self.n_patches
    }

    pub fn rf_size(&self) -> usize {
        self.rf_size
    }

    pub fn n_centroids(&self) -> usize {
        self.n_centroids
    }

    /// Variance offset of the per-patch contrast normalization
    pub fn eps_norm(&self) -> F {
        self.eps_norm
    }

    /// Regularization added to the covariance eigenvalues before whitening
    pub fn eps_zca(&self) -> F {
        self.eps_zca
    }

    pub fn n_iterations(&self) -> u64 {
        self.n_iterations
    }

    pub fn batch_window(&self) -> BatchWindow {
        self.batch_window
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DictionaryLearnerParams<F, R>(DictionaryLearnerValidParams<F, R>);

impl<F: Float, R: Rng> DictionaryLearnerParams<F, R> {
    pub fn eps_norm(mut self, eps_norm: F) -> Self {
        self.0.eps_norm = eps_norm;
        self
    }

    pub fn eps_zca(mut self, eps_zca: F) -> Self {
        self.0.eps_zca = eps_zca;
        self
    }

    pub fn n_iterations(mut self, n_iterations: u64) -> Self {
        self.0.n_iterations = n_iterations;
        self
    }

    pub fn batch_window(mut self, batch_window: BatchWindow) -> Self {
        self.0.batch_window = batch_window;
        self
    }

    pub fn with_rng<R2: Rng>(self, rng: R2) -> DictionaryLearnerParams<F, R2> {
        let DictionaryLearnerValidParams {
            n_patches,
            rf_size,
            n_centroids,
            eps_norm,
            eps_zca,
            n_iterations,
            batch_window,
            ..
        } = self.0;
        DictionaryLearnerParams(DictionaryLearnerValidParams {
            n_patches,
            rf_size,
            n_centroids,
            eps_norm,
            eps_zca,
            n_iterations,
            batch_window,
            rng,
        })
    }
}

impl<F: Float, R> ParamGuard for DictionaryLearnerParams<F, R> {
    type Checked = DictionaryLearnerValidParams<F, R>;
    type Error = FeatureError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let valid_eps = |eps: F| eps > F::zero() && eps.is_finite();
        if self.0.n_patches == 0 {
            Err(PreprocessingError::NPatches.into())
        } else if self.0.rf_size == 0 {
            Err(PreprocessingError::RfSize.into())
        } else if !valid_eps(self.0.eps_norm) || !valid_eps(self.0.eps_zca) {
            Err(PreprocessingError::Epsilon.into())
        } else if self.0.n_centroids == 0 {
            Err(BatchKMeansParamsError::NCentroids.into())
        } else if self.0.n_iterations == 0 {
            Err(BatchKMeansParamsError::NIterations.into())
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng + Clone> Fit<ImageSet<F>, FeatureError>
    for DictionaryLearnerValidParams<F, R>
{
    type Object = PatchDictionary<F>;

    fn fit(&self, images: &ImageSet<F>) -> Result<Self::Object> {
        let mut rng = self.rng.clone();
        info!(
            n_images = images.nimages(),
            dim = %images.dim(),
            n_patches = self.n_patches,
            rf_size = self.rf_size,
            n_centroids = self.n_centroids,
            "learning patch dictionary"
        );

        let patches = extract_random_patches(images, self.n_patches, self.rf_size, &mut rng)?;
        let patches = pre_process(patches, self.eps_norm)?;
        let (whitened, mean, transformation_matrix) = whiten(&patches, self.eps_zca)?;

        let model = BatchKMeans::params_with_rng(self.n_centroids, rng)
            .n_iterations(self.n_iterations)
            .batch_window(self.batch_window)
            .fit(&whitened)?;
        info!(loss = ?model.loss(), "dictionary learned");

        PatchDictionary::new(
            self.rf_size,
            images.dim(),
            self.eps_norm,
            FittedWhitener::new(mean, transformation_matrix)?,
            model.into_centroids(),
        )
    }
}
