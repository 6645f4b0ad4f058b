use std::ops::Range;

use crate::k_means::{BatchKMeansParams, BatchKMeansValidParams, BatchWindow};
use crate::BatchKMeansError;
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use tracing::{debug, info};
use ufl::traits::{Fit, Predict};
use ufl::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Batched K-means learns a dictionary of `n_centroids` visual words from a set of whitened
/// patches.
///
/// ## Algorithm
///
/// The centroids are drawn from a scaled standard normal distribution (or given explicitly) and
/// refined for a fixed number of iterations. There is no convergence check.
///
/// Every iteration starts by computing `c2 = 0.5 * ||c||²` for each centroid. Patches are then
/// processed in batches: a patch `x` is assigned to the centroid maximising `x·c - c2`, which is
/// the centroid closest to `x` in euclidean distance. Ties go to the lowest centroid index. The
/// sum and the count of the assigned patches are accumulated per centroid and the iteration loss
/// grows by `0.5 * ||x||² - max(x·c - c2)`, half the squared distance to the winning centroid.
///
/// At the end of the iteration every centroid becomes the mean of its assigned patches. A
/// centroid which received no patch is reset to the zero vector, so a dictionary can contain
/// zero rows but never NaN.
///
/// ## Batch window
///
/// With [`BatchWindow::FirstBatch`] (the default) only the first `min(batch_size, n_patches)`
/// patches take part in training. [`BatchWindow::FullPass`] visits every batch of the patch set
/// in every iteration.
///
/// ## Example
///
/// ```
/// use ufl::traits::{Fit, Predict};
/// use ufl_clustering::{BatchKMeans, BatchWindow};
/// use ndarray::array;
///
/// let patches = array![[1., 0.], [2., 0.], [-1., 5.], [0., 5.]];
/// let model = BatchKMeans::params(2)
///     .n_iterations(10)
///     .batch_window(BatchWindow::FullPass)
///     .fit(&patches)
///     .unwrap();
///
/// assert_eq!(model.centroids().dim(), (2, 2));
/// let labels = model.predict(&patches);
/// assert_eq!(labels[0], labels[1]);
/// ```
pub struct BatchKMeans<F: Float> {
    centroids: Array2<F>,
    cluster_count: Array1<usize>,
    loss: F,
}

impl<F: Float> BatchKMeans<F> {
    pub fn params(n_centroids: usize) -> BatchKMeansParams<F, Xoshiro256Plus> {
        BatchKMeansParams::new(n_centroids, Xoshiro256Plus::seed_from_u64(42))
    }

    pub fn params_with_rng<R: Rng>(n_centroids: usize, rng: R) -> BatchKMeansParams<F, R> {
        BatchKMeansParams::new(n_centroids, rng)
    }

    /// Return the set of centroids as a 2-dimensional matrix with shape
    /// `(n_centroids, n_features)`.
    pub fn centroids(&self) -> &Array2<F> {
        &self.centroids
    }

    /// Consume the model and return its centroids
    pub fn into_centroids(self) -> Array2<F> {
        self.centroids
    }

    /// Return the number of patches assigned to each centroid during the last iteration
    pub fn cluster_count(&self) -> &Array1<usize> {
        &self.cluster_count
    }

    /// Return the loss accumulated during the last iteration
    pub fn loss(&self) -> F {
        self.loss
    }
}

impl<F: Float, R: Rng + Clone, DA: Data<Elem = F>> Fit<ArrayBase<DA, Ix2>, BatchKMeansError>
    for BatchKMeansValidParams<F, R>
{
    type Object = BatchKMeans<F>;

    /// Given a patch matrix with shape `(n_patches, n_features)`, `fit` refines `n_centroids`
    /// centroids for exactly `n_iterations` iterations.
    fn fit(&self, patches: &ArrayBase<DA, Ix2>) -> Result<Self::Object, BatchKMeansError> {
        let (n_patches, n_features) = patches.dim();
        if n_patches == 0 {
            return Err(ufl::error::Error::NotEnoughSamples.into());
        }

        let mut rng = self.rng().clone();
        let mut centroids = self
            .init_method()
            .run(self.n_centroids(), n_features, &mut rng)?;

        let windows = batch_windows(n_patches, self.batch_size(), self.batch_window());
        info!(
            n_patches,
            n_features,
            n_centroids = self.n_centroids(),
            n_batches = windows.len(),
            "training batched k-means"
        );

        let half = F::cast(0.5);
        let x2 = patches.map_axis(Axis(1), |x| x.dot(&x));

        let mut cluster_count = Array1::zeros(self.n_centroids());
        let mut loss = F::zero();
        for iteration in 0..self.n_iterations() {
            let c2 = centroids.map_axis(Axis(1), |c| c.dot(&c) * half);
            let mut sums = Array2::zeros(centroids.dim());
            cluster_count.fill(0);
            loss = F::zero();

            for window in &windows {
                let batch = patches.slice(s![window.clone(), ..]);
                let mut scores = batch.dot(&centroids.t());
                scores -= &c2;

                let assigned = scores.outer_iter().zip(batch.outer_iter());
                for (offset, (score, patch)) in assigned.enumerate() {
                    let (label, best) = best_centroid(score);
                    loss += half * x2[window.start + offset] - best;

                    let mut sum = sums.row_mut(label);
                    sum += &patch;
                    cluster_count[label] += 1;
                }
            }

            let n_empty = update_centroids(&mut centroids, &sums, &cluster_count);
            debug!(iteration, loss = ?loss, n_empty, "k-means iteration");
        }

        Ok(BatchKMeans {
            centroids,
            cluster_count,
            loss,
        })
    }
}

impl<F: Float, DA: Data<Elem = F>> Predict<&ArrayBase<DA, Ix2>, Array1<usize>> for BatchKMeans<F> {
    /// Given a patch matrix with shape `(n_patches, n_features)`, return the index of the
    /// closest centroid for every patch.
    fn predict(&self, patches: &ArrayBase<DA, Ix2>) -> Array1<usize> {
        let c2 = self.half_norms();
        let mut scores = patches.dot(&self.centroids.t());
        scores -= &c2;
        scores.map_axis(Axis(1), |score| best_centroid(score).0)
    }
}

impl<F: Float, DA: Data<Elem = F>> Predict<&ArrayBase<DA, Ix1>, usize> for BatchKMeans<F> {
    /// Return the index of the closest centroid of a single patch
    fn predict(&self, patch: &ArrayBase<DA, Ix1>) -> usize {
        let mut scores = self.centroids.dot(patch);
        scores -= &self.half_norms();
        best_centroid(scores.view()).0
    }
}

impl<F: Float> BatchKMeans<F> {
    fn half_norms(&self) -> Array1<F> {
        let half = F::cast(0.5);
        self.centroids.map_axis(Axis(1), |c| c.dot(&c) * half)
    }
}

/// Learn `n_centroids` centroids from `patches` with the default batch settings.
///
/// This is a shortcut for `BatchKMeans::params_with_rng(n_centroids, rng)` followed by
/// `n_iterations(n_iterations)` and `fit`.
pub fn kmeans<F: Float, DA: Data<Elem = F>, R: Rng + Clone>(
    patches: &ArrayBase<DA, Ix2>,
    n_centroids: usize,
    n_iterations: u64,
    rng: R,
) -> Result<Array2<F>, BatchKMeansError> {
    BatchKMeans::<F>::params_with_rng(n_centroids, rng)
        .n_iterations(n_iterations)
        .fit(patches)
        .map(BatchKMeans::into_centroids)
}

/// Row ranges processed in one iteration
fn batch_windows(n_patches: usize, batch_size: usize, window: BatchWindow) -> Vec<Range<usize>> {
    match window {
        BatchWindow::FirstBatch => vec![0..batch_size.min(n_patches)],
        BatchWindow::FullPass => (0..n_patches)
            .step_by(batch_size)
            .map(|start| start..(start + batch_size).min(n_patches))
            .collect(),
    }
}

/// Index and value of the highest score, the first one wins on ties
fn best_centroid<F: Float>(scores: ArrayView1<F>) -> (usize, F) {
    let mut best = (0, scores[0]);
    for (idx, &score) in scores.iter().enumerate().skip(1) {
        if score > best.1 {
            best = (idx, score);
        }
    }
    best
}

/// Replaces every centroid by the mean of its patches and returns the number of empty clusters
fn update_centroids<F: Float>(
    centroids: &mut Array2<F>,
    sums: &Array2<F>,
    counts: &Array1<usize>,
) -> usize {
    let mut n_empty = 0;
    for ((mut centroid, sum), &count) in centroids
        .outer_iter_mut()
        .zip(sums.outer_iter())
        .zip(counts.iter())
    {
        if count == 0 {
            centroid.fill(F::zero());
            n_empty += 1;
        } else {
            let count = F::cast(count);
            centroid.zip_mut_with(&sum, |c, &s| *c = s / count);
        }
    }
    n_empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BatchKMeansInit;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::rand_distr::Normal;
    use ndarray_rand::RandomExt;

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<BatchKMeans<f64>>();
    }

    #[test]
    fn one_iteration_from_precomputed_centroids() {
        let patches = array![[1., 0.], [2., 0.], [-1., 5.], [0., 5.]];
        let init = array![[1., 0.], [0., 5.], [100., 100.]];

        let model = BatchKMeans::params(3)
            .n_iterations(1)
            .init_method(BatchKMeansInit::Precomputed(init))
            .fit(&patches)
            .unwrap();

        assert_abs_diff_eq!(
            model.centroids(),
            &array![[1.5, 0.], [-0.5, 5.], [0., 0.]],
            epsilon = 1e-12
        );
        assert_eq!(model.cluster_count(), &array![2, 2, 0]);
        assert_abs_diff_eq!(model.loss(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn identical_patches_collapse_on_one_centroid() {
        let patches = Array2::from_shape_fn((10, 3), |(_, j)| (j + 1) as f64);
        let centroids = kmeans(&patches, 3, 5, Xoshiro256Plus::seed_from_u64(3)).unwrap();

        let patch = array![1., 2., 3.];
        let mut matching = 0;
        for centroid in centroids.outer_iter() {
            if centroid == patch {
                matching += 1;
            } else {
                assert_eq!(centroid, Array1::<f64>::zeros(3));
            }
        }
        assert_eq!(matching, 1);
    }

    #[test]
    fn empty_clusters_are_zero_not_nan() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let patches = Array::random_using((20, 8), Normal::new(0f64, 1.).unwrap(), &mut rng);

        let model = BatchKMeans::params_with_rng(50, rng)
            .n_iterations(3)
            .fit(&patches)
            .unwrap();

        assert!(model.centroids().iter().all(|v| v.is_finite()));
        assert!(model.loss().is_finite());
        assert_eq!(model.cluster_count().sum(), 20);
        let zero_rows = model
            .centroids()
            .outer_iter()
            .filter(|c| c.iter().all(|&v| v == 0.))
            .count();
        assert!(zero_rows >= 30);
    }

    #[test]
    fn ties_go_to_the_lowest_index() {
        let patches = array![[1., 1.], [2., -1.]];
        let init = array![[0.5, 0.5], [0.5, 0.5]];

        let model = BatchKMeans::params(2)
            .n_iterations(1)
            .init_method(BatchKMeansInit::Precomputed(init))
            .fit(&patches)
            .unwrap();

        assert_eq!(model.cluster_count(), &array![2, 0]);
        assert_abs_diff_eq!(
            model.centroids(),
            &array![[1.5, 0.], [0., 0.]],
            epsilon = 1e-12
        );
        assert_eq!(best_centroid(array![3., 5., 5.].view()), (1, 5.));
    }

    #[test]
    fn first_batch_ignores_trailing_patches() {
        let mut rng = Xoshiro256Plus::seed_from_u64(11);
        let patches = Array::random_using((1500, 4), Normal::new(0f64, 1.).unwrap(), &mut rng);

        let first = BatchKMeans::params(5)
            .n_iterations(1)
            .fit(&patches)
            .unwrap();
        assert_eq!(first.cluster_count().sum(), 1000);

        let full = BatchKMeans::params(5)
            .n_iterations(1)
            .batch_window(BatchWindow::FullPass)
            .fit(&patches)
            .unwrap();
        assert_eq!(full.cluster_count().sum(), 1500);

        // changing a patch outside the first batch does not change the result
        let mut altered = patches.clone();
        altered.row_mut(1200).fill(1e3);
        let altered = BatchKMeans::params(5)
            .n_iterations(1)
            .fit(&altered)
            .unwrap();
        assert_eq!(altered.centroids(), first.centroids());
    }

    #[test]
    fn small_patch_sets_use_a_single_short_batch() {
        assert_eq!(batch_windows(10, 1000, BatchWindow::FirstBatch), vec![0..10]);
        assert_eq!(batch_windows(2500, 1000, BatchWindow::FirstBatch), vec![0..1000]);
        assert_eq!(
            batch_windows(2500, 1000, BatchWindow::FullPass),
            vec![0..1000, 1000..2000, 2000..2500]
        );
        assert_eq!(batch_windows(1000, 1000, BatchWindow::FullPass), vec![0..1000]);
    }

    #[test]
    fn empty_patch_set_is_rejected() {
        let patches = Array2::<f64>::zeros((0, 4));
        let res = BatchKMeans::params(2).fit(&patches);
        assert!(matches!(
            res,
            Err(BatchKMeansError::UflError(ufl::error::Error::NotEnoughSamples))
        ));
    }

    #[test]
    fn invalid_params_are_reported_by_fit() {
        let patches = Array2::<f64>::zeros((4, 2));
        let res = BatchKMeans::params(0).fit(&patches);
        assert!(matches!(res, Err(BatchKMeansError::InvalidParams(_))));
    }

    #[test]
    fn predict_returns_closest_centroid() {
        let patches = array![[1., 0.], [2., 0.], [-1., 5.], [0., 5.]];
        let init = array![[1., 0.], [0., 5.]];
        let model = BatchKMeans::params(2)
            .n_iterations(2)
            .init_method(BatchKMeansInit::Precomputed(init))
            .fit(&patches)
            .unwrap();

        assert_eq!(model.predict(&patches), array![0, 0, 1, 1]);
        assert_eq!(model.predict(&array![-3., 4.]), 1);
        assert_eq!(model.predict(&array![10., -1.]), 0);
    }

    #[test]
    fn same_seed_same_dictionary() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        let patches = Array::random_using((300, 6), Normal::new(0f64, 1.).unwrap(), &mut rng);

        let a = kmeans(&patches, 8, 4, Xoshiro256Plus::seed_from_u64(1)).unwrap();
        let b = kmeans(&patches, 8, 4, Xoshiro256Plus::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }
}
