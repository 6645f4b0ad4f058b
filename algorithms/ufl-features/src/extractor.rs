//! Dense feature extraction
//!
//! An image is encoded by sliding a `rf_size × rf_size` window over it with a fixed stride. Every
//! window goes through the same contrast normalization and whitening the dictionary was learned
//! with, is encoded against the centroids and the encodings are sum-pooled over the image.
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView3, Axis};
use tracing::{debug, info};
use ufl::traits::Transformer;
use ufl::{Float, ImageSet, ParamGuard};
use ufl_preprocessing::pre_process;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dictionary::PatchDictionary;
use crate::error::{FeatureError, Result};

/// How a whitened patch is encoded against the centroids
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// One-hot vector on the centroid with the highest `x·c - 0.5 * ||c||²` score, which is the
    /// closest centroid. Ties go to the lowest index.
    Hard,
    /// Soft "triangle" assignment `f_k = max(0, mean(z) - z_k)` where `z_k` is the euclidean
    /// distance to centroid `k`. Centroids further than average get a zero activation.
    Triangle,
}

/// How patch encodings are summed over the image
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pooling {
    /// Sum over each of the four spatial quadrants, `4 * n_centroids` features ordered top-left,
    /// top-right, bottom-left, bottom-right
    Quadrant,
    /// Sum over the whole image, `n_centroids` features
    Global,
}

/// Checked feature extraction settings bound to a dictionary
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureExtractor<F: Float> {
    dictionary: PatchDictionary<F>,
    encoding: Encoding,
    pooling: Pooling,
    stride: usize,
}

/// Builder for a [`FeatureExtractor`]
///
/// Defaults are triangle encoding, quadrant pooling and a stride of 1.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureExtractorParams<F: Float>(FeatureExtractor<F>);

impl<F: Float> FeatureExtractor<F> {
    pub fn params(dictionary: PatchDictionary<F>) -> FeatureExtractorParams<F> {
        FeatureExtractorParams(FeatureExtractor {
            dictionary,
            encoding: Encoding::Triangle,
            pooling: Pooling::Quadrant,
            stride: 1,
        })
    }

    pub fn dictionary(&self) -> &PatchDictionary<F> {
        &self.dictionary
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn pooling(&self) -> Pooling {
        self.pooling
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Length of the feature vector of one image
    pub fn n_features(&self) -> usize {
        let n_centroids = self.dictionary.n_centroids();
        match self.pooling {
            Pooling::Quadrant => 4 * n_centroids,
            Pooling::Global => n_centroids,
        }
    }

    /// Encodes every image of `images`, returning a `(n_images, n_features)` matrix
    ///
    /// Fails with `MismatchedDictionary` if the images do not have the shape the dictionary
    /// was learned from.
    pub fn extract(&self, images: &ImageSet<F>) -> Result<Array2<F>> {
        let expected = self.dictionary.dim();
        if images.dim() != expected {
            return Err(FeatureError::mismatched_dim(expected, images.dim()));
        }
        info!(
            n_images = images.nimages(),
            n_features = self.n_features(),
            "extracting features"
        );

        let mut features = Array2::zeros((images.nimages(), self.n_features()));
        for (idx, mut row) in features.outer_iter_mut().enumerate() {
            let encoded = self.extract_image(images.image(idx)?)?;
            row.assign(&encoded);
        }
        Ok(features)
    }

    /// Encodes a single `(height, width, channels)` image
    pub fn extract_image(&self, image: ArrayView3<F>) -> Result<Array1<F>> {
        let expected = self.dictionary.dim();
        if image.dim() != expected.shape() {
            let (height, width, channels) = image.dim();
            return Err(FeatureError::mismatched_dim(
                expected,
                [height, width, channels].into(),
            ));
        }

        let (patches, grid) = dense_patches(image, self.dictionary.rf_size(), self.stride);
        let patches = pre_process(patches, self.dictionary.eps_norm())?;
        let whitened = self.dictionary.whitener().transform(patches);
        let codes = self.encode(&whitened);
        debug!(n_positions = codes.nrows(), "image encoded");

        Ok(self.pool(&codes, grid))
    }

    /// `(n_patches, n_centroids)` activations of whitened patches
    fn encode(&self, patches: &Array2<F>) -> Array2<F> {
        let centroids = self.dictionary.centroids();
        let half = F::cast(0.5);
        let c2 = centroids.map_axis(Axis(1), |c| c.dot(&c));
        let mut xc = patches.dot(&centroids.t());

        match self.encoding {
            Encoding::Hard => {
                let mut codes = Array2::zeros(xc.dim());
                for (score, mut code) in xc.outer_iter().zip(codes.outer_iter_mut()) {
                    code[closest(score, c2.view(), half)] = F::one();
                }
                codes
            }
            Encoding::Triangle => {
                let x2 = patches.map_axis(Axis(1), |x| x.dot(&x));
                // squared distances, clamped against rounding below zero
                for (mut row, &xx) in xc.outer_iter_mut().zip(x2.iter()) {
                    row.zip_mut_with(&c2, |d, &cc| {
                        let sq = xx - F::cast(2.) * *d + cc;
                        *d = if sq > F::zero() { sq.sqrt() } else { F::zero() };
                    });
                }
                let mean = xc
                    .mean_axis(Axis(1))
                    .unwrap_or_else(|| Array1::zeros(xc.nrows()));
                for (mut row, &mu) in xc.outer_iter_mut().zip(mean.iter()) {
                    row.mapv_inplace(|z| if z < mu { mu - z } else { F::zero() });
                }
                xc
            }
        }
    }

    fn pool(&self, codes: &Array2<F>, (n_rows, n_cols): (usize, usize)) -> Array1<F> {
        let n_centroids = codes.ncols();
        match self.pooling {
            Pooling::Global => codes.sum_axis(Axis(0)),
            Pooling::Quadrant => {
                let half_rows = (n_rows + 1) / 2;
                let half_cols = (n_cols + 1) / 2;
                let mut pooled = Array1::zeros(4 * n_centroids);
                for (pos, code) in codes.outer_iter().enumerate() {
                    let (row, col) = (pos / n_cols, pos % n_cols);
                    let quadrant =
                        2 * usize::from(row >= half_rows) + usize::from(col >= half_cols);
                    let start = quadrant * n_centroids;
                    let mut slot = pooled.slice_mut(s![start..start + n_centroids]);
                    slot += &code;
                }
                pooled
            }
        }
    }
}

impl<F: Float> FeatureExtractorParams<F> {
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.0.encoding = encoding;
        self
    }

    pub fn pooling(mut self, pooling: Pooling) -> Self {
        self.0.pooling = pooling;
        self
    }

    /// Distance in pixels between two neighbouring windows
    pub fn stride(mut self, stride: usize) -> Self {
        self.0.stride = stride;
        self
    }
}

impl<F: Float> ParamGuard for FeatureExtractorParams<F> {
    type Checked = FeatureExtractor<F>;
    type Error = FeatureError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.stride == 0 {
            Err(FeatureError::Stride)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Index of the closest centroid given the dot products `xc` and the squared norms `c2`
fn closest<F: Float>(xc: ArrayView1<F>, c2: ArrayView1<F>, half: F) -> usize {
    let mut best = (0, F::neg_infinity());
    for (idx, (&xc, &c2)) in xc.iter().zip(c2.iter()).enumerate() {
        let score = xc - half * c2;
        if score > best.1 {
            best = (idx, score);
        }
    }
    best.0
}

/// Every window of side `rf_size` at the given stride, flattened row-major, together with the
/// `(rows, cols)` size of the window grid
fn dense_patches<F: Float>(
    image: ArrayView3<F>,
    rf_size: usize,
    stride: usize,
) -> (Array2<F>, (usize, usize)) {
    let (height, width, channels) = image.dim();
    let n_rows = (height - rf_size) / stride + 1;
    let n_cols = (width - rf_size) / stride + 1;

    let mut patches = Array2::zeros((n_rows * n_cols, rf_size * rf_size * channels));
    for (pos, mut patch) in patches.outer_iter_mut().enumerate() {
        let row = (pos / n_cols) * stride;
        let col = (pos % n_cols) * stride;
        let window = image.slice(s![row..row + rf_size, col..col + rf_size, ..]);
        patch
            .iter_mut()
            .zip(window.iter())
            .for_each(|(dst, &src)| *dst = src);
    }
    (patches, (n_rows, n_cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array, Array3};
    use ufl_preprocessing::FittedWhitener;

    /// A dictionary which leaves the normalized patches untouched
    fn identity_dictionary(
        dim: [usize; 3],
        rf_size: usize,
        centroids: Array2<f64>,
    ) -> PatchDictionary<f64> {
        let n = rf_size * rf_size * dim[2];
        let whitener = FittedWhitener::new(Array1::zeros(n), Array2::eye(n)).unwrap();
        PatchDictionary::new(rf_size, dim, 1e-8, whitener, centroids).unwrap()
    }

    fn image_set(images: &[Array3<f64>]) -> ImageSet<f64> {
        let (h, w, c) = images[0].dim();
        let mut records = Array2::zeros((images.len(), h * w * c));
        for (mut row, image) in records.outer_iter_mut().zip(images) {
            row.iter_mut().zip(image.iter()).for_each(|(d, &s)| *d = s);
        }
        ImageSet::new(records, [h, w, c]).unwrap()
    }

    #[test]
    fn dense_patches_cover_the_image() {
        let image = Array::from_shape_fn((4, 5, 1), |(r, c, _)| (10 * r + c) as f64);
        let (patches, grid) = dense_patches(image.view(), 2, 1);
        assert_eq!(grid, (3, 4));
        assert_eq!(patches.dim(), (12, 4));
        assert_eq!(patches.row(0), array![0., 1., 10., 11.]);
        assert_eq!(patches.row(5), array![11., 12., 21., 22.]);

        let (patches, grid) = dense_patches(image.view(), 2, 2);
        assert_eq!(grid, (2, 2));
        assert_eq!(patches.row(3), array![22., 23., 32., 33.]);
    }

    #[test]
    fn feature_length_follows_pooling() {
        let dict = identity_dictionary([6, 6, 1], 2, Array2::zeros((7, 4)));
        let images = image_set(&[Array3::zeros((6, 6, 1)), Array3::ones((6, 6, 1))]);

        let quadrant = FeatureExtractor::params(dict.clone()).check().unwrap();
        assert_eq!(quadrant.extract(&images).unwrap().dim(), (2, 28));

        let global = FeatureExtractor::params(dict)
            .pooling(Pooling::Global)
            .check()
            .unwrap();
        assert_eq!(global.extract(&images).unwrap().dim(), (2, 7));
    }

    #[test]
    fn hard_global_encoding_counts_positions() {
        // normalized 2x2 patches of a vertical edge are either [-1, 1, -1, 1] or constant
        let centroids = array![[-1., 1., -1., 1.], [1., -1., 1., -1.], [0., 0., 0., 0.]];
        let dict = identity_dictionary([3, 4, 1], 2, centroids);
        let image = Array::from_shape_fn((3, 4, 1), |(_, c, _)| if c >= 2 { 1. } else { 0. });

        let extractor = FeatureExtractor::params(dict)
            .encoding(Encoding::Hard)
            .pooling(Pooling::Global)
            .check()
            .unwrap();
        let features = extractor.extract_image(image.view()).unwrap();

        // 2 x 3 positions, the middle column sees the edge
        assert_eq!(features.sum(), 6.);
        assert_eq!(features, array![2., 0., 4.]);
    }

    #[test]
    fn quadrant_pooling_splits_the_grid() {
        let centroids = array![[1., 1., 1., 1.]];
        let dict = identity_dictionary([5, 5, 1], 2, centroids);
        let image = Array::from_shape_fn((5, 5, 1), |(r, c, _)| (r * 5 + c) as f64);

        let extractor = FeatureExtractor::params(dict)
            .encoding(Encoding::Hard)
            .check()
            .unwrap();
        let features = extractor.extract_image(image.view()).unwrap();

        // a single centroid wins every one of the 4x4 positions, 2x2 per quadrant
        assert_eq!(features, array![4., 4., 4., 4.]);
    }

    #[test]
    fn triangle_activations_are_sparse_and_positive() {
        let centroids = array![[-1., 1., -1., 1.], [1., -1., 1., -1.], [3., 3., 3., 3.]];
        let dict = identity_dictionary([3, 4, 1], 2, centroids);
        let image = Array::from_shape_fn((3, 4, 1), |(r, c, _)| ((r + 2 * c) % 3) as f64);

        let extractor = FeatureExtractor::params(dict).check().unwrap();
        let whitened = Array::from_shape_fn((6, 4), |(i, j)| ((i + j) % 3) as f64 - 1.);
        let codes = extractor.encode(&whitened);
        assert!(codes.iter().all(|&v| v >= 0.));
        // the centroid above average distance is never active
        for row in codes.outer_iter() {
            assert!(row.iter().any(|&v| v == 0.));
        }

        let features = extractor.extract_image(image.view()).unwrap();
        assert_eq!(features.len(), 12);
        assert!(features.iter().all(|v| v.is_finite() && *v >= 0.));
    }

    #[test]
    fn triangle_matches_distances() {
        let dict = identity_dictionary([1, 1, 2], 1, array![[0., 0.], [3., 4.]]);
        let extractor = FeatureExtractor::params(dict).check().unwrap();
        // distances from the origin are 0 and 5, mean 2.5
        let codes = extractor.encode(&array![[0., 0.]]);
        assert_abs_diff_eq!(codes, array![[2.5, 0.]], epsilon = 1e-12);
    }

    #[test]
    fn images_of_another_shape_are_rejected() {
        let dict = identity_dictionary([6, 6, 1], 2, Array2::zeros((3, 4)));
        let extractor = FeatureExtractor::params(dict).check().unwrap();
        let images = image_set(&[Array3::zeros((5, 6, 1))]);

        assert!(matches!(
            extractor.extract(&images),
            Err(FeatureError::MismatchedDictionary { .. })
        ));
        assert!(matches!(
            extractor.extract_image(Array3::zeros((6, 6, 3)).view()),
            Err(FeatureError::MismatchedDictionary { .. })
        ));
    }

    #[test]
    fn stride_cannot_be_zero() {
        let dict = identity_dictionary([6, 6, 1], 2, Array2::zeros((3, 4)));
        let res = FeatureExtractor::params(dict).stride(0).check();
        assert!(matches!(res, Err(FeatureError::Stride)));
    }
}
