use ndarray::{Array2, ArrayView2};
use ufl::{Float, ImageDim};
use ufl_preprocessing::FittedWhitener;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

/// Everything learned from a corpus that is needed to encode new images
///
/// The dictionary stores the patch geometry (`rf_size` and the image shape), the epsilon used
/// for contrast normalization, the ZCA transform `(M, P)` and the `(n_centroids, patch_len)`
/// centroid matrix. All of them have to be applied together, a centroid matrix alone is
/// meaningless for patches that were not normalized and whitened the same way.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct PatchDictionary<F: Float> {
    rf_size: usize,
    dim: ImageDim,
    eps_norm: F,
    whitener: FittedWhitener<F>,
    centroids: Array2<F>,
}

impl<F: Float> PatchDictionary<F> {
    /// Assembles a dictionary, checking that the whitener and the centroids both work on
    /// patches of length `rf_size * rf_size * dim.channels`
    pub fn new(
        rf_size: usize,
        dim: impl Into<ImageDim>,
        eps_norm: F,
        whitener: FittedWhitener<F>,
        centroids: Array2<F>,
    ) -> Result<Self> {
        let dim = dim.into();
        dim.check_patch(rf_size)?;

        let patch_len = dim.patch_len(rf_size);
        if whitener.n_features() != patch_len {
            return Err(FeatureError::mismatched_len(
                "whitening transform",
                patch_len,
                whitener.n_features(),
            ));
        }
        if centroids.ncols() != patch_len {
            return Err(FeatureError::mismatched_len(
                "centroids",
                patch_len,
                centroids.ncols(),
            ));
        }

        Ok(PatchDictionary {
            rf_size,
            dim,
            eps_norm,
            whitener,
            centroids,
        })
    }

    pub fn rf_size(&self) -> usize {
        self.rf_size
    }

    /// Shape of the images the dictionary was learned from
    pub fn dim(&self) -> ImageDim {
        self.dim
    }

    pub fn eps_norm(&self) -> F {
        self.eps_norm
    }

    pub fn whitener(&self) -> &FittedWhitener<F> {
        &self.whitener
    }

    pub fn centroids(&self) -> ArrayView2<'_, F> {
        self.centroids.view()
    }

    pub fn n_centroids(&self) -> usize {
        self.centroids.nrows()
    }

    /// Length of a flattened patch
    pub fn patch_len(&self) -> usize {
        self.dim.patch_len(self.rf_size)
    }
}
