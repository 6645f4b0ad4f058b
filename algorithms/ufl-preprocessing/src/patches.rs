//! Random patch extraction
//!
//! Patches are square crops of side `rf_size` taken at uniformly random offsets, always fully
//! inside the source image. Patch `i` is cropped from image `i mod n_images`, so the images are
//! reused cyclically once more patches than images are requested. Every crop is flattened in
//! row-major order (row, then column, then channel).

use ndarray::{s, Array2};
use ndarray_rand::rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::info;
use ufl::{Float, ImageSet, ParamGuard};

use crate::error::{PreprocessingError, Result};

const PROGRESS_INTERVAL: usize = 10_000;

/// Samples random patches from an [`ImageSet`]
///
/// ```
/// use ndarray::Array2;
/// use ufl::{ImageSet, ParamGuard};
/// use ufl_preprocessing::patches::PatchSampler;
///
/// let images = ImageSet::new(Array2::<f64>::zeros((2, 4 * 4 * 3)), [4, 4, 3]).unwrap();
/// let patches = PatchSampler::params(5, 2).check().unwrap().extract(&images).unwrap();
/// assert_eq!(patches.dim(), (5, 12));
/// ```
pub struct PatchSampler;

impl PatchSampler {
    /// Extract `n_patches` patches of side `rf_size`, using a `SmallRng` seeded with 42
    pub fn params(n_patches: usize, rf_size: usize) -> PatchSamplerParams<SmallRng> {
        Self::params_with_rng(n_patches, rf_size, SmallRng::seed_from_u64(42))
    }

    pub fn params_with_rng<R: Rng>(
        n_patches: usize,
        rf_size: usize,
        rng: R,
    ) -> PatchSamplerParams<R> {
        PatchSamplerParams(PatchSamplerValidParams {
            n_patches,
            rf_size,
            rng,
        })
    }
}

/// A verified set of patch sampling parameters
#[derive(Clone, Debug, PartialEq)]
pub struct PatchSamplerValidParams<R> {
    n_patches: usize,
    rf_size: usize,
    rng: R,
}

impl<R: Rng + Clone> PatchSamplerValidParams<R> {
    pub fn n_patches(&self) -> usize {
        self.n_patches
    }

    /// Side length of the square patches
    pub fn rf_size(&self) -> usize {
        self.rf_size
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }

    /// Crops the patches out of `images`
    ///
    /// The random generator is cloned, two calls on the same parameters return the same patches.
    pub fn extract<F: Float>(&self, images: &ImageSet<F>) -> Result<Array2<F>> {
        let mut rng = self.rng.clone();
        extract_random_patches(images, self.n_patches, self.rf_size, &mut rng)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatchSamplerParams<R>(PatchSamplerValidParams<R>);

impl<R: Rng> PatchSamplerParams<R> {
    /// Change the number of extracted patches
    pub fn n_patches(mut self, n_patches: usize) -> Self {
        self.0.n_patches = n_patches;
        self
    }

    /// Change the side length of the square patches
    pub fn rf_size(mut self, rf_size: usize) -> Self {
        self.0.rf_size = rf_size;
        self
    }

    /// Change the random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> PatchSamplerParams<R2> {
        PatchSamplerParams(PatchSamplerValidParams {
            n_patches: self.0.n_patches,
            rf_size: self.0.rf_size,
            rng,
        })
    }
}

impl<R> ParamGuard for PatchSamplerParams<R> {
    type Checked = PatchSamplerValidParams<R>;
    type Error = PreprocessingError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.n_patches == 0 {
            Err(PreprocessingError::NPatches)
        } else if self.0.rf_size == 0 {
            Err(PreprocessingError::RfSize)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Crops `n_patches` random square patches of side `rf_size` out of `images`
///
/// Returns a `(n_patches, rf_size * rf_size * channels)` matrix. Offsets are drawn from `rng`,
/// first the row then the column, independently for every patch.
///
/// Fails with `InvalidDimension` if the patch does not fit inside the images and with
/// `NotEnoughSamples` if the image set is empty.
pub fn extract_random_patches<F: Float, R: Rng>(
    images: &ImageSet<F>,
    n_patches: usize,
    rf_size: usize,
    rng: &mut R,
) -> Result<Array2<F>> {
    if n_patches == 0 {
        return Err(PreprocessingError::NPatches);
    }
    if rf_size == 0 {
        return Err(PreprocessingError::RfSize);
    }
    if images.is_empty() {
        return Err(ufl::error::Error::NotEnoughSamples.into());
    }
    let dim = images.dim();
    dim.check_patch(rf_size)?;

    let n_images = images.nimages();
    info!(n_patches, rf_size, n_images, %dim, "extracting random patches");

    let mut patches = Array2::zeros((n_patches, dim.patch_len(rf_size)));
    for (i, mut patch) in patches.rows_mut().into_iter().enumerate() {
        if i % PROGRESS_INTERVAL == 0 {
            info!("patch extraction: {} / {}", i, n_patches);
        }
        let image = images.image(i % n_images)?;
        let row = rng.gen_range(0..=dim.height - rf_size);
        let col = rng.gen_range(0..=dim.width - rf_size);

        let crop = image.slice(s![row..row + rf_size, col..col + rf_size, ..]);
        patch
            .iter_mut()
            .zip(crop.iter())
            .for_each(|(dst, &src)| *dst = src);
    }

    Ok(patches)
}
