//! Datasets
//!
//! This module implements the image container consumed by the patch sampler and the feature
//! extractor, together with the floating point abstraction shared by every algorithm.
use ndarray::{Array2, ArrayView3, NdFloat};
use num_traits::{FromPrimitive, NumCast};
use rand::distributions::uniform::SampleUniform;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use std::fmt;
use std::iter::Sum;

use crate::error::{Error, Result};

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. Pixels, patches, whitening matrices and
/// centroids all share the same element type.
pub trait Float: NdFloat + FromPrimitive + Default + Sum + SampleUniform {
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}

impl Float for f64 {}

/// Shape of a single image, `[height, width, channels]`
///
/// An image is stored as a flattened vector which is reinterpreted as a row-major array of
/// shape `(height, width, channels)`.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageDim {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl ImageDim {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        ImageDim {
            height,
            width,
            channels,
        }
    }

    /// Length of a flattened image
    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of the 3-dimensional view of an image
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    /// Length of a flattened square patch with side `rf_size`
    pub fn patch_len(&self, rf_size: usize) -> usize {
        rf_size * rf_size * self.channels
    }

    /// Checks that a square patch with side `rf_size` fits inside the image
    pub fn check_patch(&self, rf_size: usize) -> Result<()> {
        if rf_size > self.height || rf_size > self.width {
            Err(Error::InvalidDimension {
                rf_size,
                height: self.height,
                width: self.width,
            })
        } else {
            Ok(())
        }
    }
}

impl From<[usize; 3]> for ImageDim {
    fn from(dim: [usize; 3]) -> Self {
        ImageDim::new(dim[0], dim[1], dim[2])
    }
}

impl From<(usize, usize, usize)> for ImageDim {
    fn from((height, width, channels): (usize, usize, usize)) -> Self {
        ImageDim::new(height, width, channels)
    }
}

impl fmt::Display for ImageDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.height, self.width, self.channels)
    }
}

/// A fixed-count collection of images
///
/// Every image occupies one row of `records` and has exactly `dim.len()` elements. The records
/// are kept in standard layout so that each row can be viewed as a `(height, width, channels)`
/// array without copying.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSet<F> {
    records: Array2<F>,
    dim: ImageDim,
}

impl<F: Float> ImageSet<F> {
    /// Creates a new image set from a `(n_images, height * width * channels)` matrix
    ///
    /// Fails with `ShapeMismatch` if the row length does not match the declared dimension.
    pub fn new(records: Array2<F>, dim: impl Into<ImageDim>) -> Result<Self> {
        let dim = dim.into();
        if records.ncols() != dim.len() {
            return Err(Error::ShapeMismatch {
                expected: dim.len(),
                found: records.ncols(),
            });
        }

        let records = if records.is_standard_layout() {
            records
        } else {
            records.as_standard_layout().into_owned()
        };

        Ok(ImageSet { records, dim })
    }

    /// Number of images in the set
    pub fn nimages(&self) -> usize {
        self.records.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.nimages() == 0
    }

    pub fn dim(&self) -> ImageDim {
        self.dim
    }

    /// The flattened images, one per row
    pub fn records(&self) -> &Array2<F> {
        &self.records
    }

    pub fn into_records(self) -> Array2<F> {
        self.records
    }

    /// Returns the `idx`-th image as a `(height, width, channels)` view
    ///
    /// # Panics
    ///
    /// If `idx` is out of bounds.
    pub fn image(&self, idx: usize) -> Result<ArrayView3<'_, F>> {
        let image = self.records.row(idx).into_shape(self.dim.shape())?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array, Array2};

    #[test]
    fn image_set_rejects_wrong_row_length() {
        let records = Array2::<f64>::zeros((2, 47));
        let res = ImageSet::new(records, [4, 4, 3]);
        assert!(matches!(
            res,
            Err(Error::ShapeMismatch {
                expected: 48,
                found: 47
            })
        ));
    }

    #[test]
    fn image_view_is_row_major() {
        let records = Array::range(0., 24., 1.).into_shape((2, 12)).unwrap();
        let images = ImageSet::new(records, [2, 2, 3]).unwrap();
        assert_eq!(images.nimages(), 2);

        let second = images.image(1).unwrap();
        assert_eq!(second.dim(), (2, 2, 3));
        // (row 1, col 0, channel 2) of the second image
        assert_eq!(second[[1, 0, 2]], 12. + 6. + 2.);
    }

    #[test]
    fn non_standard_layout_is_copied() {
        let records = array![[0., 2.], [1., 3.]].reversed_axes();
        let images = ImageSet::new(records, [1, 2, 1]).unwrap();
        assert!(images.records().is_standard_layout());
        assert_eq!(images.image(0).unwrap()[[0, 1, 0]], 1.);
    }

    #[test]
    fn patch_must_fit_inside_image() {
        let dim = ImageDim::from([4, 6, 3]);
        assert!(dim.check_patch(4).is_ok());
        assert!(matches!(
            dim.check_patch(5),
            Err(Error::InvalidDimension {
                rf_size: 5,
                height: 4,
                width: 6
            })
        ));
        assert_eq!(dim.patch_len(2), 12);
    }
}
