//! # Feature learning
//!
//! `ufl-features` chains the algorithms of `ufl-preprocessing` and `ufl-clustering` into a
//! complete unsupervised feature learner:
//!
//! * [`DictionaryLearner`] samples random patches from a corpus, normalizes and whitens them and
//!   clusters them into a [`PatchDictionary`];
//! * [`FeatureExtractor`] encodes new images against a learned dictionary, producing one
//!   fixed-length feature vector per image that can be fed to any downstream classifier.
//!
//! ```
//! use ndarray::Array2;
//! use ndarray_rand::{rand_distr::Uniform, RandomExt};
//! use ufl::{traits::Fit, ImageSet, ParamGuard};
//! use ufl_features::{DictionaryLearner, FeatureExtractor, Pooling};
//!
//! let records = Array2::random((10, 8 * 8 * 3), Uniform::new(0., 255.));
//! let images = ImageSet::new(records, [8, 8, 3]).unwrap();
//!
//! let dictionary = DictionaryLearner::params(400, 3, 16)
//!     .n_iterations(5)
//!     .fit(&images)
//!     .unwrap();
//! let extractor = FeatureExtractor::params(dictionary)
//!     .pooling(Pooling::Global)
//!     .check()
//!     .unwrap();
//! let features = extractor.extract(&images).unwrap();
//! assert_eq!(features.dim(), (10, 16));
//! ```

mod dictionary;
pub mod error;
mod extractor;
mod learner;

pub use dictionary::PatchDictionary;
pub use error::{FeatureError, Result};
pub use extractor::{Encoding, FeatureExtractor, FeatureExtractorParams, Pooling};
pub use learner::{DictionaryLearner, DictionaryLearnerParams, DictionaryLearnerValidParams};
