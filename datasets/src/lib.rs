//! `ufl-datasets` provides the image sets used to train and exercise the `ufl` workspace.
//!
//! ## The Big Picture
//!
//! Two sources of images are available:
//!
//! * [`generate`]: synthetic image sets, either pure noise or oriented gratings with noise,
//!   generated from an injected random generator;
//! * [`cifar10`]: the CIFAR-10 binary batches (32x32 RGB images with 10 classes), parsed from
//!   memory or loaded from plain or gzipped files.
//!
//! Both return an [`ImageSet`](ufl::ImageSet) with pixel values in `[0, 255]`.
//!
//! ```
//! use ndarray_rand::rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//! use ufl_datasets::generate;
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//! let images = generate::gratings(10, [16, 16, 3], 4., &mut rng).unwrap();
//! assert_eq!(images.nimages(), 10);
//! ```

pub mod cifar10;
pub mod error;
pub mod generate;

pub use error::{DatasetError, Result};
