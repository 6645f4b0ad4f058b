//! `ufl` provides the shared building blocks of an unsupervised visual feature-learning
//! pipeline in the style of Coates & Ng: random patches are cropped from a corpus of images,
//! contrast-normalized, ZCA-whitened and clustered with a batched K-means to obtain a
//! dictionary of visual centroids.
//!
//! ## The big picture
//!
//! The workspace is split the same way the pipeline is:
//!
//! * `ufl` (this crate) defines the [`Float`] abstraction, the [`ImageSet`] container and its
//!   [`ImageDim`] descriptor, the shared [`Error`](error::Error) type and the
//!   [`Fit`](traits::Fit) / [`Transformer`](traits::Transformer) /
//!   [`Predict`](traits::Predict) traits implemented by every algorithm;
//! * `ufl-preprocessing` samples, normalizes and whitens patches;
//! * `ufl-clustering` learns the centroid dictionary with batched K-means;
//! * `ufl-features` ties the stages together and turns images into feature vectors;
//! * `ufl-datasets` generates synthetic images and parses CIFAR-10 batches.
//!
//! Hyperparameters of every algorithm are built with the checked builder pattern: an unchecked
//! `XParams` value is turned into `XValidParams` by [`ParamGuard::check`], and fitting an
//! unchecked set of parameters performs the check implicitly.

pub mod dataset;
pub mod error;
mod param_guard;
pub mod prelude;
pub mod traits;

pub use dataset::{Float, ImageDim, ImageSet};
pub use param_guard::ParamGuard;
