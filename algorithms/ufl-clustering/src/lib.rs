//! `ufl-clustering` learns the dictionary of a feature-learning pipeline.
//!
//! ## The big picture
//!
//! Whitened patches produced by `ufl-preprocessing` are grouped with a [batched K-means](BatchKMeans):
//! centroids start as small gaussian noise, every iteration assigns patches batch by batch to
//! their closest centroid and recomputes each centroid as the mean of its patches. Clusters
//! which receive no patch are reset to zero instead of producing NaN.
//!
//! The learned centroids form the dictionary used by `ufl-features` to encode new images.
#[allow(clippy::new_ret_no_self)]
mod k_means;

pub use k_means::*;
