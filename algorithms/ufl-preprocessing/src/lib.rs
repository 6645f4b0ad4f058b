//! # Preprocessing
//! ## The Big Picture
//!
//! `ufl-preprocessing` turns a corpus of images into the whitened patch set a dictionary is
//! learned from. The three stages are applied in order:
//!
//! * [Random patch extraction](patches): square crops at random offsets, images reused
//!   cyclically;
//! * [Contrast normalization](normalization): every patch centered on its own mean and scaled
//!   by its standard deviation;
//! * [ZCA whitening](whitening): the patch set is decorrelated, the learned `(M, P)` pair is kept
//!   to transform future data in the same way.
//!
//! Each stage is available both through its checked hyperparameters (`PatchSampler`,
//! `PatchNormalizer`, `Whitener`) and as a plain function ([`extract_random_patches`],
//! [`pre_process`], [`whiten`]).

pub mod error;
pub mod normalization;
pub mod patches;
pub mod whitening;

pub use error::{PreprocessingError, Result};
pub use normalization::{pre_process, PatchNormalizer, PatchNormalizerParams};
pub use patches::{
    extract_random_patches, PatchSampler, PatchSamplerParams, PatchSamplerValidParams,
};
pub use whitening::{whiten, FittedWhitener, Whitener, WhitenerParams, WhitenerValidParams};
