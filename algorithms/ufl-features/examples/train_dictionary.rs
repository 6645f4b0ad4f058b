//! Learns a dictionary on synthetic gratings, or on a CIFAR-10 batch given as first argument,
//! and encodes the images with it.
//!
//! ```text
//! RUST_LOG=debug cargo run --release --example train_dictionary -- data_batch_1.bin
//! ```
use std::env;
use std::error::Error;

use ndarray::Axis;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ufl::traits::Fit;
use ufl::ParamGuard;
use ufl_datasets::{cifar10, generate};
use ufl_features::{DictionaryLearner, Encoding, FeatureExtractor, Pooling};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let images = match env::args().nth(1) {
        Some(path) => cifar10::load_batch::<f64, _>(path)?.into_parts().0,
        None => generate::gratings(500, cifar10::dim(), 8., &mut rng)?,
    };
    info!(n_images = images.nimages(), dim = %images.dim(), "images loaded");

    let dictionary = DictionaryLearner::params_with_rng(50_000, 6, 100, rng)
        .n_iterations(50)
        .fit(&images)?;

    let extractor = FeatureExtractor::params(dictionary)
        .encoding(Encoding::Triangle)
        .pooling(Pooling::Quadrant)
        .check()?;
    let features = extractor.extract(&images)?;

    let mean_activation = features.mean_axis(Axis(0)).map(|m| m.mean().unwrap_or(0.));
    info!(
        n_features = features.ncols(),
        mean_activation = ?mean_activation,
        "images encoded"
    );

    Ok(())
}
