//! Utility functions for randomly generating image sets

use ndarray::{Array, Array2, Axis};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{Distribution, Normal, Uniform},
    RandomExt,
};
use ufl::{ImageDim, ImageSet};

use crate::error::Result;

/// Images whose pixels are drawn independently and uniformly from `[0, 255)`
///
/// Pure noise has no spatial structure, useful to exercise shapes and numerical edge cases.
pub fn uniform_images(
    n_images: usize,
    dim: impl Into<ImageDim>,
    rng: &mut impl Rng,
) -> Result<ImageSet<f64>> {
    images_with_distribution(n_images, dim, Uniform::new(0., 255.), rng)
}

/// Images whose pixels are drawn independently from the given distribution
pub fn images_with_distribution(
    n_images: usize,
    dim: impl Into<ImageDim>,
    distribution: impl Distribution<f64>,
    rng: &mut impl Rng,
) -> Result<ImageSet<f64>> {
    let dim = dim.into();
    let records = Array2::random_using((n_images, dim.len()), distribution, rng);
    Ok(ImageSet::new(records, dim)?)
}

/// Images of oriented sinusoidal gratings with additive gaussian noise
///
/// Every image gets a random orientation, spatial frequency and phase, and a random contrast
/// per channel, so that small patches look like edges of varying direction. This is the kind
/// of structure a patch dictionary is expected to pick up. Pixels are clipped to `[0, 255]`.
///
/// Fails with a parameter error if `noise_std` is negative or not finite.
pub fn gratings(
    n_images: usize,
    dim: impl Into<ImageDim>,
    noise_std: f64,
    rng: &mut impl Rng,
) -> Result<ImageSet<f64>> {
    let dim = dim.into();
    let (height, width, channels) = dim.shape();
    // `Normal::new` only rejects a deviation that is not finite
    if !(noise_std >= 0. && noise_std.is_finite()) {
        return Err(ufl::error::Error::Parameters(format!(
            "noise_std has to be finite and non-negative, got {}",
            noise_std
        ))
        .into());
    }
    let noise = Normal::new(0., noise_std)
        .map_err(|err| ufl::error::Error::Parameters(format!("noise_std: {}", err)))?;

    let mut records = Array2::zeros((n_images, dim.len()));
    for mut record in records.axis_iter_mut(Axis(0)) {
        let angle = rng.gen_range(0.0..std::f64::consts::PI);
        let frequency = rng.gen_range(0.2..1.2);
        let phase = rng.gen_range(0.0..2. * std::f64::consts::PI);
        let contrast: Vec<f64> = (0..channels).map(|_| rng.gen_range(40.0..120.0)).collect();
        let (dx, dy) = (angle.cos() * frequency, angle.sin() * frequency);

        let image = Array::from_shape_fn((height, width, channels), |(y, x, c)| {
            let wave = (dx * x as f64 + dy * y as f64 + phase).sin();
            127.5 + contrast[c] * wave
        });
        let noisy = image + Array::random_using((height, width, channels), noise, rng);

        record
            .iter_mut()
            .zip(noisy.iter())
            .for_each(|(dst, &v)| *dst = v.max(0.).min(255.));
    }

    Ok(ImageSet::new(records, dim)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn uniform_images_fill_the_range() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let images = uniform_images(50, [8, 8, 3], &mut rng).unwrap();
        assert_eq!(images.nimages(), 50);
        assert_eq!(images.records().ncols(), 192);
        assert!(images.records().iter().all(|&v| (0. ..255.).contains(&v)));
        assert_abs_diff_eq!(images.records().mean().unwrap(), 127.5, epsilon = 3.);
    }

    #[test]
    fn gratings_are_clipped_and_structured() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let images = gratings(20, [12, 12, 3], 5., &mut rng).unwrap();
        assert_eq!(images.dim(), ImageDim::new(12, 12, 3));
        assert!(images.records().iter().all(|&v| (0. ..=255.).contains(&v)));

        // neighbouring pixels are much closer than the pixel range
        let image = images.image(0).unwrap();
        let diff = (image[[5, 5, 0]] - image[[5, 6, 0]]).abs();
        assert!(diff < 150.);
    }

    #[test]
    fn noiseless_gratings_are_deterministic() {
        let a = gratings(3, [6, 6, 1], 0., &mut Xoshiro256Plus::seed_from_u64(1)).unwrap();
        let b = gratings(3, [6, 6, 1], 0., &mut Xoshiro256Plus::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn negative_noise_is_rejected() {
        for noise_std in [-1., -0.5, f64::NAN, f64::INFINITY] {
            let res = gratings(3, [6, 6, 1], noise_std, &mut Xoshiro256Plus::seed_from_u64(1));
            assert!(matches!(
                res,
                Err(crate::DatasetError::UflError(ufl::error::Error::Parameters(_)))
            ));
        }
    }
}
