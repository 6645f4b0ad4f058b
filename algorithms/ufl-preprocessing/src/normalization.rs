//! Per-patch contrast normalization
//!
//! Every patch (row) is centered on its own mean and divided by the square root of its
//! population variance plus `eps`. The regularization keeps constant patches finite.

use ndarray::{Array2, ArrayBase, Data, Ix2};
use ufl::{traits::Transformer, Float, ParamGuard};

use crate::error::{PreprocessingError, Result};

/// Checked contrast normalizer, ready to be applied to a batch of patches
#[derive(Clone, Debug, PartialEq)]
pub struct PatchNormalizer<F> {
    eps: F,
}

impl<F: Float> PatchNormalizer<F> {
    /// Normalizer with regularization constant `eps`, which has to be strictly positive
    pub fn params(eps: F) -> PatchNormalizerParams<F> {
        PatchNormalizerParams(PatchNormalizer { eps })
    }

    pub fn eps(&self) -> F {
        self.eps
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatchNormalizerParams<F>(PatchNormalizer<F>);

impl<F: Float> PatchNormalizerParams<F> {
    pub fn eps(mut self, eps: F) -> Self {
        self.0.eps = eps;
        self
    }
}

impl<F: Float> ParamGuard for PatchNormalizerParams<F> {
    type Checked = PatchNormalizer<F>;
    type Error = PreprocessingError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if !(self.0.eps > F::zero() && self.0.eps.is_finite()) {
            Err(PreprocessingError::Epsilon)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float> Transformer<Array2<F>, Array2<F>> for PatchNormalizer<F> {
    fn transform(&self, mut x: Array2<F>) -> Array2<F> {
        if x.ncols() == 0 {
            return x;
        }
        let n = F::cast(x.ncols());
        for mut row in x.rows_mut() {
            let mean = row.sum() / n;
            let var = row.iter().map(|&v| (v - mean) * (v - mean)).sum::<F>() / n;
            let scale = (var + self.eps).sqrt();
            row.mapv_inplace(|v| (v - mean) / scale);
        }
        x
    }
}

impl<'a, F: Float, D: Data<Elem = F>> Transformer<&'a ArrayBase<D, Ix2>, Array2<F>>
    for PatchNormalizer<F>
{
    fn transform(&self, x: &'a ArrayBase<D, Ix2>) -> Array2<F> {
        self.transform(x.to_owned())
    }
}

/// Normalizes every patch to zero mean and (almost) unit variance
///
/// Fails with `Epsilon` if `eps` is not strictly positive.
pub fn pre_process<F: Float>(patches: Array2<F>, eps: F) -> Result<Array2<F>> {
    let normalizer = PatchNormalizer::params(eps).check()?;
    Ok(normalizer.transform(patches))
}
