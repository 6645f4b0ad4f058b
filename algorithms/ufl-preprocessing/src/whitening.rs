//! ZCA whitening of patch sets
//!
//! Given a `(n_patches, n_features)` matrix `X` with covariance `C = V diag(D) V^T`, the ZCA
//! whitening matrix is `P = V diag(1 / sqrt(D + eps_zca)) V^T`. Applying `P` to the centered
//! patches, `(X - M) P`, yields a patch set whose covariance is (up to the regularization) the
//! identity, while staying as close as possible to the original pixel basis.
//!
//! The covariance is symmetric, so it is decomposed with a symmetric eigensolver and the
//! eigenvalues are real. Eigenvalues which come out slightly negative because of rounding are
//! clamped to zero before the regularization is added.

use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};
use tracing::debug;
use ufl::traits::{Fit, Transformer};
use ufl::{Float, ParamGuard};

#[cfg(not(feature = "blas"))]
use linfa_linalg::eigh::Eigh;
#[cfg(feature = "blas")]
use ndarray_linalg::{eigh::Eigh, UPLO};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{PreprocessingError, Result};

/// Struct that can be fitted to a patch set to obtain its ZCA whitening transform.
/// Fitting returns a [FittedWhitener](struct.FittedWhitener.html) struct that can be used to
/// apply the whitening transformation to the input data and to any future data.
pub struct Whitener;

impl Whitener {
    /// ZCA whitener with regularization constant `eps_zca`, which has to be strictly positive
    pub fn params<F: Float>(eps_zca: F) -> WhitenerParams<F> {
        WhitenerParams(WhitenerValidParams { eps_zca })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhitenerValidParams<F> {
    eps_zca: F,
}

impl<F: Float> WhitenerValidParams<F> {
    /// Regularization added to every eigenvalue of the covariance
    pub fn eps_zca(&self) -> F {
        self.eps_zca
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhitenerParams<F>(WhitenerValidParams<F>);

impl<F: Float> WhitenerParams<F> {
    pub fn eps_zca(mut self, eps_zca: F) -> Self {
        self.0.eps_zca = eps_zca;
        self
    }
}

impl<F: Float> ParamGuard for WhitenerParams<F> {
    type Checked = WhitenerValidParams<F>;
    type Error = PreprocessingError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if !(self.0.eps_zca > F::zero() && self.0.eps_zca.is_finite()) {
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

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, PreprocessingError>
    for WhitenerValidParams<F>
{
    type Object = FittedWhitener<F>;

    fn fit(&self, x: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        let n_samples = x.nrows();
        if n_samples < 2 {
            return Err(PreprocessingError::NotEnoughSamples);
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or(PreprocessingError::NotEnoughSamples)?;

        let cov = covariance(x, &mean);
        if cov.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessingError::SingularCovariance(
                "covariance matrix contains non-finite values".to_string(),
            ));
        }

        let (eigvals, eigvecs) = symmetric_eig(&cov)?;
        let n_clamped = eigvals.iter().filter(|&&d| d < F::zero()).count();
        let d_zca = eigvals.mapv(|d| F::one() / (d.max(F::zero()) + self.eps_zca).sqrt());
        let transformation_matrix = (&eigvecs * &d_zca).dot(&eigvecs.t());

        debug!(
            n_samples,
            n_features = x.ncols(),
            n_clamped,
            "fitted ZCA whitening matrix"
        );

        Ok(FittedWhitener {
            mean,
            transformation_matrix,
        })
    }
}

/// Struct that can be used to whiten data. Data will be centered with the mean and multiplied
/// by the ZCA matrix learned during fitting.
/// Obtained by fitting a [Whitener](struct.Whitener.html).
///
/// Transforming the data used during fitting will yield a data matrix whose covariance is the
/// identity, up to the regularization.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct FittedWhitener<F> {
    mean: Array1<F>,
    transformation_matrix: Array2<F>,
}

impl<F: Float> FittedWhitener<F> {
    /// Rebuilds a whitener from a previously learned mean `M` and ZCA matrix `P`
    pub fn new(mean: Array1<F>, transformation_matrix: Array2<F>) -> Result<Self> {
        let n = mean.len();
        if transformation_matrix.dim() != (n, n) {
            return Err(ufl::error::Error::ShapeMismatch {
                expected: n * n,
                found: transformation_matrix.len(),
            }
            .into());
        }
        Ok(FittedWhitener {
            mean,
            transformation_matrix,
        })
    }

    /// The symmetric `(n_features, n_features)` matrix `P`
    pub fn transformation_matrix(&self) -> ArrayView2<'_, F> {
        self.transformation_matrix.view()
    }

    /// The means that will be subtracted to the features before whitening
    pub fn mean(&self) -> ArrayView1<'_, F> {
        self.mean.view()
    }

    /// Number of features the whitener was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Splits the whitener into `(M, P)`
    pub fn into_parts(self) -> (Array1<F>, Array2<F>) {
        (self.mean, self.transformation_matrix)
    }
}

impl<F: Float> Transformer<Array2<F>, Array2<F>> for FittedWhitener<F> {
    fn transform(&self, x: Array2<F>) -> Array2<F> {
        (x - &self.mean).dot(&self.transformation_matrix)
    }
}

impl<'a, F: Float, D: Data<Elem = F>> Transformer<&'a ArrayBase<D, Ix2>, Array2<F>>
    for FittedWhitener<F>
{
    fn transform(&self, x: &'a ArrayBase<D, Ix2>) -> Array2<F> {
        (x - &self.mean).dot(&self.transformation_matrix)
    }
}

/// Whitens `patches` and returns them together with the mean `M` and the ZCA matrix `P`
///
/// Future data has to go through the same transform, `(x - M) P`.
pub fn whiten<F: Float, D: Data<Elem = F>>(
    patches: &ArrayBase<D, Ix2>,
    eps_zca: F,
) -> Result<(Array2<F>, Array1<F>, Array2<F>)> {
    let whitener = Whitener::params(eps_zca).fit(patches)?;
    let whitened = whitener.transform(patches);
    let (mean, transformation_matrix) = whitener.into_parts();
    Ok((whitened, mean, transformation_matrix))
}

/// Sample covariance of the columns of `x`, with `n - 1` degrees of freedom
fn covariance<F: Float, D: Data<Elem = F>>(x: &ArrayBase<D, Ix2>, mean: &Array1<F>) -> Array2<F> {
    let centered = x - mean;
    centered.t().dot(&centered) / F::cast(x.nrows() - 1)
}

#[cfg(not(feature = "blas"))]
fn symmetric_eig<F: Float>(cov: &Array2<F>) -> Result<(Array1<F>, Array2<F>)> {
    cov.eigh()
        .map_err(|err| PreprocessingError::SingularCovariance(err.to_string()))
}

#[cfg(feature = "blas")]
fn symmetric_eig<F: Float>(cov: &Array2<F>) -> Result<(Array1<F>, Array2<F>)> {
    let cov = cov.mapv(|v| v.to_f64().unwrap_or(f64::NAN));
    let (eigvals, eigvecs) = cov
        .eigh(UPLO::Lower)
        .map_err(|err| PreprocessingError::SingularCovariance(err.to_string()))?;
    Ok((eigvals.mapv(F::cast), eigvecs.mapv(F::cast)))
}
