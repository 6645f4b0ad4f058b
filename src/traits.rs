//! Provide traits for different classes of algorithms
//!

/// Transformation algorithms
///
/// A transformer takes a set of records and transforms them into another representation. It
/// does not learn anything from the records it is applied to; everything it needs was either
/// passed as a hyperparameter or learned by a previous call to [`Fit`].
pub trait Transformer<R, T> {
    fn transform(&self, x: R) -> T;
}

/// Fittable algorithms
///
/// A fittable algorithm takes a set of records and creates an object which can be used for
/// transformation or prediction. The generic error `E` has to be convertible from the shared
/// [`Error`](crate::error::Error) so that dataset-level failures can be propagated with `?`.
pub trait Fit<R, E: std::error::Error + From<crate::error::Error>> {
    type Object;

    fn fit(&self, records: &R) -> Result<Self::Object, E>;
}

/// Predict with a fitted model
///
/// Prediction maps every record to the target learned during fitting, e.g. the index of the
/// closest centroid.
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}
