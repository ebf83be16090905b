//! Error types.
//!
//! Only programmer-error-class conditions surface as errors; expected
//! degradations (degenerate samples, missing consensus) are absorbed by the
//! algorithms and expressed through [`FitOutcome`](crate::FitOutcome).

use thiserror::Error;

/// Caller-facing errors from the fitting entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FitError {
    /// Fewer correspondences were supplied than the model needs for a
    /// minimal estimate. This is a contract violation, not a fit failure.
    #[error("need at least {required} correspondences, got {provided}")]
    InsufficientData { required: usize, provided: usize },
}

/// Marker error returned by [`EstimatableModel::estimate`] when the supplied
/// points cannot produce a model (collinear points, rank-deficient design
/// matrix, failed decomposition).
///
/// [`EstimatableModel::estimate`]: crate::core::EstimatableModel::estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("degenerate sample")]
pub struct DegenerateSample;
