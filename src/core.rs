//! Core traits of the robust fitting framework.
//!
//! The framework is capability-set polymorphism over four small traits:
//! a model that can be estimated from a minimal sample, a residual that
//! scores one correspondence against a model, a sampler that draws minimal
//! subsets, and a stopping condition that bounds the RANSAC search. The
//! [`Ransac`](crate::ransac::Ransac) and [`Lmeds`](crate::lmeds::Lmeds)
//! algorithms are written against these traits only, so every transform
//! family plugs in the same way.

use crate::error::{DegenerateSample, FitError};
use crate::types::{Correspondence, FitOutcome, Point};

/// A parametric transform that can be estimated from point correspondences.
///
/// Models are value types: `Clone` produces a fully independent copy, so the
/// best-hypothesis cache inside an algorithm can never alias the model that
/// is finally returned.
pub trait EstimatableModel: Clone {
    /// Minimum number of correspondences needed for an estimate.
    fn num_items_to_estimate(&self) -> usize;

    /// Estimate the model parameters from `data`.
    ///
    /// `data` holds at least [`num_items_to_estimate`] correspondences;
    /// larger inputs imply a least-squares solve over all of them. A
    /// degenerate configuration (e.g. collinear points) is reported through
    /// the error, leaving the previous parameters untouched.
    ///
    /// [`num_items_to_estimate`]: EstimatableModel::num_items_to_estimate
    fn estimate(&mut self, data: &[Correspondence]) -> Result<(), DegenerateSample>;

    /// Apply the transform to a point in the independent space.
    ///
    /// Returns `None` for families that do not define a point mapping
    /// (the fundamental matrix relates points to epipolar lines, not to
    /// points).
    fn predict(&self, independent: &Point) -> Option<Point>;
}

/// Computes a per-correspondence scalar error for a fitted model.
///
/// Residuals are non-negative, zero iff the correspondence is perfectly
/// explained, and monotonic in the underlying geometric error. All residuals
/// in this crate use the squared-distance convention, so inlier thresholds
/// are in squared units as well.
pub trait ResidualCalculator<M> {
    /// Residual of a single correspondence under `model`.
    fn residual(&self, model: &M, pair: &Correspondence) -> f64;

    /// Residuals of every correspondence in `data`, written into `out`.
    ///
    /// `out.len()` must equal `data.len()`.
    fn residuals(&self, model: &M, data: &[Correspondence], out: &mut [f64]) {
        debug_assert_eq!(data.len(), out.len());
        for (dst, pair) in out.iter_mut().zip(data.iter()) {
            *dst = self.residual(model, pair);
        }
    }
}

/// Draws minimal samples from the correspondence set.
///
/// Samplers own their random source; constructors come in seeded and
/// entropy-seeded pairs so that a whole fitting run is deterministic for a
/// fixed seed.
pub trait Sampler {
    /// Draw `sample_size` distinct indices into `data`, writing them to
    /// `out_indices`.
    ///
    /// Returns `false` if a sample could not be drawn (caller may retry or
    /// give up on the iteration).
    fn sample(
        &mut self,
        data: &[Correspondence],
        sample_size: usize,
        out_indices: &mut [usize],
    ) -> bool;
}

/// Decides when the RANSAC search may halt early and whether the best
/// hypothesis found counts as a successful robust fit.
pub trait StoppingCondition {
    /// Prepare for a run over `data` with the given minimal sample size.
    ///
    /// Returns `false` when the condition can never be met on this data
    /// (e.g. an absolute inlier limit larger than the data set), in which
    /// case the search is not started.
    fn init(&mut self, data: &[Correspondence], num_items_to_estimate: usize) -> bool;

    /// Should the search stop now? Called once per iteration with the size
    /// of the best consensus set so far and the zero-based iteration index.
    fn should_stop(&mut self, best_num_inliers: usize, iteration: usize) -> bool;

    /// After the iteration budget is exhausted, does the best hypothesis
    /// qualify as a robust fit?
    fn final_fit(&self, best_num_inliers: usize) -> bool;
}

/// Common surface of the robust fitting algorithms.
///
/// Implementations keep the fitted model and the index partition from the
/// last [`fit_data`](ModelFitting::fit_data) call; the inlier and outlier
/// index lists always form a complete, disjoint cover of the input.
pub trait ModelFitting<M> {
    /// Run the fit over `data`.
    ///
    /// `Err` is reserved for precondition violations (too little data).
    /// Exhausting the search without consensus is not an error: the model
    /// is refitted from all the data and [`FitOutcome::NonRobust`] is
    /// returned.
    fn fit_data(&mut self, data: &[Correspondence]) -> Result<FitOutcome, FitError>;

    /// The fitted model from the last run.
    fn model(&self) -> &M;

    /// Indices of the inliers from the last run.
    fn inliers(&self) -> &[usize];

    /// Indices of the outliers from the last run.
    fn outliers(&self) -> &[usize];

    /// Minimal sample size of the underlying model.
    fn num_items_to_estimate(&self) -> usize;
}
