//! Post-search refinement of an accepted model.

use crate::core::EstimatableModel;
use crate::types::Correspondence;

/// Improves a robustly-fitted model using its consensus set.
///
/// Runs on the original (unconditioned) data after the robust search has
/// produced a model and an inlier partition. Implementations must leave the
/// model untouched when they cannot improve it.
pub trait Refinement<M> {
    /// Refine `model` in place from the correspondences at `inliers`.
    ///
    /// Returns `true` if the model was updated.
    fn refine(&mut self, model: &mut M, data: &[Correspondence], inliers: &[usize]) -> bool;
}

/// Refinement that does nothing; the robust estimate is final.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefinement;

impl<M> Refinement<M> for NoRefinement {
    fn refine(&mut self, _model: &mut M, _data: &[Correspondence], _inliers: &[usize]) -> bool {
        false
    }
}

/// Least-squares refit over the full consensus set.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlierRefit;

impl<M: EstimatableModel> Refinement<M> for InlierRefit {
    fn refine(&mut self, model: &mut M, data: &[Correspondence], inliers: &[usize]) -> bool {
        if inliers.len() < model.num_items_to_estimate() {
            return false;
        }
        let subset: Vec<Correspondence> = inliers.iter().map(|&i| data[i]).collect();
        // A degenerate refit leaves the previous parameters in place.
        model.estimate(&subset).is_ok()
    }
}
