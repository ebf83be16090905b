//! Transform families that plug into the robust fitting framework.
//!
//! Each family implements [`EstimatableModel`] with its own minimal sample
//! size and linear solve, plus [`NormalisableModel`] so the orchestrator can
//! undo data conditioning on the fitted parameters.

use nalgebra::Matrix3;

use crate::core::EstimatableModel;
use crate::normalisation::Normalisations;

mod affine;
mod fundamental;
mod homography;

pub use affine::AffineModel;
pub use fundamental::FundamentalModel;
pub use homography::HomographyModel;

/// A model whose parameters can be mapped back from conditioned coordinates
/// to the original coordinate frame.
pub trait NormalisableModel: EstimatableModel {
    /// Rewrite the parameters, estimated on data conditioned by `norms`,
    /// so they apply to the original unconditioned data.
    fn denormalise(&mut self, norms: &Normalisations);
}

/// A model that maps 2D points through a homogeneous 3x3 matrix.
///
/// Gives the transfer residuals access to the raw matrix (and its inverse
/// for the symmetric variant) without knowing the concrete family.
pub trait PointTransformModel {
    fn transform(&self) -> &Matrix3<f64>;
}
