//! Core shared types for robust transform fitting.

use nalgebra::Point2;

/// 2D point in `f64` coordinates.
pub type Point = Point2<f64>;

/// A paired observation: a point in the independent (source) space and the
/// point it maps to in the dependent (target) space.
///
/// Correspondences are immutable value data; collections of them are the
/// only input to the fitting algorithms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Point in the source space.
    pub independent: Point,
    /// Matched point in the target space.
    pub dependent: Point,
}

impl Correspondence {
    pub fn new(independent: Point, dependent: Point) -> Self {
        Self {
            independent,
            dependent,
        }
    }

    /// Build from raw coordinates `(x1, y1) -> (x2, y2)`.
    pub fn from_coords(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(Point::new(x1, y1), Point::new(x2, y2))
    }
}

/// How a fit was obtained.
///
/// The robust algorithms never fail outright once the input preconditions
/// hold: when no consensus can be found they degrade to a non-robust
/// least-squares fit over all data and report that through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// A valid consensus set was found and the model was fitted to it.
    Robust,
    /// No consensus was found; the model is a plain fit over all the data
    /// and every correspondence is reported as an inlier.
    NonRobust,
}

impl FitOutcome {
    pub fn is_robust(self) -> bool {
        matches!(self, FitOutcome::Robust)
    }
}
