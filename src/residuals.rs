//! Residual functions for the supported transform families.
//!
//! All residuals use the squared-distance convention: thresholds passed to
//! the algorithms are compared directly against these values, and the LMedS
//! `(2.5 sigma)^2` threshold shares the same units.

use nalgebra::{Matrix3, Vector3};

use crate::core::ResidualCalculator;
use crate::models::{FundamentalModel, PointTransformModel};
use crate::normalisation::transform_point;
use crate::types::Correspondence;

/// Squared forward transfer error: `||T(x1) - x2||^2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleImageTransferResidual;

impl<M: PointTransformModel> ResidualCalculator<M> for SingleImageTransferResidual {
    fn residual(&self, model: &M, pair: &Correspondence) -> f64 {
        let predicted = transform_point(model.transform(), &pair.independent);
        (predicted - pair.dependent).norm_squared()
    }
}

/// Symmetric transfer error: mean of the squared forward and backward
/// transfer distances. A non-invertible transform scores infinite, which
/// classifies every point as an outlier for that hypothesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymmetricTransferResidual;

impl SymmetricTransferResidual {
    fn with_inverse(
        transform: &Matrix3<f64>,
        inverse: &Matrix3<f64>,
        pair: &Correspondence,
    ) -> f64 {
        let forward = transform_point(transform, &pair.independent);
        let backward = transform_point(inverse, &pair.dependent);
        0.5 * ((forward - pair.dependent).norm_squared()
            + (backward - pair.independent).norm_squared())
    }
}

impl<M: PointTransformModel> ResidualCalculator<M> for SymmetricTransferResidual {
    fn residual(&self, model: &M, pair: &Correspondence) -> f64 {
        match model.transform().try_inverse() {
            Some(inv) => Self::with_inverse(model.transform(), &inv, pair),
            None => f64::INFINITY,
        }
    }

    fn residuals(&self, model: &M, data: &[Correspondence], out: &mut [f64]) {
        debug_assert_eq!(data.len(), out.len());
        // Invert once per model rather than once per correspondence.
        match model.transform().try_inverse() {
            Some(inv) => {
                for (dst, pair) in out.iter_mut().zip(data.iter()) {
                    *dst = Self::with_inverse(model.transform(), &inv, pair);
                }
            }
            None => out.fill(f64::INFINITY),
        }
    }
}

/// Squared algebraic error of the two DLT constraint rows.
///
/// Cheaper than the transfer residuals and adequate on conditioned data.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlgebraicResidual;

impl<M: PointTransformModel> ResidualCalculator<M> for AlgebraicResidual {
    fn residual(&self, model: &M, pair: &Correspondence) -> f64 {
        let t = model.transform();
        let x = Vector3::new(pair.independent.x, pair.independent.y, 1.0);
        let (u, v) = (pair.dependent.x, pair.dependent.y);

        let row0 = t.row(0).transpose().dot(&x);
        let row1 = t.row(1).transpose().dot(&x);
        let w = t.row(2).transpose().dot(&x);

        let e0 = u * w - row0;
        let e1 = v * w - row1;
        e0 * e0 + e1 * e1
    }
}

/// Sampson residual: first-order approximation of the squared geometric
/// distance to the epipolar constraint `x2^T F x1 = 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampsonResidual;

impl ResidualCalculator<FundamentalModel> for SampsonResidual {
    fn residual(&self, model: &FundamentalModel, pair: &Correspondence) -> f64 {
        let f = model.matrix();
        let x1 = Vector3::new(pair.independent.x, pair.independent.y, 1.0);
        let x2 = Vector3::new(pair.dependent.x, pair.dependent.y, 1.0);

        let fx1 = f * x1;
        let ftx2 = f.transpose() * x2;
        let constraint = x2.dot(&fx1);

        let denom = fx1.x * fx1.x + fx1.y * fx1.y + ftx2.x * ftx2.x + ftx2.y * ftx2.y;
        if denom <= f64::EPSILON {
            return f64::INFINITY;
        }
        constraint * constraint / denom
    }
}
