//! Affine transform estimated by a homogeneous least-squares solve.

use nalgebra::{DMatrix, Matrix3};

use crate::core::EstimatableModel;
use crate::error::DegenerateSample;
use crate::normalisation::{transform_point, Normalisations};
use crate::types::{Correspondence, Point};

use super::{NormalisableModel, PointTransformModel};

/// Affine transform: `x2 = A x1` with `A` a 3x3 matrix whose last row is
/// `[0, 0, 1]`. Three non-collinear correspondences are the minimal sample;
/// more imply a least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineModel {
    m: Matrix3<f64>,
}

impl AffineModel {
    pub fn new() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    pub fn from_matrix(m: Matrix3<f64>) -> Self {
        Self { m }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    pub fn set_matrix(&mut self, m: Matrix3<f64>) {
        self.m = m;
    }
}

impl Default for AffineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatableModel for AffineModel {
    fn num_items_to_estimate(&self) -> usize {
        3
    }

    fn estimate(&mut self, data: &[Correspondence]) -> Result<(), DegenerateSample> {
        let n = data.len();
        if n < self.num_items_to_estimate() {
            return Err(DegenerateSample);
        }

        // Homogeneous system over the six affine parameters plus a shared
        // scale: each correspondence contributes two rows of a 2n x 7
        // design matrix whose null space holds the solution. nalgebra's
        // SVD is thin, so the minimal 6 x 7 case is padded square with
        // zero rows to make `v_t` span the full right basis.
        let mut a = DMatrix::<f64>::zeros((2 * n).max(7), 7);
        for (i, c) in data.iter().enumerate() {
            let (x1, y1) = (c.independent.x, c.independent.y);
            let (x2, y2) = (c.dependent.x, c.dependent.y);

            let r0 = 2 * i;
            let r1 = 2 * i + 1;

            a[(r0, 0)] = x1;
            a[(r0, 1)] = y1;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -x2;

            a[(r1, 3)] = x1;
            a[(r1, 4)] = y1;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -y2;
        }

        let svd = a.svd(false, true);
        let v_t = svd.v_t.ok_or(DegenerateSample)?;
        let s = &svd.singular_values;

        // A second vanishing singular value leaves the solution ambiguous.
        if s[s.len() - 2] <= s[0] * 1e-8 {
            return Err(DegenerateSample);
        }

        let w = v_t.row(v_t.nrows() - 1);
        if w.iter().any(|v| !v.is_finite()) || w[6].abs() < 1e-12 {
            return Err(DegenerateSample);
        }

        let m = Matrix3::new(
            w[0] / w[6],
            w[1] / w[6],
            w[2] / w[6],
            w[3] / w[6],
            w[4] / w[6],
            w[5] / w[6],
            0.0,
            0.0,
            1.0,
        );

        // Collinear source points leave the linear part rank-deficient.
        let det2 = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
        if !det2.is_finite() || det2.abs() < 1e-12 {
            return Err(DegenerateSample);
        }

        self.m = m;
        Ok(())
    }

    fn predict(&self, independent: &Point) -> Option<Point> {
        Some(transform_point(&self.m, independent))
    }
}

impl NormalisableModel for AffineModel {
    fn denormalise(&mut self, norms: &Normalisations) {
        // Conditioning transforms are affine, so T2^-1 A T1 stays affine.
        if let Some(t2_inv) = norms.second.try_inverse() {
            let mut m = t2_inv * self.m * norms.first;
            let scale = m[(2, 2)];
            if scale.abs() > f64::EPSILON {
                m /= scale;
            }
            m[(2, 0)] = 0.0;
            m[(2, 1)] = 0.0;
            m[(2, 2)] = 1.0;
            self.m = m;
        }
    }
}

impl PointTransformModel for AffineModel {
    fn transform(&self) -> &Matrix3<f64> {
        &self.m
    }
}
