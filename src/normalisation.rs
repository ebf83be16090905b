//! Data conditioning for numerically stable estimation.
//!
//! Raw image coordinates can be large and badly scaled, which makes the
//! design matrices of the DLT-style solvers ill-conditioned. The fix is the
//! standard one: translate each point cloud so it is centred on the origin
//! and scale each axis so its standard deviation becomes `sqrt(2)`. The
//! transforms are affine, invertible, and element-order preserving, so
//! inlier indices on normalised data identify the same correspondences in
//! the original data.

use nalgebra::{Matrix3, Vector3};

use crate::types::{Correspondence, Point};

/// Variances below this are treated as zero and left unscaled.
const MIN_VARIANCE: f64 = 1e-5;

/// Pair of conditioning transforms, one for the independent point cloud and
/// one for the dependent one.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalisations {
    /// Transform applied to the independent points.
    pub first: Matrix3<f64>,
    /// Transform applied to the dependent points.
    pub second: Matrix3<f64>,
}

impl Normalisations {
    /// Compute the conditioning transforms for a correspondence set.
    pub fn of(data: &[Correspondence]) -> Self {
        let n = data.len() as f64;

        let mut mean_first = [0.0f64; 2];
        let mut mean_second = [0.0f64; 2];
        for c in data {
            mean_first[0] += c.independent.x;
            mean_first[1] += c.independent.y;
            mean_second[0] += c.dependent.x;
            mean_second[1] += c.dependent.y;
        }
        for v in mean_first.iter_mut().chain(mean_second.iter_mut()) {
            *v /= n;
        }

        let mut var_first = [0.0f64; 2];
        let mut var_second = [0.0f64; 2];
        for c in data {
            var_first[0] += (c.independent.x - mean_first[0]).powi(2);
            var_first[1] += (c.independent.y - mean_first[1]).powi(2);
            var_second[0] += (c.dependent.x - mean_second[0]).powi(2);
            var_second[1] += (c.dependent.y - mean_second[1]).powi(2);
        }

        let denom = (data.len().saturating_sub(1)).max(1) as f64;
        let scale = |sum_sq: f64| {
            if sum_sq < MIN_VARIANCE {
                1.0
            } else {
                (2.0f64).sqrt() / (sum_sq / denom).sqrt()
            }
        };

        let sx1 = scale(var_first[0]);
        let sy1 = scale(var_first[1]);
        let sx2 = scale(var_second[0]);
        let sy2 = scale(var_second[1]);

        Self {
            first: Matrix3::new(
                sx1,
                0.0,
                -mean_first[0] * sx1,
                0.0,
                sy1,
                -mean_first[1] * sy1,
                0.0,
                0.0,
                1.0,
            ),
            second: Matrix3::new(
                sx2,
                0.0,
                -mean_second[0] * sx2,
                0.0,
                sy2,
                -mean_second[1] * sy2,
                0.0,
                0.0,
                1.0,
            ),
        }
    }

    /// Produce the normalised copy of `data`, preserving order and length.
    pub fn apply(&self, data: &[Correspondence]) -> Vec<Correspondence> {
        data.iter()
            .map(|c| {
                Correspondence::new(
                    transform_point(&self.first, &c.independent),
                    transform_point(&self.second, &c.dependent),
                )
            })
            .collect()
    }
}

/// Apply a homogeneous 3x3 transform to a 2D point.
pub fn transform_point(m: &Matrix3<f64>, p: &Point) -> Point {
    let v = m * Vector3::new(p.x, p.y, 1.0);
    Point::new(v.x / v.z, v.y / v.z)
}
