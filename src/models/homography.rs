//! Plane projective transform estimated by the Direct Linear Transform.

use nalgebra::{DMatrix, Matrix3};

use crate::core::EstimatableModel;
use crate::error::DegenerateSample;
use crate::normalisation::{transform_point, Normalisations};
use crate::types::{Correspondence, Point};

use super::{NormalisableModel, PointTransformModel};

/// Homography: `x2 ~ H x1` for a 3x3 matrix `H` defined up to scale.
///
/// Estimation solves `A h = 0` over the stacked DLT constraints with the
/// null-space vector of the smallest singular value; four correspondences
/// are the minimal sample, more imply an algebraic least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyModel {
    h: Matrix3<f64>,
}

impl HomographyModel {
    pub fn new() -> Self {
        Self {
            h: Matrix3::identity(),
        }
    }

    pub fn from_matrix(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }

    pub fn set_matrix(&mut self, h: Matrix3<f64>) {
        self.h = h;
    }
}

impl Default for HomographyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatableModel for HomographyModel {
    fn num_items_to_estimate(&self) -> usize {
        4
    }

    fn estimate(&mut self, data: &[Correspondence]) -> Result<(), DegenerateSample> {
        let n = data.len();
        if n < self.num_items_to_estimate() {
            return Err(DegenerateSample);
        }

        // nalgebra's SVD is thin: `v_t` has `min(rows, cols)` rows, so a
        // wide system (the minimal 8 x 9 case) would not expose the null
        // direction. Zero rows pad the matrix square without changing its
        // right singular vectors.
        let mut a = DMatrix::<f64>::zeros((2 * n).max(9), 9);
        for (i, c) in data.iter().enumerate() {
            let (x, y) = (c.independent.x, c.independent.y);
            let (u, v) = (c.dependent.x, c.dependent.y);

            let r0 = 2 * i;
            let r1 = 2 * i + 1;

            a[(r0, 0)] = -x;
            a[(r0, 1)] = -y;
            a[(r0, 2)] = -1.0;
            a[(r0, 6)] = u * x;
            a[(r0, 7)] = u * y;
            a[(r0, 8)] = u;

            a[(r1, 3)] = -x;
            a[(r1, 4)] = -y;
            a[(r1, 5)] = -1.0;
            a[(r1, 6)] = v * x;
            a[(r1, 7)] = v * y;
            a[(r1, 8)] = v;
        }

        // Null-space vector: right singular vector of the smallest singular
        // value.
        let svd = a.svd(false, true);
        let v_t = svd.v_t.ok_or(DegenerateSample)?;
        let s = &svd.singular_values;

        // A second vanishing singular value means the constraints do not
        // pin down a unique homography (collinear or coincident points).
        if s[s.len() - 2] <= s[0] * 1e-8 {
            return Err(DegenerateSample);
        }

        let h = v_t.row(v_t.nrows() - 1);
        if h.iter().any(|v| !v.is_finite()) {
            return Err(DegenerateSample);
        }

        let mut h_mat = Matrix3::zeros();
        for r in 0..3 {
            for c in 0..3 {
                h_mat[(r, c)] = h[3 * r + c];
            }
        }

        // Collinear or coincident points leave the system rank-deficient
        // beyond the expected single null direction.
        if h_mat.determinant().abs() < 1e-10 {
            return Err(DegenerateSample);
        }

        let scale = h_mat[(2, 2)];
        if scale.abs() > f64::EPSILON {
            h_mat /= scale;
        }

        self.h = h_mat;
        Ok(())
    }

    fn predict(&self, independent: &Point) -> Option<Point> {
        Some(transform_point(&self.h, independent))
    }
}

impl NormalisableModel for HomographyModel {
    fn denormalise(&mut self, norms: &Normalisations) {
        // H was estimated between conditioned frames: x2n = Hn x1n with
        // x1n = T1 x1 and x2n = T2 x2, so H = T2^-1 Hn T1.
        if let Some(t2_inv) = norms.second.try_inverse() {
            self.h = t2_inv * self.h * norms.first;
            let scale = self.h[(2, 2)];
            if scale.abs() > f64::EPSILON {
                self.h /= scale;
            }
        }
    }
}

impl PointTransformModel for HomographyModel {
    fn transform(&self) -> &Matrix3<f64> {
        &self.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square_to(scale: f64) -> Vec<Correspondence> {
        vec![
            Correspondence::from_coords(0.0, 0.0, 0.0, 0.0),
            Correspondence::from_coords(1.0, 0.0, scale, 0.0),
            Correspondence::from_coords(1.0, 1.0, scale, scale),
            Correspondence::from_coords(0.0, 1.0, 0.0, scale),
        ]
    }

    #[test]
    fn minimal_sample_recovers_scaling() {
        let mut model = HomographyModel::new();
        model.estimate(&unit_square_to(2.0)).unwrap();

        assert_relative_eq!(model.matrix()[(0, 0)], 2.0, epsilon = 1e-8);
        assert_relative_eq!(model.matrix()[(1, 1)], 2.0, epsilon = 1e-8);
        assert_relative_eq!(model.matrix()[(2, 2)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn minimal_sample_recovers_projective_map() {
        // A genuinely projective map: non-zero perspective row.
        let apply = |x: f64, y: f64| {
            let w = 1e-3 * x - 2e-3 * y + 1.0;
            ((x + 0.1 * y + 5.0) / w, (0.2 * x + 0.9 * y - 2.0) / w)
        };
        let data: Vec<_> = [(0.0, 0.0), (40.0, 0.0), (40.0, 30.0), (0.0, 30.0)]
            .iter()
            .map(|&(x, y)| {
                let (u, v) = apply(x, y);
                Correspondence::from_coords(x, y, u, v)
            })
            .collect();

        let mut model = HomographyModel::new();
        model.estimate(&data).unwrap();

        // Four correspondences determine the map exactly; check it on a
        // point that was not part of the sample.
        let (u, v) = apply(17.0, 11.0);
        let p = model.predict(&Point::new(17.0, 11.0)).unwrap();
        assert_relative_eq!(p.x, u, epsilon = 1e-6);
        assert_relative_eq!(p.y, v, epsilon = 1e-6);
    }

    #[test]
    fn predict_applies_transform() {
        let mut model = HomographyModel::new();
        model.estimate(&unit_square_to(3.0)).unwrap();

        let p = model.predict(&Point::new(0.5, 0.5)).unwrap();
        assert_relative_eq!(p.x, 1.5, epsilon = 1e-8);
        assert_relative_eq!(p.y, 1.5, epsilon = 1e-8);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let data: Vec<_> = (0..4)
            .map(|i| Correspondence::from_coords(i as f64, i as f64, i as f64, i as f64))
            .collect();
        let mut model = HomographyModel::new();
        assert!(model.estimate(&data).is_err());
    }

    #[test]
    fn too_few_points_are_rejected() {
        let mut model = HomographyModel::new();
        assert!(model.estimate(&unit_square_to(2.0)[..3]).is_err());
    }

    #[test]
    fn failed_estimate_keeps_previous_parameters() {
        let mut model = HomographyModel::new();
        model.estimate(&unit_square_to(2.0)).unwrap();
        let before = *model.matrix();

        let degenerate: Vec<_> = (0..4)
            .map(|i| Correspondence::from_coords(i as f64, 0.0, i as f64, 0.0))
            .collect();
        assert!(model.estimate(&degenerate).is_err());
        assert_eq!(*model.matrix(), before);
    }

    #[test]
    fn denormalise_round_trips_conditioning() {
        // Ground truth: x2 = 2 x1 + (7, -3).
        let data: Vec<_> = (0..12)
            .map(|i| {
                let x = (i % 4) as f64 * 13.0 + 50.0;
                let y = (i / 4) as f64 * 9.0 + 20.0;
                Correspondence::from_coords(x, y, 2.0 * x + 7.0, 2.0 * y - 3.0)
            })
            .collect();

        let norms = Normalisations::of(&data);
        let normed = norms.apply(&data);

        let mut model = HomographyModel::new();
        model.estimate(&normed).unwrap();
        model.denormalise(&norms);

        for c in &data {
            let p = model.predict(&c.independent).unwrap();
            assert_relative_eq!(p.x, c.dependent.x, epsilon = 1e-6);
            assert_relative_eq!(p.y, c.dependent.y, epsilon = 1e-6);
        }
    }
}
