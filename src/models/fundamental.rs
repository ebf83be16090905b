//! Fundamental matrix estimated by the 8-point algorithm.

use nalgebra::{DMatrix, Matrix3};

use crate::core::EstimatableModel;
use crate::error::DegenerateSample;
use crate::normalisation::Normalisations;
use crate::types::{Correspondence, Point};

use super::NormalisableModel;

/// Fundamental matrix: `x2^T F x1 = 0` for all true correspondences.
///
/// Estimated with the 8-point algorithm followed by rank-2 enforcement.
/// The caller is expected to feed conditioned coordinates (the robust
/// orchestrator always does); `denormalise` maps the result back.
///
/// There is no point-to-point mapping for this family, so `predict`
/// returns `None`; score it with the epipolar residuals instead.
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalModel {
    f: Matrix3<f64>,
}

impl FundamentalModel {
    pub fn new() -> Self {
        Self {
            f: Matrix3::identity(),
        }
    }

    pub fn from_matrix(f: Matrix3<f64>) -> Self {
        Self { f }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.f
    }

    pub fn set_matrix(&mut self, f: Matrix3<f64>) {
        self.f = f;
    }
}

impl Default for FundamentalModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatableModel for FundamentalModel {
    fn num_items_to_estimate(&self) -> usize {
        8
    }

    fn estimate(&mut self, data: &[Correspondence]) -> Result<(), DegenerateSample> {
        let n = data.len();
        if n < self.num_items_to_estimate() {
            return Err(DegenerateSample);
        }

        // Thin SVD: pad the minimal 8 x 9 system square with zero rows so
        // `v_t` contains the null direction.
        let mut a = DMatrix::<f64>::zeros(n.max(9), 9);
        for (i, c) in data.iter().enumerate() {
            let (x1, y1) = (c.independent.x, c.independent.y);
            let (x2, y2) = (c.dependent.x, c.dependent.y);

            a[(i, 0)] = x2 * x1;
            a[(i, 1)] = x2 * y1;
            a[(i, 2)] = x2;
            a[(i, 3)] = y2 * x1;
            a[(i, 4)] = y2 * y1;
            a[(i, 5)] = y2;
            a[(i, 6)] = x1;
            a[(i, 7)] = y1;
            a[(i, 8)] = 1.0;
        }

        let svd = a.svd(false, true);
        let v_t = svd.v_t.ok_or(DegenerateSample)?;
        let s = &svd.singular_values;

        // A second vanishing singular value means the eight constraints do
        // not determine the epipolar geometry.
        if s[s.len() - 2] <= s[0] * 1e-8 {
            return Err(DegenerateSample);
        }

        let f_vec = v_t.row(v_t.nrows() - 1);
        if f_vec.iter().any(|v| !v.is_finite()) {
            return Err(DegenerateSample);
        }

        let mut f0 = Matrix3::zeros();
        for r in 0..3 {
            for c in 0..3 {
                f0[(r, c)] = f_vec[3 * r + c];
            }
        }

        // Enforce the rank-2 constraint: zero the smallest singular value.
        let svd3 = f0.svd(true, true);
        let u = svd3.u.ok_or(DegenerateSample)?;
        let v3_t = svd3.v_t.ok_or(DegenerateSample)?;
        let mut s = svd3.singular_values;
        s[2] = 0.0;

        if s[0].abs() < 1e-12 {
            return Err(DegenerateSample);
        }

        let f = u * Matrix3::from_diagonal(&s) * v3_t;
        if f.iter().any(|v| !v.is_finite()) {
            return Err(DegenerateSample);
        }

        self.f = f;
        Ok(())
    }

    fn predict(&self, _independent: &Point) -> Option<Point> {
        None
    }
}

impl NormalisableModel for FundamentalModel {
    fn denormalise(&mut self, norms: &Normalisations) {
        // x2n^T Fn x1n = 0 with x1n = T1 x1, x2n = T2 x2, so F = T2^T Fn T1.
        self.f = norms.second.transpose() * self.f * norms.first;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    /// Residual of the epipolar constraint for a raw correspondence.
    fn epipolar_residual(f: &Matrix3<f64>, c: &Correspondence) -> f64 {
        let x1 = Vector3::new(c.independent.x, c.independent.y, 1.0);
        let x2 = Vector3::new(c.dependent.x, c.dependent.y, 1.0);
        (x2.transpose() * f * x1)[(0, 0)].abs()
    }

    /// Correspondences from two views of a synthetic 3D scene: camera one
    /// at the origin, camera two translated along x, both with identity
    /// intrinsics. The grid is jittered so every 8-point subset is in
    /// general position.
    fn stereo_pairs() -> Vec<Correspondence> {
        let mut out = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                let x = i as f64 - 1.5 + 0.21 * ((i * 3 + j * 2) % 5) as f64;
                let y = j as f64 - 1.5 + 0.17 * ((i * 2 + j) % 4) as f64;
                let z = 4.0 + 0.37 * ((i * 5 + j * 3) % 7) as f64;
                // Second camera shifted by (1, 0, 0).
                out.push(Correspondence::from_coords(
                    x / z,
                    y / z,
                    (x - 1.0) / z,
                    y / z,
                ));
            }
        }
        out
    }

    #[test]
    fn eight_point_satisfies_epipolar_constraint() {
        let data = stereo_pairs();
        let mut model = FundamentalModel::new();
        model.estimate(&data).unwrap();

        for c in &data {
            assert!(
                epipolar_residual(model.matrix(), c) < 1e-8,
                "epipolar constraint violated"
            );
        }
    }

    #[test]
    fn minimal_eight_point_sample_is_exact() {
        let data = stereo_pairs();
        let mut model = FundamentalModel::new();
        model.estimate(&data[..8]).unwrap();

        // Eight generic correspondences pin the matrix down exactly; the
        // recovered geometry must hold for the points outside the sample
        // too.
        let f_norm = model.matrix().norm();
        for c in &data[..8] {
            assert!(epipolar_residual(model.matrix(), c) / f_norm < 1e-10);
        }
        for c in &data[8..] {
            assert!(epipolar_residual(model.matrix(), c) / f_norm < 1e-8);
        }
    }

    #[test]
    fn estimated_matrix_is_rank_two() {
        let data = stereo_pairs();
        let mut model = FundamentalModel::new();
        model.estimate(&data).unwrap();

        let s = model.matrix().svd(false, false).singular_values;
        assert!(s[2].abs() < 1e-10 * s[0].abs().max(1.0));
    }

    #[test]
    fn predict_is_undefined() {
        let model = FundamentalModel::new();
        assert!(model.predict(&Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn too_few_points_are_rejected() {
        let data = stereo_pairs();
        let mut model = FundamentalModel::new();
        assert!(model.estimate(&data[..7]).is_err());
    }

    #[test]
    fn denormalised_matrix_fits_raw_coordinates() {
        // Same scene in pixel-like coordinates.
        let data: Vec<_> = stereo_pairs()
            .iter()
            .map(|c| {
                Correspondence::from_coords(
                    c.independent.x * 300.0 + 320.0,
                    c.independent.y * 300.0 + 240.0,
                    c.dependent.x * 300.0 + 320.0,
                    c.dependent.y * 300.0 + 240.0,
                )
            })
            .collect();

        let norms = Normalisations::of(&data);
        let normed = norms.apply(&data);

        let mut model = FundamentalModel::new();
        model.estimate(&normed).unwrap();
        model.denormalise(&norms);

        // Scale-invariant check: residuals relative to the matrix norm.
        let f_norm = model.matrix().norm();
        for c in &data {
            assert_relative_eq!(
                epipolar_residual(model.matrix(), c) / f_norm,
                0.0,
                epsilon = 1e-6
            );
        }
    }
}
