//! End-to-end tests of the robust estimation pipeline.

use approx::assert_relative_eq;
use nalgebra::Matrix3;
use robustfit::{
    AffineModel, Correspondence, FitError, FitOutcome, LmedsParams, NoRefinement,
    PercentageInliers, Ransac, RansacParams, RobustTransformEstimator, SingleImageTransferResidual,
    UniformSampler,
};

/// Ground-truth homography with a mild projective component.
fn true_homography() -> Matrix3<f64> {
    Matrix3::new(
        1.1, 0.02, 5.0, //
        0.01, 0.95, -3.0, //
        1e-4, -2e-4, 1.0,
    )
}

fn apply_homography(h: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    let w = h[(2, 0)] * x + h[(2, 1)] * y + h[(2, 2)];
    (
        (h[(0, 0)] * x + h[(0, 1)] * y + h[(0, 2)]) / w,
        (h[(1, 0)] * x + h[(1, 1)] * y + h[(1, 2)]) / w,
    )
}

/// 35 exact correspondences under the ground-truth homography followed by
/// 15 gross outliers (30% contamination).
fn homography_scene() -> (Vec<Correspondence>, usize) {
    let h = true_homography();
    let mut data = Vec::new();
    for i in 0..7 {
        for j in 0..5 {
            let x = i as f64 * 15.0;
            let y = j as f64 * 15.0;
            let (u, v) = apply_homography(&h, x, y);
            data.push(Correspondence::from_coords(x, y, u, v));
        }
    }
    let clean = data.len();
    for i in 0..15 {
        let x = 10.0 + i as f64 * 5.0;
        let y = 30.0 + (i % 4) as f64 * 7.0;
        // Far from any plausible prediction.
        data.push(Correspondence::from_coords(
            x,
            y,
            -200.0 - i as f64 * 11.0,
            300.0 + i as f64 * 13.0,
        ));
    }
    (data, clean)
}

#[test]
fn homography_ransac_rejects_thirty_percent_outliers() {
    let (data, clean) = homography_scene();
    let params = RansacParams {
        threshold: 1e-6,
        ..RansacParams::default().seeded(42)
    };
    let mut estimator = RobustTransformEstimator::homography_ransac(params);

    let outcome = estimator.fit(&data).unwrap();
    assert_eq!(outcome, FitOutcome::Robust);

    // Exact inliers and gross outliers: the partition must be perfect.
    assert_eq!(estimator.inliers().len(), clean);
    assert!(estimator.inliers().iter().all(|&i| i < clean));
    assert!(estimator.outliers().iter().all(|&i| i >= clean));

    let truth = true_homography();
    let fitted = estimator.model().matrix();
    for r in 0..3 {
        for c in 0..3 {
            assert_relative_eq!(fitted[(r, c)], truth[(r, c)], epsilon = 1e-6);
        }
    }
}

#[test]
fn homography_ransac_is_deterministic_for_a_fixed_seed() {
    let (data, _) = homography_scene();
    let run = || {
        let params = RansacParams {
            threshold: 1e-6,
            ..RansacParams::default().seeded(9)
        };
        let mut estimator = RobustTransformEstimator::homography_ransac(params);
        estimator.fit(&data).unwrap();
        (*estimator.model().matrix(), estimator.inliers().to_vec())
    };
    assert_eq!(run(), run());
}

#[test]
fn homography_lmeds_needs_no_threshold() {
    let h = true_homography();
    let mut data = Vec::new();
    for i in 0..7 {
        for j in 0..5 {
            let x = i as f64 * 15.0;
            let y = j as f64 * 15.0;
            let (u, v) = apply_homography(&h, x, y);
            let idx = (i * 5 + j) as f64;
            data.push(Correspondence::from_coords(
                x,
                y,
                u + 1e-3 * idx.sin(),
                v + 1e-3 * idx.cos(),
            ));
        }
    }
    let clean = data.len();
    for i in 0..15 {
        data.push(Correspondence::from_coords(
            20.0 + i as f64 * 4.0,
            10.0 + i as f64 * 6.0,
            400.0 + i as f64 * 9.0,
            -250.0 - i as f64 * 8.0,
        ));
    }

    let mut estimator =
        RobustTransformEstimator::homography_lmeds(LmedsParams::default().seeded(5));
    let outcome = estimator.fit(&data).unwrap();

    assert!(outcome.is_robust());
    assert!(estimator.inliers().iter().all(|&i| i < clean));
    assert!(estimator.inliers().len() >= clean - 4);

    let fitted = estimator.model().matrix();
    assert_relative_eq!(fitted[(0, 2)], 5.0, epsilon = 1e-2);
    assert_relative_eq!(fitted[(1, 2)], -3.0, epsilon = 1e-2);
}

/// Two views of a synthetic scene: second camera shifted along x, identity
/// intrinsics, irregular depths. 16 exact pairs plus 6 outliers whose
/// dependent point is pushed off its epipolar line.
fn stereo_scene() -> (Vec<Correspondence>, usize) {
    let mut data = Vec::new();
    for i in 0..4 {
        for j in 0..4 {
            let x = i as f64 - 1.5 + 0.21 * ((i * 3 + j * 2) % 5) as f64;
            let y = j as f64 - 1.5 + 0.17 * ((i * 2 + j) % 4) as f64;
            let z = 4.0 + 0.37 * ((i * 5 + j * 3) % 7) as f64;
            data.push(Correspondence::from_coords(
                x / z,
                y / z,
                (x - 1.0) / z,
                y / z,
            ));
        }
    }
    let clean = data.len();
    for i in 0..6 {
        let src = data[i * 2];
        data.push(Correspondence::from_coords(
            src.independent.x + 0.05,
            src.independent.y - 0.03,
            src.dependent.x + 0.1,
            src.dependent.y + 0.4 + 0.07 * i as f64,
        ));
    }
    (data, clean)
}

#[test]
fn fundamental_ransac_rejects_off_epipolar_matches() {
    let (data, clean) = stereo_scene();
    let params = RansacParams {
        threshold: 1e-4,
        max_iterations: 2000,
        ..RansacParams::default().seeded(17)
    };
    let mut estimator = RobustTransformEstimator::fundamental_ransac(params);

    let outcome = estimator.fit(&data).unwrap();
    assert_eq!(outcome, FitOutcome::Robust);
    assert_eq!(estimator.inliers().len(), clean);
    assert!(estimator.outliers().iter().all(|&i| i >= clean));

    // Pure x-translation with identity intrinsics gives y2 = y1, i.e.
    // F ~ skew((1, 0, 0)). Check the epipolar constraint on the inliers.
    let f = estimator.model().matrix();
    let f_norm = f.norm();
    for &i in estimator.inliers() {
        let c = &data[i];
        let x1 = nalgebra::Vector3::new(c.independent.x, c.independent.y, 1.0);
        let x2 = nalgebra::Vector3::new(c.dependent.x, c.dependent.y, 1.0);
        let residual = (x2.transpose() * f * x1)[(0, 0)].abs() / f_norm;
        assert!(residual < 1e-6, "inlier {i} violates epipolar constraint");
    }
}

#[test]
fn structureless_data_degrades_to_non_robust_fit() {
    // Scattered correspondences with no common transform.
    let data: Vec<Correspondence> = (0..20)
        .map(|i| {
            let t = i as f64;
            Correspondence::from_coords(
                10.0 * (1.3 * t).sin(),
                10.0 * (2.7 * t).cos(),
                10.0 * (5.1 * t + 1.0).sin(),
                10.0 * (3.9 * t + 2.0).cos(),
            )
        })
        .collect();

    let params = RansacParams {
        threshold: 1e-9,
        max_iterations: 200,
        ..RansacParams::default()
    };
    let fitter = Ransac::new(
        AffineModel::new(),
        SingleImageTransferResidual,
        UniformSampler::from_seed(13),
        PercentageInliers::new(0.8),
        params,
    );
    let mut estimator = RobustTransformEstimator::new(
        AffineModel::new(),
        Box::new(fitter),
        Box::new(NoRefinement),
    );

    let outcome = estimator.fit(&data).unwrap();
    assert_eq!(outcome, FitOutcome::NonRobust);
    assert!(!outcome.is_robust());
    // The degraded fit reports everything as inlier.
    assert_eq!(estimator.inliers().len(), data.len());
    assert!(estimator.outliers().is_empty());
}

/// 30 noisy correspondences under x2 = 2 x1 + (1, -3), no outliers.
fn clean_noisy_affine() -> Vec<Correspondence> {
    (0..30)
        .map(|i| {
            let x = (i % 6) as f64 * 8.0;
            let y = (i / 6) as f64 * 8.0;
            let t = i as f64;
            Correspondence::from_coords(
                x,
                y,
                2.0 * x + 1.0 + 1e-3 * (1.7 * t).sin(),
                2.0 * y - 3.0 + 1e-3 * (2.3 * t).cos(),
            )
        })
        .collect()
}

#[test]
fn clean_data_is_fully_inlier_under_ransac() {
    let data = clean_noisy_affine();
    let params = RansacParams {
        threshold: 1e-4,
        ..RansacParams::default().seeded(11)
    };
    let mut estimator = RobustTransformEstimator::affine_ransac(params);

    let outcome = estimator.fit(&data).unwrap();
    assert!(outcome.is_robust());
    assert_eq!(estimator.inliers().len(), data.len());
    assert!(estimator.outliers().is_empty());

    let m = estimator.model().matrix();
    assert_relative_eq!(m[(0, 0)], 2.0, epsilon = 1e-3);
    assert_relative_eq!(m[(0, 2)], 1.0, epsilon = 1e-2);
    assert_relative_eq!(m[(1, 2)], -3.0, epsilon = 1e-2);
}

#[test]
fn clean_data_is_fully_inlier_under_lmeds() {
    let data = clean_noisy_affine();
    let mut estimator = RobustTransformEstimator::affine_lmeds(LmedsParams::default().seeded(11));

    let outcome = estimator.fit(&data).unwrap();
    assert!(outcome.is_robust());
    assert_eq!(estimator.inliers().len(), data.len());

    let m = estimator.model().matrix();
    assert_relative_eq!(m[(1, 1)], 2.0, epsilon = 1e-3);
    assert_relative_eq!(m[(1, 2)], -3.0, epsilon = 1e-2);
}

#[test]
fn inliers_and_outliers_partition_the_input() {
    let (data, _) = homography_scene();
    let params = RansacParams {
        threshold: 1e-6,
        ..RansacParams::default().seeded(3)
    };
    let mut estimator = RobustTransformEstimator::homography_ransac(params);
    estimator.fit(&data).unwrap();

    let mut seen = vec![false; data.len()];
    for &i in estimator.inliers().iter().chain(estimator.outliers()) {
        assert!(!seen[i], "index {i} reported twice");
        seen[i] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn too_few_correspondences_is_a_hard_error() {
    let data: Vec<Correspondence> = (0..3)
        .map(|i| Correspondence::from_coords(i as f64, 0.0, i as f64, 1.0))
        .collect();

    let mut estimator = RobustTransformEstimator::homography_ransac(RansacParams::default());
    assert_eq!(
        estimator.fit(&data),
        Err(FitError::InsufficientData {
            required: 4,
            provided: 3
        })
    );
}
