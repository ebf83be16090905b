//! Robust fitting of 2D geometric transforms from point correspondences.
//!
//! The crate estimates homographies, affine transforms and fundamental
//! matrices from correspondence sets contaminated with outliers. Two
//! robust search algorithms are provided, [`Ransac`] and [`Lmeds`], both
//! written against a small set of traits ([`EstimatableModel`],
//! [`ResidualCalculator`], [`Sampler`], [`StoppingCondition`]) so that
//! custom models and sampling policies plug in without touching the
//! search loops.
//!
//! [`RobustTransformEstimator`] is the front door: it conditions the data
//! for numerical stability, runs the robust search, maps the resulting
//! model and inlier partition back to the original coordinate frame, and
//! refines the model over the consensus set. When no consensus exists the
//! estimators degrade to a least-squares fit over all the data and report
//! [`FitOutcome::NonRobust`] instead of failing.
//!
//! # Example
//!
//! ```
//! use robustfit::{Correspondence, RansacParams, RobustTransformEstimator};
//!
//! // x2 = 2 x1 + (3, -1), plus one gross outlier.
//! let mut data: Vec<Correspondence> = (0..12)
//!     .map(|i| {
//!         let x = (i % 4) as f64 * 10.0;
//!         let y = (i / 4) as f64 * 10.0;
//!         Correspondence::from_coords(x, y, 2.0 * x + 3.0, 2.0 * y - 1.0)
//!     })
//!     .collect();
//! data.push(Correspondence::from_coords(5.0, 5.0, 900.0, -700.0));
//!
//! let mut estimator =
//!     RobustTransformEstimator::affine_ransac(RansacParams::default().seeded(7));
//! let outcome = estimator.fit(&data)?;
//!
//! assert!(outcome.is_robust());
//! assert_eq!(estimator.inliers().len(), 12);
//! assert_eq!(estimator.outliers(), &[12]);
//! # Ok::<(), robustfit::FitError>(())
//! ```

pub mod core;
pub mod error;
pub mod estimation;
pub mod lmeds;
pub mod models;
pub mod normalisation;
pub mod ransac;
pub mod refine;
pub mod residuals;
pub mod samplers;
pub mod settings;
pub mod types;

pub use crate::core::{
    EstimatableModel, ModelFitting, ResidualCalculator, Sampler, StoppingCondition,
};
pub use crate::error::{DegenerateSample, FitError};
pub use crate::estimation::RobustTransformEstimator;
pub use crate::lmeds::Lmeds;
pub use crate::models::{
    AffineModel, FundamentalModel, HomographyModel, NormalisableModel, PointTransformModel,
};
pub use crate::normalisation::Normalisations;
pub use crate::ransac::{
    BestFit, NumberInliers, PercentageInliers, ProbabilisticMinInliers, Ransac,
};
pub use crate::refine::{InlierRefit, NoRefinement, Refinement};
pub use crate::residuals::{
    AlgebraicResidual, SampsonResidual, SingleImageTransferResidual, SymmetricTransferResidual,
};
pub use crate::samplers::{BucketingSampler2d, UniformSampler};
pub use crate::settings::{LmedsParams, RansacParams};
pub use crate::types::{Correspondence, FitOutcome, Point};
