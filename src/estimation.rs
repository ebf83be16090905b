//! High-level robust estimation of geometric transforms.

use crate::core::ModelFitting;
use crate::error::FitError;
use crate::lmeds::Lmeds;
use crate::models::{AffineModel, FundamentalModel, HomographyModel, NormalisableModel};
use crate::normalisation::Normalisations;
use crate::ransac::{ProbabilisticMinInliers, Ransac};
use crate::refine::{InlierRefit, Refinement};
use crate::residuals::{SampsonResidual, SingleImageTransferResidual, SymmetricTransferResidual};
use crate::samplers::{BucketingSampler2d, UniformSampler};
use crate::settings::{LmedsParams, RansacParams};
use crate::types::{Correspondence, FitOutcome};

/// Robust transform estimator tying the whole pipeline together.
///
/// A fit runs in five steps: condition the correspondences
/// ([`Normalisations`]), run the robust search on the conditioned data, map
/// the inlier partition back to the original indices, denormalise the model
/// parameters, and refine the model on the original-frame inliers. The
/// search algorithm and the refinement are trait objects, so any
/// [`ModelFitting`] and [`Refinement`] combination plugs in.
///
/// Note that RANSAC thresholds are applied in the conditioned frame, where
/// the point clouds are centred with spread `sqrt(2)`.
pub struct RobustTransformEstimator<M: NormalisableModel> {
    fitter: Box<dyn ModelFitting<M>>,
    refinement: Box<dyn Refinement<M>>,
    model: M,
    inliers: Vec<usize>,
    outliers: Vec<usize>,
}

impl<M: NormalisableModel> RobustTransformEstimator<M> {
    pub fn new(
        model: M,
        fitter: Box<dyn ModelFitting<M>>,
        refinement: Box<dyn Refinement<M>>,
    ) -> Self {
        Self {
            fitter,
            refinement,
            model,
            inliers: Vec::new(),
            outliers: Vec::new(),
        }
    }

    /// Fit the transform to `data`.
    ///
    /// Errors only when fewer correspondences are supplied than a minimal
    /// sample needs; a failed robust search degrades to a non-robust fit
    /// over all the data, reported through the returned [`FitOutcome`].
    pub fn fit(&mut self, data: &[Correspondence]) -> Result<FitOutcome, FitError> {
        let required = self.fitter.num_items_to_estimate();
        if data.len() < required {
            return Err(FitError::InsufficientData {
                required,
                provided: data.len(),
            });
        }

        let norms = Normalisations::of(data);
        let conditioned = norms.apply(data);

        let outcome = self.fitter.fit_data(&conditioned)?;

        // Conditioning preserves order, so the indices map straight back.
        self.inliers.clear();
        self.inliers.extend_from_slice(self.fitter.inliers());
        self.outliers.clear();
        self.outliers.extend_from_slice(self.fitter.outliers());

        let mut model = self.fitter.model().clone();
        model.denormalise(&norms);

        if outcome.is_robust() {
            self.refinement.refine(&mut model, data, &self.inliers);
        }
        self.model = model;

        log::debug!(
            "fit {:?}: {} inliers / {} correspondences",
            outcome,
            self.inliers.len(),
            data.len()
        );
        Ok(outcome)
    }

    /// The fitted model from the last [`fit`](Self::fit), in the original
    /// coordinate frame.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Indices into the last input that formed the consensus set.
    pub fn inliers(&self) -> &[usize] {
        &self.inliers
    }

    /// Indices into the last input outside the consensus set.
    pub fn outliers(&self) -> &[usize] {
        &self.outliers
    }
}

fn bucketing_sampler(seed: Option<u64>) -> BucketingSampler2d {
    match seed {
        Some(s) => BucketingSampler2d::from_seed(s),
        None => BucketingSampler2d::new(),
    }
}

fn uniform_sampler(seed: Option<u64>) -> UniformSampler {
    match seed {
        Some(s) => UniformSampler::from_seed(s),
        None => UniformSampler::new(),
    }
}

impl RobustTransformEstimator<HomographyModel> {
    /// Homography estimation with RANSAC: symmetric transfer residual,
    /// spatially-bucketed sampling, adaptive stopping at
    /// `params.confidence`.
    pub fn homography_ransac(params: RansacParams) -> Self {
        let fitter = Ransac::new(
            HomographyModel::new(),
            SymmetricTransferResidual,
            bucketing_sampler(params.seed),
            ProbabilisticMinInliers::new(params.confidence),
            params,
        );
        Self::new(HomographyModel::new(), Box::new(fitter), Box::new(InlierRefit))
    }

    /// Homography estimation with LMedS; no threshold required.
    pub fn homography_lmeds(params: LmedsParams) -> Self {
        let fitter = Lmeds::new(
            HomographyModel::new(),
            SymmetricTransferResidual,
            bucketing_sampler(params.seed),
            params,
        );
        Self::new(HomographyModel::new(), Box::new(fitter), Box::new(InlierRefit))
    }
}

impl RobustTransformEstimator<AffineModel> {
    /// Affine estimation with RANSAC: forward transfer residual and
    /// spatially-bucketed sampling.
    pub fn affine_ransac(params: RansacParams) -> Self {
        let fitter = Ransac::new(
            AffineModel::new(),
            SingleImageTransferResidual,
            bucketing_sampler(params.seed),
            ProbabilisticMinInliers::new(params.confidence),
            params,
        );
        Self::new(AffineModel::new(), Box::new(fitter), Box::new(InlierRefit))
    }

    /// Affine estimation with LMedS; no threshold required.
    pub fn affine_lmeds(params: LmedsParams) -> Self {
        let fitter = Lmeds::new(
            AffineModel::new(),
            SingleImageTransferResidual,
            bucketing_sampler(params.seed),
            params,
        );
        Self::new(AffineModel::new(), Box::new(fitter), Box::new(InlierRefit))
    }
}

impl RobustTransformEstimator<FundamentalModel> {
    /// Fundamental matrix estimation with RANSAC: Sampson residual and
    /// uniform sampling.
    pub fn fundamental_ransac(params: RansacParams) -> Self {
        let fitter = Ransac::new(
            FundamentalModel::new(),
            SampsonResidual,
            uniform_sampler(params.seed),
            ProbabilisticMinInliers::new(params.confidence),
            params,
        );
        Self::new(
            FundamentalModel::new(),
            Box::new(fitter),
            Box::new(InlierRefit),
        )
    }

    /// Fundamental matrix estimation with LMedS; no threshold required.
    pub fn fundamental_lmeds(params: LmedsParams) -> Self {
        let fitter = Lmeds::new(
            FundamentalModel::new(),
            SampsonResidual,
            uniform_sampler(params.seed),
            params,
        );
        Self::new(
            FundamentalModel::new(),
            Box::new(fitter),
            Box::new(InlierRefit),
        )
    }
}
