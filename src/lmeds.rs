//! Least median of squares regression.

use std::mem;

use crate::core::{EstimatableModel, ModelFitting, ResidualCalculator, Sampler};
use crate::error::FitError;
use crate::settings::LmedsParams;
use crate::types::{Correspondence, FitOutcome};

/// Robust fit minimising the median of the squared residuals.
///
/// A fixed number of minimal samples is evaluated (see
/// [`LmedsParams::num_trials`]); the hypothesis with the smallest median
/// squared residual wins. A robust scale estimate is then derived from that
/// median and correspondences within `(2.5 sigma)^2` form the consensus
/// set. Unlike RANSAC this needs no user-supplied threshold.
///
/// When the consensus set is smaller than a minimal sample the model is
/// refitted over all the data and [`FitOutcome::NonRobust`] is reported.
pub struct Lmeds<M, R, S> {
    model: M,
    residual: R,
    sampler: S,
    params: LmedsParams,
    inliers: Vec<usize>,
    outliers: Vec<usize>,
}

impl<M, R, S> Lmeds<M, R, S>
where
    M: EstimatableModel,
    R: ResidualCalculator<M>,
    S: Sampler,
{
    pub fn new(model: M, residual: R, sampler: S, params: LmedsParams) -> Self {
        Self {
            model,
            residual,
            sampler,
            params,
            inliers: Vec::new(),
            outliers: Vec::new(),
        }
    }

    pub fn params(&self) -> &LmedsParams {
        &self.params
    }

    fn fallback_fit(&mut self, data: &[Correspondence]) -> FitOutcome {
        if self.model.estimate(data).is_err() {
            log::warn!("non-robust fallback fit is degenerate; keeping previous model");
        }
        self.inliers.clear();
        self.inliers.extend(0..data.len());
        self.outliers.clear();
        FitOutcome::NonRobust
    }
}

/// Median of an unordered slice of squared residuals. Sorts in place.
fn median_of(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

impl<M, R, S> ModelFitting<M> for Lmeds<M, R, S>
where
    M: EstimatableModel,
    R: ResidualCalculator<M>,
    S: Sampler,
{
    fn fit_data(&mut self, data: &[Correspondence]) -> Result<FitOutcome, FitError> {
        let k = self.model.num_items_to_estimate();
        let n = data.len();
        if n < k {
            return Err(FitError::InsufficientData {
                required: k,
                provided: n,
            });
        }

        let trials = self.params.num_trials(k);
        let mut indices = vec![0usize; k];
        let mut sample: Vec<Correspondence> = Vec::with_capacity(k);
        let mut residuals = vec![0.0_f64; n];
        let mut best_residuals = vec![0.0_f64; n];
        let mut scratch = vec![0.0_f64; n];

        let mut best: Option<M> = None;
        let mut best_median = f64::INFINITY;

        for trial in 0..trials {
            if !self.sampler.sample(data, k, &mut indices) {
                continue;
            }
            sample.clear();
            sample.extend(indices.iter().map(|&i| data[i]));
            if self.model.estimate(&sample).is_err() {
                continue;
            }

            self.residual.residuals(&self.model, data, &mut residuals);
            scratch.copy_from_slice(&residuals);
            let median = median_of(&mut scratch);

            if median < best_median {
                best_median = median;
                best = Some(self.model.clone());
                mem::swap(&mut best_residuals, &mut residuals);
                log::trace!("trial {trial}: new best median {median:.3e}");
            }
        }

        let Some(model) = best else {
            log::debug!("all {trials} trials degenerate");
            return Ok(self.fallback_fit(data));
        };
        self.model = model;

        // Robust scale from the winning median, with the small-sample
        // correction of Rousseeuw and Leroy.
        let correction = 1.0 + 5.0 / (n - k).max(1) as f64;
        let sigma = self.params.scale_normaliser * correction * best_median.sqrt();
        let threshold = (self.params.inlier_multiplier * sigma).powi(2);

        self.inliers.clear();
        self.outliers.clear();
        for (i, &r) in best_residuals.iter().enumerate() {
            if r <= threshold {
                self.inliers.push(i);
            } else {
                self.outliers.push(i);
            }
        }
        log::debug!(
            "median {best_median:.3e} over {trials} trials, threshold {threshold:.3e}, {} inliers",
            self.inliers.len()
        );

        if self.inliers.len() < k {
            return Ok(self.fallback_fit(data));
        }

        if self.params.improve_estimate {
            sample.clear();
            sample.extend(self.inliers.iter().map(|&i| data[i]));
            if self.model.estimate(&sample).is_err() {
                log::debug!("consensus refit degenerate; keeping sample model");
            }
        }
        Ok(FitOutcome::Robust)
    }

    fn model(&self) -> &M {
        &self.model
    }

    fn inliers(&self) -> &[usize] {
        &self.inliers
    }

    fn outliers(&self) -> &[usize] {
        &self.outliers
    }

    fn num_items_to_estimate(&self) -> usize {
        self.model.num_items_to_estimate()
    }
}
