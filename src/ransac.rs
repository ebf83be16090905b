//! RANSAC: hypothesise-and-verify consensus maximisation.

use crate::core::{EstimatableModel, ModelFitting, ResidualCalculator, Sampler, StoppingCondition};
use crate::error::FitError;
use crate::settings::RansacParams;
use crate::types::{Correspondence, FitOutcome};

/// Random sample consensus over a pluggable model, residual, sampler and
/// stopping condition.
///
/// Each iteration draws a minimal sample, estimates a hypothesis from it and
/// counts the correspondences whose squared residual is within the
/// threshold. The best hypothesis is the one with the largest consensus set,
/// ties broken by the smaller inlier residual sum. The stopping condition
/// may cut the search short; it also has the final say on whether the best
/// consensus qualifies as a robust fit.
///
/// When no hypothesis qualifies the model is refitted over all the data and
/// [`FitOutcome::NonRobust`] is reported; `fit_data` only errors when fewer
/// correspondences are supplied than a minimal sample needs.
pub struct Ransac<M, R, S, C> {
    model: M,
    residual: R,
    sampler: S,
    stopping: C,
    params: RansacParams,
    inliers: Vec<usize>,
    outliers: Vec<usize>,
}

impl<M, R, S, C> Ransac<M, R, S, C>
where
    M: EstimatableModel,
    R: ResidualCalculator<M>,
    S: Sampler,
    C: StoppingCondition,
{
    pub fn new(model: M, residual: R, sampler: S, stopping: C, params: RansacParams) -> Self {
        Self {
            model,
            residual,
            sampler,
            stopping,
            params,
            inliers: Vec::new(),
            outliers: Vec::new(),
        }
    }

    pub fn params(&self) -> &RansacParams {
        &self.params
    }

    /// Least-squares fit over everything; the degraded path when the search
    /// finds no consensus.
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

impl<M, R, S, C> ModelFitting<M> for Ransac<M, R, S, C>
where
    M: EstimatableModel,
    R: ResidualCalculator<M>,
    S: Sampler,
    C: StoppingCondition,
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

        if !self.stopping.init(data, k) {
            log::debug!("stopping condition unsatisfiable for {n} correspondences");
            return Ok(self.fallback_fit(data));
        }

        let mut indices = vec![0usize; k];
        let mut sample: Vec<Correspondence> = Vec::with_capacity(k);
        let mut residuals = vec![0.0_f64; n];
        let mut mask = vec![false; n];

        let mut best: Option<M> = None;
        let mut best_mask = vec![false; n];
        let mut best_count = 0usize;
        let mut best_sum = f64::INFINITY;

        for iteration in 0..self.params.max_iterations {
            if !self.sampler.sample(data, k, &mut indices) {
                continue;
            }
            sample.clear();
            sample.extend(indices.iter().map(|&i| data[i]));
            if self.model.estimate(&sample).is_err() {
                continue;
            }

            self.residual.residuals(&self.model, data, &mut residuals);
            let mut count = 0usize;
            let mut sum = 0.0;
            for (flag, &r) in mask.iter_mut().zip(&residuals) {
                *flag = r <= self.params.threshold;
                if *flag {
                    count += 1;
                    sum += r;
                }
            }

            if count > best_count || (count == best_count && sum < best_sum) {
                best = Some(self.model.clone());
                best_mask.copy_from_slice(&mask);
                best_count = count;
                best_sum = sum;
                log::trace!("iteration {iteration}: consensus {count}, residual sum {sum:.3e}");
            }

            if self.stopping.should_stop(best_count, iteration) {
                log::debug!(
                    "stopping after {} iterations with {best_count} inliers",
                    iteration + 1
                );
                break;
            }
        }

        match best {
            Some(model) if best_count >= k && self.stopping.final_fit(best_count) => {
                self.model = model;
                self.inliers.clear();
                self.outliers.clear();
                for (i, &flag) in best_mask.iter().enumerate() {
                    if flag {
                        self.inliers.push(i);
                    } else {
                        self.outliers.push(i);
                    }
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
            _ => Ok(self.fallback_fit(data)),
        }
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

/// Stop once the consensus set reaches an absolute size.
#[derive(Debug, Clone, Copy)]
pub struct NumberInliers {
    limit: usize,
}

impl NumberInliers {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl StoppingCondition for NumberInliers {
    fn init(&mut self, data: &[Correspondence], num_items_to_estimate: usize) -> bool {
        self.limit >= num_items_to_estimate && self.limit <= data.len()
    }

    fn should_stop(&mut self, best_num_inliers: usize, _iteration: usize) -> bool {
        best_num_inliers >= self.limit
    }

    fn final_fit(&self, best_num_inliers: usize) -> bool {
        best_num_inliers >= self.limit
    }
}

/// Stop once the consensus set covers a fraction of the data.
#[derive(Debug, Clone, Copy)]
pub struct PercentageInliers {
    percentage: f64,
    limit: usize,
}

impl PercentageInliers {
    /// `percentage` is a fraction in `(0, 1]`.
    pub fn new(percentage: f64) -> Self {
        Self {
            percentage,
            limit: usize::MAX,
        }
    }
}

impl StoppingCondition for PercentageInliers {
    fn init(&mut self, data: &[Correspondence], num_items_to_estimate: usize) -> bool {
        if !(0.0..=1.0).contains(&self.percentage) {
            return false;
        }
        self.limit = (self.percentage * data.len() as f64).ceil() as usize;
        self.limit = self.limit.max(num_items_to_estimate);
        self.limit <= data.len()
    }

    fn should_stop(&mut self, best_num_inliers: usize, _iteration: usize) -> bool {
        best_num_inliers >= self.limit
    }

    fn final_fit(&self, best_num_inliers: usize) -> bool {
        best_num_inliers >= self.limit
    }
}

/// Never stop early; whatever hypothesis wins the full iteration budget is
/// accepted (provided it reached a minimal consensus).
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit;

impl StoppingCondition for BestFit {
    fn init(&mut self, _data: &[Correspondence], _num_items_to_estimate: usize) -> bool {
        true
    }

    fn should_stop(&mut self, _best_num_inliers: usize, _iteration: usize) -> bool {
        false
    }

    fn final_fit(&self, _best_num_inliers: usize) -> bool {
        true
    }
}

/// Adaptive stopping: run until an all-inlier sample has been drawn with
/// the requested confidence, given the inlier ratio observed so far.
///
/// The required iteration count `log(1 - confidence) / log(1 - w^k)` shrinks
/// as the best consensus grows, so clean data stops in a handful of
/// iterations while contaminated data keeps searching.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilisticMinInliers {
    confidence: f64,
    sample_size: usize,
    data_len: usize,
}

impl ProbabilisticMinInliers {
    /// `confidence` is a probability in `(0, 1)`, typically `0.99`.
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence,
            sample_size: 0,
            data_len: 0,
        }
    }
}

impl StoppingCondition for ProbabilisticMinInliers {
    fn init(&mut self, data: &[Correspondence], num_items_to_estimate: usize) -> bool {
        if !(0.0..1.0).contains(&self.confidence) {
            return false;
        }
        self.sample_size = num_items_to_estimate;
        self.data_len = data.len();
        true
    }

    fn should_stop(&mut self, best_num_inliers: usize, iteration: usize) -> bool {
        if best_num_inliers == 0 {
            return false;
        }
        let w = best_num_inliers as f64 / self.data_len as f64;
        let clean_sample = w.powi(self.sample_size as i32);
        if clean_sample >= 1.0 {
            return true;
        }
        let required = (1.0 - self.confidence).ln() / (1.0 - clean_sample).ln();
        (iteration + 1) as f64 >= required
    }

    fn final_fit(&self, _best_num_inliers: usize) -> bool {
        true
    }
}
