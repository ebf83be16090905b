//! Tuning parameters for the fitting algorithms.

/// Parameters of the RANSAC search.
///
/// The inlier `threshold` is compared against squared residuals, and is
/// applied in the conditioned coordinate frame when the search runs under
/// [`RobustTransformEstimator`](crate::estimation::RobustTransformEstimator).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RansacParams {
    /// Inlier threshold on the squared residual.
    pub threshold: f64,
    /// Hard cap on the number of hypothesise-and-verify iterations.
    pub max_iterations: usize,
    /// Target probability of having seen one all-inlier sample; consumed by
    /// the adaptive stopping condition built by the convenience
    /// constructors.
    pub confidence: f64,
    /// Refit the accepted model by least squares over its consensus set.
    pub improve_estimate: bool,
    /// Seed for the sampler; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl RansacParams {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Use a fixed seed so repeated runs draw identical samples.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            max_iterations: 1000,
            confidence: 0.99,
            improve_estimate: true,
            seed: None,
        }
    }
}

/// Parameters of the least-median-of-squares search.
///
/// The number of trials is fixed up front from the assumed outlier
/// proportion: enough that at least one all-inlier sample is drawn with the
/// requested probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmedsParams {
    /// Assumed fraction of outliers in the data, in `(0, 1)`.
    pub outlier_proportion: f64,
    /// Requested probability of drawing one uncontaminated sample.
    pub probability: f64,
    /// Asymptotic consistency constant relating the median absolute
    /// deviation to a Gaussian standard deviation.
    pub scale_normaliser: f64,
    /// Inliers lie within `(inlier_multiplier * sigma)^2` of the model.
    pub inlier_multiplier: f64,
    /// Refit the accepted model by least squares over its consensus set.
    pub improve_estimate: bool,
    /// Seed for the sampler; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl LmedsParams {
    /// Use a fixed seed so repeated runs draw identical samples.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of minimal samples of size `sample_size` to evaluate.
    pub fn num_trials(&self, sample_size: usize) -> usize {
        let clean_sample = (1.0 - self.outlier_proportion).powi(sample_size as i32);
        if clean_sample >= 1.0 {
            return 1;
        }
        let trials = (1.0 - self.probability).ln() / (1.0 - clean_sample).ln();
        trials.ceil().max(1.0) as usize
    }
}

impl Default for LmedsParams {
    fn default() -> Self {
        Self {
            outlier_proportion: 0.4,
            probability: 0.99,
            scale_normaliser: 1.4826,
            inlier_multiplier: 2.5,
            improve_estimate: true,
            seed: None,
        }
    }
}
