//! Sampling strategies for drawing minimal subsets.
//!
//! Two policies are provided: plain uniform sampling without replacement,
//! and a spatially-bucketed sampler that spreads the sample across a grid
//! over the independent points to avoid tightly-clustered, near-degenerate
//! picks when fitting planar transforms.

use rand::distributions::Uniform;
use rand::prelude::*;

use crate::core::Sampler;
use crate::types::{Correspondence, Point};

/// Draw `out.len()` distinct integers in `[0, n)` by rejection.
///
/// Suitable for the small sample sizes of minimal solvers.
fn draw_unique(rng: &mut StdRng, n: usize, out: &mut [usize]) {
    let dist = Uniform::new(0, n);
    for i in 0..out.len() {
        loop {
            let candidate = rng.sample(dist);
            if out[..i].iter().all(|&v| v != candidate) {
                out[i] = candidate;
                break;
            }
        }
    }
}

/// Uniform random sampler drawing minimal samples without replacement.
pub struct UniformSampler {
    rng: StdRng,
}

impl UniformSampler {
    /// Construct with an OS-provided random seed.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Construct from a fixed seed for reproducible runs.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for UniformSampler {
    fn sample(
        &mut self,
        data: &[Correspondence],
        sample_size: usize,
        out_indices: &mut [usize],
    ) -> bool {
        let n = data.len();
        if sample_size == 0 || sample_size > n || out_indices.len() < sample_size {
            return false;
        }

        draw_unique(&mut self.rng, n, &mut out_indices[..sample_size]);
        true
    }
}

/// Spatially-bucketed sampler for 2D correspondences.
///
/// The independent points are binned into a regular grid over their
/// bounding box. A sample is drawn by picking distinct non-empty buckets at
/// random and one random point from each, which improves the spatial spread
/// of minimal samples. When more points are requested than non-empty
/// buckets exist, the sampler falls back to uniform sampling.
pub struct BucketingSampler2d {
    rng: StdRng,
    buckets_per_side: usize,
    /// Indices of `data` grouped by grid cell; empty cells are dropped.
    buckets: Vec<Vec<usize>>,
    /// Independent points the grid was built for; the grid is rebuilt
    /// whenever they differ from the current data.
    grid_source: Vec<Point>,
}

impl BucketingSampler2d {
    const DEFAULT_BUCKETS_PER_SIDE: usize = 10;

    /// Construct with an OS-provided random seed and the default grid size.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Construct from a fixed seed for reproducible runs.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            buckets_per_side: Self::DEFAULT_BUCKETS_PER_SIDE,
            buckets: Vec::new(),
            grid_source: Vec::new(),
        }
    }

    /// Override the number of grid cells per axis.
    pub fn set_buckets_per_side(&mut self, buckets_per_side: usize) {
        assert!(buckets_per_side > 0, "grid must have at least one bucket");
        self.buckets_per_side = buckets_per_side;
        self.grid_source.clear();
    }

    fn grid_is_current(&self, data: &[Correspondence]) -> bool {
        self.grid_source.len() == data.len()
            && data
                .iter()
                .zip(&self.grid_source)
                .all(|(c, p)| c.independent == *p)
    }

    fn build_buckets(&mut self, data: &[Correspondence]) {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for c in data {
            min_x = min_x.min(c.independent.x);
            min_y = min_y.min(c.independent.y);
            max_x = max_x.max(c.independent.x);
            max_y = max_y.max(c.independent.y);
        }

        let side = self.buckets_per_side;
        let width = (max_x - min_x).max(f64::EPSILON);
        let height = (max_y - min_y).max(f64::EPSILON);

        let mut grid: Vec<Vec<usize>> = vec![Vec::new(); side * side];
        for (i, c) in data.iter().enumerate() {
            let bx = (((c.independent.x - min_x) / width * side as f64) as usize).min(side - 1);
            let by = (((c.independent.y - min_y) / height * side as f64) as usize).min(side - 1);
            grid[by * side + bx].push(i);
        }

        self.buckets = grid.into_iter().filter(|b| !b.is_empty()).collect();
        self.grid_source = data.iter().map(|c| c.independent).collect();
    }
}

impl Default for BucketingSampler2d {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for BucketingSampler2d {
    fn sample(
        &mut self,
        data: &[Correspondence],
        sample_size: usize,
        out_indices: &mut [usize],
    ) -> bool {
        let n = data.len();
        if sample_size == 0 || sample_size > n || out_indices.len() < sample_size {
            return false;
        }

        if !self.grid_is_current(data) {
            self.build_buckets(data);
        }

        if sample_size > self.buckets.len() {
            // Not enough distinct buckets; degrade to uniform sampling.
            draw_unique(&mut self.rng, n, &mut out_indices[..sample_size]);
            return true;
        }

        let mut chosen_buckets = vec![0usize; sample_size];
        draw_unique(&mut self.rng, self.buckets.len(), &mut chosen_buckets);

        for (dst, &bucket_idx) in out_indices[..sample_size].iter_mut().zip(&chosen_buckets) {
            let bucket = &self.buckets[bucket_idx];
            *dst = bucket[self.rng.gen_range(0..bucket.len())];
        }
        true
    }
}
