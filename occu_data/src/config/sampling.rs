//! Sampling engine configuration.

/// Which point-sampling policy the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStrategy {
    /// Near-surface Gaussian perturbation mixed with uniform volumetric
    /// points, labeled by binary containment.
    Uniform,
    /// Graded inward/outward displacement along the viewing axis, with
    /// strongly-displaced "way inside"/"way outside" anchor batches.
    DepthOriented,
}

/// Scalar knobs for the sampling engine.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Sampling policy.
    pub strategy: SamplingStrategy,

    /// Number of query points per example. The engine always returns
    /// exactly this many.
    pub num_samples: usize,

    /// Standard deviation of the near-surface Gaussian perturbation,
    /// in units of the per-mesh sigma multiplier (uniform strategy).
    pub sigma: f32,

    /// Fraction of points displaced far into the mesh (depth-oriented).
    pub ratio_way_inside: f32,

    /// Fraction of points displaced far out of the mesh (depth-oriented).
    pub ratio_way_outside: f32,

    /// Oversampling factor for the seed surface cloud; the surface pool
    /// holds `compensation_factor * 4 * num_samples` points to absorb
    /// downstream rejection losses.
    pub compensation_factor: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::Uniform,
            num_samples: 8000,
            sigma: 3.5,
            ratio_way_inside: 0.05,
            ratio_way_outside: 0.05,
            compensation_factor: 0.25,
        }
    }
}

impl SamplingConfig {
    /// Set the sampling strategy.
    pub fn with_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the number of query points per example.
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    /// Set the near-surface perturbation sigma.
    pub fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the way-inside/way-outside point fractions.
    pub fn with_way_ratios(mut self, inside: f32, outside: f32) -> Self {
        self.ratio_way_inside = inside;
        self.ratio_way_outside = outside;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_samples == 0 {
            return Err("num_samples must be positive".to_string());
        }
        if !(self.sigma > 0.0) {
            return Err("sigma must be positive".to_string());
        }
        if !(self.compensation_factor > 0.0) {
            return Err("compensation_factor must be positive".to_string());
        }
        if !(0.0..=0.5).contains(&self.ratio_way_inside)
            || !(0.0..=0.5).contains(&self.ratio_way_outside)
        {
            return Err("way-point ratios must lie in [0, 0.5]".to_string());
        }
        if self.ratio_way_inside + self.ratio_way_outside >= 1.0 {
            return Err("way-point ratios leave no room for graded points".to_string());
        }
        Ok(())
    }
}
