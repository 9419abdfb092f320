//! Bounded normal sampling over a single seeded random stream.
//!
//! Every synthetic metric is drawn through one `BoundedSampler`, so the
//! whole dataset is reproducible from its seed as long as draws are
//! requested in the same order.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::warn;

/// Rejection attempts before a draw is clamped to the nearest bound.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Invalid sampling request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("Invalid normal distribution: mean={mean}, std_dev={std_dev}")]
    InvalidDistribution { mean: f64, std_dev: f64 },

    #[error("Inverted bounds: low={low} > high={high}")]
    InvertedBounds { low: f64, high: f64 },
}

/// Truncated normal sampler backed by a seeded ChaCha8 stream.
///
/// Draws outside `[low, high]` are discarded and redrawn. After
/// `max_attempts` rejected draws the last draw is clamped into range and
/// counted in [`clamped_draws`](Self::clamped_draws).
#[derive(Debug, Clone)]
pub struct BoundedSampler {
    /// Seed the stream was created from
    seed: u64,

    /// The single random stream
    rng: ChaCha8Rng,

    /// Rejection cap per sample
    max_attempts: u32,

    /// Raw normal draws consumed so far (accepted and rejected)
    draws: u64,

    /// Samples that hit the cap and were clamped
    clamped: u64,
}

impl BoundedSampler {
    /// Creates a sampler seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            draws: 0,
            clamped: 0,
        }
    }

    /// Sets the rejection cap (at least one attempt).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Draws from N(mean, std_dev) truncated to `[low, high]`.
    pub fn sample(
        &mut self,
        mean: f64,
        std_dev: f64,
        low: f64,
        high: f64,
    ) -> Result<f64, SamplingError> {
        if !(low <= high) {
            return Err(SamplingError::InvertedBounds { low, high });
        }
        if !mean.is_finite() {
            return Err(SamplingError::InvalidDistribution { mean, std_dev });
        }
        let normal = Normal::new(mean, std_dev)
            .map_err(|_| SamplingError::InvalidDistribution { mean, std_dev })?;

        let mut last = mean;
        for _ in 0..self.max_attempts {
            last = normal.sample(&mut self.rng);
            self.draws += 1;
            if low <= last && last <= high {
                return Ok(last);
            }
        }

        self.clamped += 1;
        let clamped = last.clamp(low, high);
        warn!(
            "Sample N({}, {}) did not land in [{}, {}] after {} attempts, clamped {} -> {}",
            mean, std_dev, low, high, self.max_attempts, last, clamped
        );
        Ok(clamped)
    }

    /// Returns the seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of raw draws consumed.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Returns the number of clamped samples.
    pub fn clamped_draws(&self) -> u64 {
        self.clamped
    }
}
