//! Synthetic metric generation for one run.

use serde::{Deserialize, Serialize};

use crate::profile::DaoProfile;
use crate::sampler::{BoundedSampler, SamplingError};

/// Generation-independent bounds and the off-chain cost distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisBounds {
    /// Latency range in seconds
    pub latency_min: f64,
    pub latency_max: f64,

    /// Compliance range in percent
    pub compliance_min: f64,
    pub compliance_max: f64,

    /// ROI range in percent
    pub roi_min: f64,
    pub roi_max: f64,

    /// Off-chain cost distribution and range
    pub off_chain_mean: f64,
    pub off_chain_std: f64,
    pub off_chain_min: f64,
    pub off_chain_max: f64,
}

impl Default for SynthesisBounds {
    fn default() -> Self {
        Self {
            latency_min: 1.5,
            latency_max: 19.0,
            compliance_min: 60.0,
            compliance_max: 100.0,
            roi_min: -0.5,
            roi_max: 9.0,
            off_chain_mean: 300.0,
            off_chain_std: 40.0,
            off_chain_min: 170.0,
            off_chain_max: 420.0,
        }
    }
}

impl SynthesisBounds {
    /// Checks that every range is finite and ordered and the off-chain
    /// distribution is well formed.
    pub fn validate(&self) -> Result<(), SamplingError> {
        let ranges = [
            (self.latency_min, self.latency_max),
            (self.compliance_min, self.compliance_max),
            (self.roi_min, self.roi_max),
            (self.off_chain_min, self.off_chain_max),
        ];
        for (low, high) in ranges {
            if !(low.is_finite() && high.is_finite() && low <= high) {
                return Err(SamplingError::InvertedBounds { low, high });
            }
        }
        if !(self.off_chain_mean.is_finite()
            && self.off_chain_std.is_finite()
            && self.off_chain_std >= 0.0)
        {
            return Err(SamplingError::InvalidDistribution {
                mean: self.off_chain_mean,
                std_dev: self.off_chain_std,
            });
        }
        Ok(())
    }
}

/// Unrounded metrics of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedMetrics {
    pub latency: f64,
    pub compliance: f64,
    pub off_chain_cost: f64,
    pub total_cost: f64,
    pub roi: f64,
}

/// Draws the synthetic fields of a run from its generation profile.
#[derive(Debug, Clone, Default)]
pub struct MetricSynthesizer {
    bounds: SynthesisBounds,
}

impl MetricSynthesizer {
    pub fn new(bounds: SynthesisBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &SynthesisBounds {
        &self.bounds
    }

    /// Draws latency, compliance, off-chain cost, total cost and ROI.
    ///
    /// The draw order is fixed; changing it changes every dataset.
    pub fn synthesize(
        &self,
        profile: &DaoProfile,
        sampler: &mut BoundedSampler,
    ) -> Result<SynthesizedMetrics, SamplingError> {
        let b = &self.bounds;

        let latency = sampler.sample(
            profile.latency_mean,
            profile.latency_std,
            b.latency_min,
            b.latency_max,
        )?;
        let compliance = sampler.sample(
            profile.compliance_mean,
            profile.compliance_std,
            b.compliance_min,
            b.compliance_max,
        )?;
        let off_chain_cost = sampler.sample(
            b.off_chain_mean,
            b.off_chain_std,
            b.off_chain_min,
            b.off_chain_max,
        )?;
        let (cost_low, cost_high) = profile.total_cost_bounds();
        let total_cost = sampler.sample(
            profile.total_cost_mean,
            profile.total_cost_std,
            cost_low,
            cost_high,
        )?;
        let roi = sampler.sample(profile.roi_mean, profile.roi_std, b.roi_min, b.roi_max)?;

        Ok(SynthesizedMetrics {
            latency,
            compliance,
            off_chain_cost,
            total_cost,
            roi,
        })
    }
}
