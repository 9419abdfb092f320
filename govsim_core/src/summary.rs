//! Per-generation aggregates over a finished table.

use serde::{Deserialize, Serialize};

use crate::classifier::DecisionOutcome;
use crate::profile::Generation;
use crate::record::RunRecord;

/// Aggregate metrics of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: Generation,
    pub runs: u64,
    pub mean_latency: f64,
    pub mean_compliance: f64,
    pub mean_gas_cost: f64,
    pub mean_off_chain_cost: f64,
    pub mean_total_cost: f64,
    pub mean_roi: f64,

    /// Fraction of runs accepted [0, 1]
    pub acceptance_rate: f64,

    /// Fraction of runs flagged as violations [0, 1]
    pub violation_rate: f64,
}

impl GenerationSummary {
    fn empty(generation: Generation) -> Self {
        Self {
            generation,
            runs: 0,
            mean_latency: 0.0,
            mean_compliance: 0.0,
            mean_gas_cost: 0.0,
            mean_off_chain_cost: 0.0,
            mean_total_cost: 0.0,
            mean_roi: 0.0,
            acceptance_rate: 0.0,
            violation_rate: 0.0,
        }
    }
}

/// Summarizes records per generation, in generation order.
///
/// Generations without runs are omitted.
pub fn summarize(records: &[RunRecord]) -> Vec<GenerationSummary> {
    Generation::ALL
        .iter()
        .filter_map(|generation| {
            let rows: Vec<&RunRecord> = records
                .iter()
                .filter(|r| r.generation == *generation)
                .collect();
            if rows.is_empty() {
                return None;
            }

            let n = rows.len() as f64;
            let mean = |f: fn(&RunRecord) -> f64| rows.iter().map(|r| f(r)).sum::<f64>() / n;
            let rate = |f: fn(&RunRecord) -> bool| rows.iter().filter(|r| f(r)).count() as f64 / n;

            let mut summary = GenerationSummary::empty(*generation);
            summary.runs = rows.len() as u64;
            summary.mean_latency = mean(|r| r.latency_seconds);
            summary.mean_compliance = mean(|r| r.compliance_percent);
            summary.mean_gas_cost = mean(|r| r.gas_cost_native);
            summary.mean_off_chain_cost = mean(|r| r.off_chain_cost as f64);
            summary.mean_total_cost = mean(|r| r.total_cost as f64);
            summary.mean_roi = mean(|r| r.roi_percent);
            summary.acceptance_rate = rate(|r| r.decision_outcome == DecisionOutcome::Accepted);
            summary.violation_rate = rate(|r| r.compliance_violation.is_violation());
            Some(summary)
        })
        .collect()
}
