//! Output rows of the simulation table.

use serde::{Deserialize, Serialize};

use crate::classifier::{Classification, ComplianceViolation, DecisionOutcome};
use crate::profile::Generation;
use crate::synthesizer::SynthesizedMetrics;

/// Column headers in table order.
pub const COLUMNS: [&str; 10] = [
    "Simulation ID",
    "DAO Gen",
    "Latency (s)",
    "Compliance (%)",
    "Gas Cost (native unit)",
    "Off-Chain Cost",
    "Total Cost",
    "Decision Outcome",
    "ROI (%)",
    "Compliance Violation",
];

/// Rounds to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// One row of the result table.
///
/// Field order matches [`COLUMNS`]; values are already rounded for
/// presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(rename = "Simulation ID")]
    pub simulation_id: u64,

    #[serde(rename = "DAO Gen")]
    pub generation: Generation,

    /// 2 decimals
    #[serde(rename = "Latency (s)")]
    pub latency_seconds: f64,

    /// 1 decimal
    #[serde(rename = "Compliance (%)")]
    pub compliance_percent: f64,

    /// 6 decimals
    #[serde(rename = "Gas Cost (native unit)")]
    pub gas_cost_native: f64,

    #[serde(rename = "Off-Chain Cost")]
    pub off_chain_cost: i64,

    #[serde(rename = "Total Cost")]
    pub total_cost: i64,

    #[serde(rename = "Decision Outcome")]
    pub decision_outcome: DecisionOutcome,

    /// 2 decimals
    #[serde(rename = "ROI (%)")]
    pub roi_percent: f64,

    #[serde(rename = "Compliance Violation")]
    pub compliance_violation: ComplianceViolation,
}

impl RunRecord {
    /// Cells in column order, formatted for a text table.
    pub fn cells(&self) -> [String; 10] {
        [
            self.simulation_id.to_string(),
            self.generation.label().to_string(),
            format!("{:.2}", self.latency_seconds),
            format!("{:.1}", self.compliance_percent),
            format!("{:.6}", self.gas_cost_native),
            self.off_chain_cost.to_string(),
            self.total_cost.to_string(),
            self.decision_outcome.to_string(),
            format!("{:.2}", self.roi_percent),
            self.compliance_violation.to_string(),
        ]
    }
}

/// Assembles a [`RunRecord`] from the parts of one run.
#[derive(Debug, Clone)]
pub struct RunRecordBuilder {
    simulation_id: u64,
    generation: Generation,
}

impl RunRecordBuilder {
    pub fn new(simulation_id: u64, generation: Generation) -> Self {
        Self {
            simulation_id,
            generation,
        }
    }

    /// Applies presentation rounding and produces the row.
    pub fn build(
        self,
        metrics: &SynthesizedMetrics,
        gas_cost_native: f64,
        classification: Classification,
    ) -> RunRecord {
        RunRecord {
            simulation_id: self.simulation_id,
            generation: self.generation,
            latency_seconds: round_to(metrics.latency, 2),
            compliance_percent: round_to(metrics.compliance, 1),
            gas_cost_native: round_to(gas_cost_native, 6),
            off_chain_cost: metrics.off_chain_cost.round() as i64,
            total_cost: metrics.total_cost.round() as i64,
            decision_outcome: classification.decision_outcome,
            roi_percent: round_to(metrics.roi, 2),
            compliance_violation: classification.compliance_violation,
        }
    }
}
