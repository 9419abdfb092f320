//! Simulation engine - sequences runs and assembles the result table.

use govsim_core::{
    classify, summarize, BoundedSampler, GenerationSummary, MetricSynthesizer, ProfileCatalog,
    RunRecord, RunRecordBuilder, RunSequencer, SamplingError, SynthesisBounds,
};
use govsim_core::sampler::DEFAULT_MAX_ATTEMPTS;
use govsim_env::{DeployedContract, LedgerConnection, LedgerDecision, LedgerError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::orchestrator::DecisionOrchestrator;

/// Fatal simulation failures.
///
/// Every variant aborts the whole simulation; no partial table is valid.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Synthesis bounds are unusable; detected before any ledger I/O
    #[error("Invalid synthesis bounds: {0}")]
    Configuration(#[source] SamplingError),

    /// Ledger unreachable or no usable account
    #[error("Ledger connectivity failed: {0}")]
    Connectivity(#[source] LedgerError),

    /// Contract handle could not be obtained or verified
    #[error("Contract deployment failed: {0}")]
    Deployment(#[source] LedgerError),

    /// A decision transaction failed
    #[error("Run {run_index} transaction failed (last committed run: {last_completed}): {source}")]
    Transaction {
        run_index: u64,
        last_completed: u64,
        #[source]
        source: LedgerError,
    },

    /// Metric synthesis was given invalid parameters
    #[error("Run {run_index} sampling failed (last committed run: {last_completed}): {source}")]
    Sampling {
        run_index: u64,
        last_completed: u64,
        #[source]
        source: SamplingError,
    },

    /// Decision count could not be read back after the last run
    #[error("Post-run verification failed: {0}")]
    Verification(#[source] LedgerError),

    /// Contract recorded a different number of decisions than runs
    #[error("Ledger recorded {actual} decisions for {expected} runs")]
    Correspondence { expected: u64, actual: u64 },
}

impl SimulationError {
    /// Human-readable failing stage.
    pub fn stage(&self) -> String {
        match self {
            SimulationError::Configuration(_) => "configuration".to_string(),
            SimulationError::Connectivity(_) => "connectivity".to_string(),
            SimulationError::Deployment(_) => "deployment".to_string(),
            SimulationError::Transaction { run_index, .. }
            | SimulationError::Sampling { run_index, .. } => format!("run {}", run_index),
            SimulationError::Verification(_) | SimulationError::Correspondence { .. } => {
                "verification".to_string()
            }
        }
    }

    /// Last run that fully committed before the failure.
    pub fn last_completed(&self) -> Option<u64> {
        match self {
            SimulationError::Transaction { last_completed, .. }
            | SimulationError::Sampling { last_completed, .. } => Some(*last_completed),
            _ => None,
        }
    }
}

/// Results of a completed simulation.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Seed of the metric stream
    pub seed: u64,

    /// Rows in run order
    pub records: Vec<RunRecord>,

    /// On-chain decisions read from receipts, in run order
    pub decisions: Vec<LedgerDecision>,

    /// Samples that hit the rejection cap
    pub clamped_draws: u64,

    /// Gas consumed by all decision transactions
    pub total_gas_used: u64,

    /// Wall clock spent waiting on the ledger; diagnostics only
    pub ledger_time: Duration,
}

impl SimulationReport {
    /// Per-generation aggregates.
    pub fn summary(&self) -> Vec<GenerationSummary> {
        summarize(&self.records)
    }

    /// Number of committed runs.
    pub fn total_runs(&self) -> u64 {
        self.records.len() as u64
    }
}

/// Runs the full simulation against a ledger and a deployed contract.
pub struct SimulationEngine<L, C> {
    ledger: L,
    contract: C,
    catalog: ProfileCatalog,
    synthesizer: MetricSynthesizer,
    sequencer: RunSequencer,
    max_attempts: u32,
}

impl<L, C> SimulationEngine<L, C>
where
    L: LedgerConnection,
    C: DeployedContract,
{
    /// Creates an engine with the standard profiles and bounds.
    pub fn new(ledger: L, contract: C) -> Self {
        Self {
            ledger,
            contract,
            catalog: ProfileCatalog::standard(),
            synthesizer: MetricSynthesizer::default(),
            sequencer: RunSequencer::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Uses a custom profile catalog.
    pub fn with_catalog(mut self, catalog: ProfileCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Uses custom global bounds.
    pub fn with_bounds(mut self, bounds: SynthesisBounds) -> Self {
        self.synthesizer = MetricSynthesizer::new(bounds);
        self
    }

    /// Sets the rejection cap per sample.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    /// Executes runs `1..=total_runs` strictly in order.
    ///
    /// Each run submits one decision transaction, waits for it, then draws
    /// and classifies its metrics. The first failure aborts the simulation.
    pub async fn run_all(
        &self,
        seed: u64,
        total_runs: u64,
    ) -> Result<SimulationReport, SimulationError> {
        info!("Starting simulation: {} runs (seed={})", total_runs, seed);

        // Stream is seeded before any ledger I/O
        let mut sampler = BoundedSampler::new(seed).with_max_attempts(self.max_attempts);
        self.synthesizer
            .bounds()
            .validate()
            .map_err(SimulationError::Configuration)?;

        if !self.ledger.is_reachable().await {
            return Err(SimulationError::Connectivity(LedgerError::unreachable(
                "ledger did not answer",
            )));
        }
        let sender = self
            .ledger
            .primary_account()
            .await
            .map_err(SimulationError::Connectivity)?;
        let baseline = self
            .contract
            .decision_count()
            .await
            .map_err(SimulationError::Deployment)?;
        info!(
            "Ledger ready: sender={} contract={} existing decisions={}",
            sender,
            self.contract.address(),
            baseline
        );

        let orchestrator = DecisionOrchestrator::new(&self.ledger, &self.contract, sender);
        let mut records = Vec::with_capacity(total_runs.min(1 << 20) as usize);
        let mut decisions = Vec::new();
        let mut total_gas_used = 0u64;
        let mut ledger_time = Duration::ZERO;

        for run_index in 1..=total_runs {
            let last_completed = run_index - 1;
            let generation = self.sequencer.label_for(run_index);
            let profile = self.catalog.get(generation);

            let outcome = orchestrator
                .execute(run_index, profile.generation_id())
                .await
                .map_err(|source| SimulationError::Transaction {
                    run_index,
                    last_completed,
                    source,
                })?;

            let metrics = self
                .synthesizer
                .synthesize(profile, &mut sampler)
                .map_err(|source| SimulationError::Sampling {
                    run_index,
                    last_completed,
                    source,
                })?;
            let classification = classify(metrics.compliance, metrics.roi);
            let record = RunRecordBuilder::new(run_index, generation).build(
                &metrics,
                outcome.gas_cost_native,
                classification,
            );

            debug!(
                "Run {} [{}] latency={:.2}s compliance={:.1}% roi={:.2}% -> {} / {}",
                run_index,
                generation,
                record.latency_seconds,
                record.compliance_percent,
                record.roi_percent,
                record.decision_outcome,
                record.compliance_violation
            );

            total_gas_used += outcome.gas_used;
            ledger_time += outcome.elapsed;
            decisions.push(outcome.decision);
            records.push(record);

            if run_index % 100 == 0 {
                info!("  {}/{} runs committed", run_index, total_runs);
            }
        }

        let recorded = self
            .contract
            .decision_count()
            .await
            .map_err(SimulationError::Verification)?
            .saturating_sub(baseline);
        if recorded != total_runs {
            return Err(SimulationError::Correspondence {
                expected: total_runs,
                actual: recorded,
            });
        }

        let clamped_draws = sampler.clamped_draws();
        if clamped_draws > 0 {
            warn!("{} samples were clamped to their bounds", clamped_draws);
        }
        info!(
            "Simulation complete: {} runs, {} gas, {:?} waiting on ledger",
            total_runs, total_gas_used, ledger_time
        );

        Ok(SimulationReport {
            seed,
            records,
            decisions,
            clamped_draws,
            total_gas_used,
            ledger_time,
        })
    }
}
