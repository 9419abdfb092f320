//! GovSim - DAO Governance Simulation Engine
//!
//! This crate runs the simulation: a fixed number of runs, each one tagged
//! with a DAO generation, recorded on a ledger as one decision transaction,
//! and described by a row of synthetic performance metrics.
//!
//! # Core Principle: One Seed, One Table
//!
//! All synthetic values come from a single stream seeded once per
//! simulation. The ledger contributes gas cost only, so the metric columns
//! of the table are reproducible from the seed alone.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   SimulationEngine                       │
//! │  ┌────────────┐   ┌────────────────┐   ┌─────────────┐   │
//! │  │ Sequencer  │──►│  Orchestrator  │──►│ Synthesizer │   │
//! │  │ (labels)   │   │ (1 tx per run) │   │ + Classifier│   │
//! │  └────────────┘   └───────┬────────┘   └──────┬──────┘   │
//! │                           │                   │          │
//! │                    ┌──────▼──────┐     ┌──────▼──────┐   │
//! │                    │   Ledger    │     │  RunRecord  │   │
//! │                    │ (RPC / Sim) │     │   table     │   │
//! │                    └─────────────┘     └──────┬──────┘   │
//! └───────────────────────────────────────────────┼──────────┘
//!                                          ┌──────▼──────┐
//!                                          │ CSV / JSON  │
//!                                          └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use govsim_sim::{SimLedger, SimulationEngine};
//! use govsim_env::LedgerConnection;
//!
//! let ledger = SimLedger::new(42);
//! let sender = ledger.primary_account().await?;
//! let contract = ledger.deploy(sender)?;
//!
//! let engine = SimulationEngine::new(ledger, contract);
//! let report = engine.run_all(42, 1000).await?;
//! ```

pub mod config;
mod context;
mod engine;
pub mod exporter;
mod ledger;
mod orchestrator;

pub use config::{LedgerMode, SimConfig};
pub use context::SimContext;
pub use engine::{SimulationEngine, SimulationError, SimulationReport};
pub use exporter::{
    sink_for, CsvTableSink, ExportError, JsonTableSink, OutputFormat, PersistenceSink, SimExport,
};
pub use ledger::{SimDecisionContract, SimLedger, SimLedgerController, DEFAULT_GAS_PRICE_WEI};
pub use orchestrator::{DecisionOrchestrator, LedgerOutcome};
