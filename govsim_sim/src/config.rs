//! Simulation configuration.

use govsim_core::sampler::DEFAULT_MAX_ATTEMPTS;
use govsim_env::{Address, RpcConfig};
use std::path::PathBuf;

use crate::exporter::OutputFormat;

/// Which ledger the simulation records decisions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    /// In-memory chain (deterministic, no node required)
    Sim,

    /// JSON-RPC development node
    Rpc,
}

impl std::fmt::Display for LedgerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerMode::Sim => write!(f, "sim"),
            LedgerMode::Rpc => write!(f, "rpc"),
        }
    }
}

impl std::str::FromStr for LedgerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sim" | "memory" => Ok(LedgerMode::Sim),
            "rpc" | "ganache" | "node" => Ok(LedgerMode::Rpc),
            _ => Err(format!("Unknown ledger mode: {}", s)),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for the metric stream
    pub seed: u64,

    /// Number of runs (one ledger decision each)
    pub total_runs: u64,

    /// Ledger backend
    pub ledger: LedgerMode,

    /// JSON-RPC connection settings (rpc mode)
    pub rpc: RpcConfig,

    /// Existing contract to attach to (rpc mode)
    pub contract_address: Option<Address>,

    /// Creation bytecode to deploy (rpc mode, hex file)
    pub bytecode_path: Option<PathBuf>,

    /// Profile catalog JSON; built-in calibration when unset
    pub profiles_path: Option<PathBuf>,

    /// Result table destination
    pub output_path: PathBuf,

    /// Result table format
    pub format: OutputFormat,

    /// Rejection attempts per sample before clamping
    pub max_attempts: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_runs: 1000,
            ledger: LedgerMode::Rpc,
            rpc: RpcConfig::default(),
            contract_address: None,
            bytecode_path: None,
            profiles_path: None,
            output_path: PathBuf::from("data/Simulation_Results_DAO_1000_Runs.csv"),
            format: OutputFormat::Csv,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_runs(mut self, total_runs: u64) -> Self {
        self.total_runs = total_runs;
        self
    }

    pub fn with_ledger(mut self, ledger: LedgerMode) -> Self {
        self.ledger = ledger;
        self
    }

    /// Sets the output path; the format follows the extension when recognized.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        if let Some(format) = OutputFormat::from_path(&self.output_path) {
            self.format = format;
        }
        self
    }
}
