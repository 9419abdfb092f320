//! GovSim CLI
//!
//! Run the DAO governance simulation against a development node or the
//! in-memory ledger and write the result table.

use clap::Parser;
use govsim_core::ProfileCatalog;
use govsim_env::{
    dao_governance_creation_code, decode_creation_code, Address, DeployedContract, JsonRpcLedger,
    LedgerConnection, LedgerError,
};
use govsim_sim::{
    sink_for, LedgerMode, OutputFormat, SimConfig, SimExport, SimLedger, SimulationEngine,
    SimulationError, SimulationReport,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "govsim")]
#[command(about = "DAO governance simulation with on-chain decision records")]
struct Args {
    /// Master seed for the metric stream
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of runs (one ledger decision each)
    #[arg(short = 'n', long, default_value = "1000")]
    runs: u64,

    /// Ledger backend (rpc, sim)
    #[arg(short, long, default_value = "rpc")]
    ledger: String,

    /// JSON-RPC endpoint of the development node
    #[arg(long, default_value = "http://127.0.0.1:7545")]
    rpc_url: String,

    /// Address of an already deployed decision contract
    #[arg(long)]
    contract: Option<String>,

    /// Hex file with the decision contract creation bytecode (bundled contract when omitted)
    #[arg(long)]
    bytecode: Option<PathBuf>,

    /// Profile catalog JSON (built-in calibration when omitted)
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Result table path
    #[arg(short, long, default_value = "data/Simulation_Results_DAO_1000_Runs.csv")]
    output: PathBuf,

    /// Table format (csv, json); inferred from the output extension when omitted
    #[arg(short, long)]
    format: Option<String>,

    /// Rejection attempts per sample before clamping
    #[arg(long, default_value = "10000")]
    max_attempts: u32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the full export as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> Result<SimConfig, String> {
        let mut config = SimConfig::default()
            .with_seed(self.seed)
            .with_runs(self.runs)
            .with_ledger(self.ledger.parse()?)
            .with_output(self.output);

        if let Some(format) = self.format {
            config.format = format.parse::<OutputFormat>()?;
        }
        if let Some(contract) = self.contract {
            let address = contract
                .parse::<Address>()
                .map_err(|e| format!("Invalid contract address {}: {}", contract, e))?;
            config.contract_address = Some(address);
        }
        config.rpc = config.rpc.with_url(self.rpc_url);
        config.bytecode_path = self.bytecode;
        config.profiles_path = self.profiles;
        config.max_attempts = self.max_attempts;
        Ok(config)
    }
}

/// Reads hex-encoded creation bytecode, with or without `0x`.
fn read_bytecode(path: &Path) -> Result<Vec<u8>, LedgerError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LedgerError::deployment(format!("{}: {}", path.display(), e)))?;
    decode_creation_code(&text)
}

/// Creation bytecode to deploy: the given file, else the bundled contract.
fn creation_code(path: Option<&Path>) -> Result<Vec<u8>, LedgerError> {
    match path {
        Some(path) => read_bytecode(path),
        None => dao_governance_creation_code(),
    }
}

async fn run_engine<L, C>(
    ledger: L,
    contract: C,
    catalog: ProfileCatalog,
    config: &SimConfig,
) -> Result<SimulationReport, SimulationError>
where
    L: LedgerConnection,
    C: DeployedContract,
{
    SimulationEngine::new(ledger, contract)
        .with_catalog(catalog)
        .with_max_attempts(config.max_attempts)
        .run_all(config.seed, config.total_runs)
        .await
}

async fn simulate(
    config: &SimConfig,
    catalog: ProfileCatalog,
) -> Result<SimulationReport, SimulationError> {
    match config.ledger {
        LedgerMode::Sim => {
            let ledger = SimLedger::new(config.seed);
            let sender = ledger
                .primary_account()
                .await
                .map_err(SimulationError::Connectivity)?;
            let contract = ledger.deploy(sender).map_err(SimulationError::Deployment)?;
            info!("In-memory ledger, contract at {}", contract.address());
            run_engine(ledger, contract, catalog, config).await
        }
        LedgerMode::Rpc => {
            let ledger =
                JsonRpcLedger::new(config.rpc.clone()).map_err(SimulationError::Connectivity)?;
            if !ledger.is_reachable().await {
                return Err(SimulationError::Connectivity(LedgerError::unreachable(
                    ledger.url(),
                )));
            }

            let contract = match config.contract_address {
                Some(address) => {
                    info!("Attaching to decision contract at {}", address);
                    ledger.attach(address)
                }
                None => {
                    let code = creation_code(config.bytecode_path.as_deref())
                        .map_err(SimulationError::Deployment)?;
                    let sender = ledger
                        .primary_account()
                        .await
                        .map_err(SimulationError::Connectivity)?;
                    let contract = ledger
                        .deploy(&code, sender)
                        .await
                        .map_err(SimulationError::Deployment)?;
                    info!("Deployed decision contract at {}", contract.address());
                    contract
                }
            };
            run_engine(ledger, contract, catalog, config).await
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging on stderr so --json output stays clean
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let json = args.json;
    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    info!("GovSim v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "Seed {} | {} runs | ledger={} | output={}",
        config.seed,
        config.total_runs,
        config.ledger,
        config.output_path.display()
    );

    let catalog = match &config.profiles_path {
        Some(path) => match ProfileCatalog::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("✗ Failed at stage profiles: {}", e);
                std::process::exit(1);
            }
        },
        None => ProfileCatalog::standard(),
    };

    let report = match simulate(&config, catalog).await {
        Ok(report) => report,
        Err(e) => {
            match e.last_completed() {
                Some(last) => error!(
                    "✗ Failed at stage {} (last committed run: {}): {}",
                    e.stage(),
                    last,
                    e
                ),
                None => error!("✗ Failed at stage {}: {}", e.stage(), e),
            }
            std::process::exit(1);
        }
    };

    let mut sink = sink_for(
        config.format,
        &config.output_path,
        report.seed,
        report.clamped_draws,
    );
    if let Err(e) = sink.write_table(&report.records) {
        error!("✗ Failed at stage export: {}", e);
        std::process::exit(1);
    }
    info!(
        "✓ {} runs written to {}",
        report.total_runs(),
        config.output_path.display()
    );

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for s in report.summary() {
        info!(
            "{} | runs={} latency={:.2}s compliance={:.1}% roi={:.2}% accepted={:.1}% violations={:.1}%",
            s.generation,
            s.runs,
            s.mean_latency,
            s.mean_compliance,
            s.mean_roi,
            s.acceptance_rate * 100.0,
            s.violation_rate * 100.0
        );
    }
    info!(
        "Gas used: {} | clamped draws: {}",
        report.total_gas_used, report.clamped_draws
    );

    if json {
        let export = SimExport::new(report.seed, report.clamped_draws, &report.records);
        match serde_json::to_string_pretty(&export) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                error!("Failed to serialize export: {}", e);
                std::process::exit(1);
            }
        }
    }
}
