//! GovSim Ledger Abstraction Layer
//!
//! This crate provides the narrow interfaces through which the simulation
//! engine talks to a ledger, so the same engine runs against a **Production**
//! JSON-RPC node or an in-memory **Simulation** chain.
//!
//! # Core Concept
//!
//! The engine never sees a transport. It only:
//! - asks whether the ledger is reachable and which account to send from
//! - submits one `executeDecision(proposalId, daoVersion)` per run
//! - waits for the receipt and reads gas usage and gas price
//!
//! # Example
//!
//! ```ignore
//! use govsim_env::{DecisionCall, DeployedContract, LedgerConnection};
//!
//! async fn record<L: LedgerConnection, C: DeployedContract>(
//!     ledger: &L,
//!     contract: &C,
//! ) -> Result<u64, govsim_env::LedgerError> {
//!     let sender = ledger.primary_account().await?;
//!     let tx = contract.submit_decision(DecisionCall::new(1, 1), sender).await?;
//!     Ok(contract.await_receipt(&tx).await?.gas_used)
//! }
//! ```

pub mod abi;
mod contract;
mod error;
mod ledger;
mod rpc_impl;
mod types;

pub use contract::{
    dao_governance_creation_code, decode_creation_code, DAO_GOVERNANCE_BYTECODE,
    DAO_GOVERNANCE_SOURCE,
};
pub use error::LedgerError;
pub use ledger::{DeployedContract, LedgerConnection};
pub use rpc_impl::{parse_quantity, JsonRpcLedger, RpcConfig, RpcDecisionContract};
pub use types::{
    gas_cost_native, DecisionCall, DecisionEvent, DecisionReceipt, LedgerDecision, TxHandle,
    WEI_PER_NATIVE,
};

/// Re-export alloy primitives for convenience
pub use alloy_primitives::{hex, keccak256, Address, B256};
