//! Ledger collaborator traits.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::error::LedgerError;
use crate::types::{DecisionCall, DecisionReceipt, TxHandle};

/// Connection to the ledger network.
///
/// # Implementations
///
/// - **Production**: `JsonRpcLedger` - HTTP JSON-RPC against a development node
/// - **Simulation**: `SimLedger` - in-memory chain with automining
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Returns true if the node answers.
    async fn is_reachable(&self) -> bool;

    /// Returns the first unlocked account.
    ///
    /// # Returns
    /// * `Err(LedgerError::NoAccounts)` - the node exposes no account
    async fn primary_account(&self) -> Result<Address, LedgerError>;

    /// Returns the current gas price in wei.
    async fn current_gas_price(&self) -> Result<u128, LedgerError>;
}

/// Handle to the deployed decision-recording contract.
///
/// # Flow
///
/// ```text
/// Engine                    Contract                    Ledger
///   |-- submit_decision ------>|                          |
///   |<-- TxHandle -------------|-- transaction ---------->|
///   |-- await_receipt -------->|                          |
///   |                          |<-- mined receipt --------|
///   |<-- DecisionReceipt ------|                          |
/// ```
#[async_trait]
pub trait DeployedContract: Send + Sync {
    /// Address of the contract.
    fn address(&self) -> Address;

    /// Sends one `executeDecision` transaction from `sender`.
    ///
    /// Returns as soon as the ledger accepted the transaction.
    async fn submit_decision(
        &self,
        call: DecisionCall,
        sender: Address,
    ) -> Result<TxHandle, LedgerError>;

    /// Blocks until the transaction is final and returns its receipt.
    ///
    /// # Returns
    /// * `Err(LedgerError::Reverted)` - the transaction was mined but failed
    /// * `Err(LedgerError::Timeout)` - the receipt did not appear in time
    async fn await_receipt(&self, tx: &TxHandle) -> Result<DecisionReceipt, LedgerError>;

    /// Number of decisions recorded so far.
    async fn decision_count(&self) -> Result<u64, LedgerError>;
}
