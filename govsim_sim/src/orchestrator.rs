//! One ledger transaction per simulation run.

use govsim_env::{
    gas_cost_native, Address, DecisionCall, DeployedContract, LedgerConnection, LedgerDecision,
    LedgerError, B256,
};
use std::time::{Duration, Instant};
use tracing::debug;

/// What the ledger contributed to one run.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerOutcome {
    /// Hash of the decision transaction
    pub tx_hash: B256,

    /// Gas consumed by the transaction
    pub gas_used: u64,

    /// Gas price read after confirmation (wei)
    pub gas_price_wei: u128,

    /// `gas_used * gas_price / 10^18`
    pub gas_cost_native: f64,

    /// Stored decision, read from the receipt's event
    pub decision: LedgerDecision,

    /// Wall clock spent in submit + confirmation; diagnostics only
    pub elapsed: Duration,
}

impl LedgerOutcome {
    /// Block timestamp of the decision.
    pub fn timestamp(&self) -> u64 {
        self.decision.block_timestamp
    }
}

/// Submits decision transactions and waits for their receipts.
pub struct DecisionOrchestrator<'a, L, C> {
    ledger: &'a L,
    contract: &'a C,
    sender: Address,
}

impl<'a, L, C> DecisionOrchestrator<'a, L, C>
where
    L: LedgerConnection,
    C: DeployedContract,
{
    pub fn new(ledger: &'a L, contract: &'a C, sender: Address) -> Self {
        Self {
            ledger,
            contract,
            sender,
        }
    }

    /// Records the decision of run `simulation_id` on-chain.
    ///
    /// Exactly one transaction is submitted. Any ledger failure is returned
    /// as-is; there is no retry.
    pub async fn execute(
        &self,
        simulation_id: u64,
        generation_id: u8,
    ) -> Result<LedgerOutcome, LedgerError> {
        let call = DecisionCall::new(simulation_id, generation_id);

        let start = Instant::now();
        let tx = self.contract.submit_decision(call, self.sender).await?;
        let receipt = self.contract.await_receipt(&tx).await?;
        let elapsed = start.elapsed();

        let event = receipt.event.as_ref().ok_or_else(|| {
            LedgerError::EventMismatch(format!(
                "receipt {} for proposal {} carries no DecisionExecuted event",
                tx, simulation_id
            ))
        })?;
        if event.proposal_id != simulation_id || event.dao_version != generation_id {
            return Err(LedgerError::EventMismatch(format!(
                "submitted proposal {} / version {}, receipt {} shows proposal {} / version {}",
                simulation_id, generation_id, tx, event.proposal_id, event.dao_version
            )));
        }
        let decision = LedgerDecision::from_event(event, receipt.gas_used);

        let gas_price_wei = self.ledger.current_gas_price().await?;

        debug!(
            "Run {} -> tx {} (gas={}, price={} wei, {:?})",
            simulation_id, tx, receipt.gas_used, gas_price_wei, elapsed
        );

        Ok(LedgerOutcome {
            tx_hash: receipt.tx_hash,
            gas_used: receipt.gas_used,
            gas_price_wei,
            gas_cost_native: gas_cost_native(receipt.gas_used, gas_price_wei),
            decision,
            elapsed,
        })
    }
}
