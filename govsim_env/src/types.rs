//! Common types shared between the engine and ledger implementations.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Wei per native unit (1 ETH = 10^18 wei).
pub const WEI_PER_NATIVE: f64 = 1e18;

/// Handle to a submitted, not yet confirmed transaction.
///
/// Wraps the transaction hash returned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle(pub B256);

impl TxHandle {
    /// Returns the transaction hash.
    pub fn hash(&self) -> B256 {
        self.0
    }
}

impl std::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form for logs
        let hex = self.0.to_string();
        write!(f, "{}", &hex[..hex.len().min(10)])
    }
}

/// Arguments of one `executeDecision(proposalId, daoVersion)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCall {
    /// Proposal being decided (the simulation run id)
    pub proposal_id: u64,

    /// Governance generation (1, 2 or 3)
    pub dao_version: u8,
}

impl DecisionCall {
    pub fn new(proposal_id: u64, dao_version: u8) -> Self {
        Self {
            proposal_id,
            dao_version,
        }
    }
}

/// Decoded `DecisionExecuted` event emitted by the decision contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub decision_id: u64,
    pub proposal_id: u64,
    pub dao_version: u8,
    pub executor: Address,
    pub timestamp: u64,
}

/// What the engine learns from a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionReceipt {
    /// Transaction hash
    pub tx_hash: B256,

    /// Gas consumed by the transaction
    pub gas_used: u64,

    /// Set for contract-creation transactions
    pub contract_address: Option<Address>,

    /// Decision event, when the transaction emitted one
    pub event: Option<DecisionEvent>,
}

/// A decision as stored by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDecision {
    /// Ledger-assigned id, sequential from 1
    pub decision_id: u64,

    /// Equals the simulation id of the triggering run
    pub proposal_id: u64,

    /// Generation id (1, 2 or 3)
    pub generation_id: u8,

    /// Block timestamp (seconds since epoch)
    pub block_timestamp: u64,

    /// Account that sent the transaction
    pub executor: Address,

    /// Gas consumed by the executing transaction
    pub gas_used: u64,
}

impl LedgerDecision {
    /// Builds a decision from a receipt's event.
    pub fn from_event(event: &DecisionEvent, gas_used: u64) -> Self {
        Self {
            decision_id: event.decision_id,
            proposal_id: event.proposal_id,
            generation_id: event.dao_version,
            block_timestamp: event.timestamp,
            executor: event.executor,
            gas_used,
        }
    }
}

/// Converts gas usage and price (wei) into native units.
pub fn gas_cost_native(gas_used: u64, gas_price_wei: u128) -> f64 {
    (gas_used as f64) * (gas_price_wei as f64) / WEI_PER_NATIVE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_cost_native() {
        // 100k gas at 20 gwei = 0.002 ETH
        let cost = gas_cost_native(100_000, 20_000_000_000);
        assert!((cost - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_gas_cost_zero_price() {
        assert_eq!(gas_cost_native(21_000, 0), 0.0);
    }

    #[test]
    fn test_ledger_decision_from_event() {
        let event = DecisionEvent {
            decision_id: 7,
            proposal_id: 7,
            dao_version: 1,
            executor: Address::ZERO,
            timestamp: 1_704_067_200,
        };
        let decision = LedgerDecision::from_event(&event, 90_000);

        assert_eq!(decision.decision_id, 7);
        assert_eq!(decision.generation_id, 1);
        assert_eq!(decision.gas_used, 90_000);
    }

    #[test]
    fn test_tx_handle_display_is_short() {
        let handle = TxHandle(B256::repeat_byte(0xab));
        assert_eq!(handle.to_string(), "0xabababab");
    }
}
