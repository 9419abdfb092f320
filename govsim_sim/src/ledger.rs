//! In-memory ledger with automining and fault injection.
//!
//! Mirrors the `DAOGovernance` contract: every `executeDecision` call is
//! mined into its own block, assigned the next decision id and stored.
//! Gas usage follows a fixed cost model, so two ledgers built from the same
//! seed produce identical receipts.

use async_trait::async_trait;
use govsim_env::{
    abi, keccak256, Address, DecisionCall, DecisionEvent, DecisionReceipt, DeployedContract,
    LedgerConnection, LedgerDecision, LedgerError, TxHandle, B256,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::context::SimContext;

/// Development-node default gas price (20 gwei).
pub const DEFAULT_GAS_PRICE_WEI: u128 = 20_000_000_000;

/// Virtual time between blocks.
pub const BLOCK_INTERVAL: Duration = Duration::from_secs(1);

/// Accounts exposed by a fresh ledger.
pub const DEFAULT_ACCOUNT_COUNT: usize = 10;

// Gas model
const TX_BASE_GAS: u64 = 21_000;
const CALLDATA_ZERO_BYTE_GAS: u64 = 4;
const CALLDATA_NONZERO_BYTE_GAS: u64 = 16;
const SSTORE_SET_GAS: u64 = 20_000;
const SSTORE_RESET_GAS: u64 = 5_000;
const LOG_GAS: u64 = 375;
const LOG_TOPIC_GAS: u64 = 375;
const LOG_DATA_BYTE_GAS: u64 = 8;
const DEPLOY_GAS: u64 = 310_000;

/// Storage slots written per stored decision (proposalId, daoVersion, timestamp, executor).
const DECISION_SLOTS: u64 = 4;

fn calldata_gas(data: &[u8]) -> u64 {
    data.iter()
        .map(|b| {
            if *b == 0 {
                CALLDATA_ZERO_BYTE_GAS
            } else {
                CALLDATA_NONZERO_BYTE_GAS
            }
        })
        .sum()
}

/// Gas used by one `executeDecision` call.
fn decision_gas(calldata: &[u8], previous_count: u64) -> u64 {
    let counter = if previous_count == 0 {
        SSTORE_SET_GAS
    } else {
        SSTORE_RESET_GAS
    };
    let event = LOG_GAS + 4 * LOG_TOPIC_GAS + 64 * LOG_DATA_BYTE_GAS;

    TX_BASE_GAS + calldata_gas(calldata) + counter + DECISION_SLOTS * SSTORE_SET_GAS + event
}

/// Storage of one deployed decision contract.
#[derive(Debug, Default)]
struct DecisionStore {
    decisions: BTreeMap<u64, LedgerDecision>,
}

#[derive(Debug)]
enum MinedReceipt {
    Success(DecisionReceipt),
    Reverted,
}

#[derive(Debug)]
struct ChainState {
    accounts: Vec<Address>,
    gas_price_wei: u128,
    block_number: u64,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, DecisionStore>,
    receipts: HashMap<B256, MinedReceipt>,
    submitted: Vec<DecisionCall>,
}

impl ChainState {
    /// Allocates a transaction hash and bumps the sender nonce.
    fn next_tx_hash(&mut self, sender: Address, payload: &[u8]) -> (B256, u64) {
        let nonce = self.nonces.entry(sender).or_insert(0);
        let current = *nonce;
        *nonce += 1;

        let mut preimage = Vec::with_capacity(20 + 8 + payload.len());
        preimage.extend_from_slice(sender.as_slice());
        preimage.extend_from_slice(&current.to_be_bytes());
        preimage.extend_from_slice(payload);
        (keccak256(&preimage), current)
    }
}

#[derive(Debug, Default)]
struct FaultState {
    unreachable: bool,
    revert_proposals: HashSet<u64>,
    drop_receipts: HashSet<u64>,
}

/// Fault injection for the simulated ledger.
#[derive(Debug, Clone, Default)]
pub struct SimLedgerController {
    faults: Arc<Mutex<FaultState>>,
}

impl SimLedgerController {
    /// Creates a controller with no faults.
    pub fn new() -> Self {
        Self::default()
    }

    fn faults(&self) -> MutexGuard<'_, FaultState> {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the node unreachable (or reachable again).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.faults().unreachable = unreachable;
    }

    /// Makes the transaction for `proposal_id` revert.
    pub fn revert_proposal(&self, proposal_id: u64) {
        self.faults().revert_proposals.insert(proposal_id);
    }

    /// Loses the receipt of the transaction for `proposal_id`.
    pub fn drop_receipt(&self, proposal_id: u64) {
        self.faults().drop_receipts.insert(proposal_id);
    }

    /// Clears all injected faults.
    pub fn heal_all(&self) {
        *self.faults() = FaultState::default();
    }

    pub fn is_unreachable(&self) -> bool {
        self.faults().unreachable
    }

    fn reverts(&self, proposal_id: u64) -> bool {
        self.faults().revert_proposals.contains(&proposal_id)
    }

    fn drops_receipt(&self, proposal_id: u64) -> bool {
        self.faults().drop_receipts.contains(&proposal_id)
    }
}

/// In-memory ledger.
///
/// Clones share the same chain.
#[derive(Debug, Clone)]
pub struct SimLedger {
    context: SimContext,
    state: Arc<Mutex<ChainState>>,
    controller: SimLedgerController,
}

impl SimLedger {
    /// Creates a ledger with the default number of accounts.
    pub fn new(seed: u64) -> Self {
        Self::with_accounts(seed, DEFAULT_ACCOUNT_COUNT)
    }

    /// Creates a ledger exposing `count` deterministic accounts.
    pub fn with_accounts(seed: u64, count: usize) -> Self {
        let context = SimContext::new(seed);
        let accounts = (0..count as u64).map(|i| context.derive_address(i)).collect();

        Self {
            context,
            state: Arc::new(Mutex::new(ChainState {
                accounts,
                gas_price_wei: DEFAULT_GAS_PRICE_WEI,
                block_number: 0,
                nonces: HashMap::new(),
                contracts: HashMap::new(),
                receipts: HashMap::new(),
                submitted: Vec::new(),
            })),
            controller: SimLedgerController::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_reachable(&self) -> Result<(), LedgerError> {
        if self.controller.is_unreachable() {
            return Err(LedgerError::unreachable("simulated node is down"));
        }
        Ok(())
    }

    /// Returns the fault-injection controller.
    pub fn controller(&self) -> SimLedgerController {
        self.controller.clone()
    }

    /// Sets the gas price reported by the node.
    pub fn set_gas_price(&self, gas_price_wei: u128) {
        self.state().gas_price_wei = gas_price_wei;
    }

    /// Returns all exposed accounts.
    pub fn accounts(&self) -> Vec<Address> {
        self.state().accounts.clone()
    }

    /// Returns the number of mined blocks.
    pub fn block_number(&self) -> u64 {
        self.state().block_number
    }

    /// Returns every decision call submitted, in order (including reverted ones).
    pub fn submitted_calls(&self) -> Vec<DecisionCall> {
        self.state().submitted.clone()
    }

    /// Returns the stored decisions of a contract in decision-id order.
    pub fn decisions(&self, contract: Address) -> Vec<LedgerDecision> {
        self.state()
            .contracts
            .get(&contract)
            .map(|store| store.decisions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Mines a contract-creation transaction and returns the contract handle.
    pub fn deploy(&self, sender: Address) -> Result<SimDecisionContract, LedgerError> {
        self.ensure_reachable()?;
        let mut state = self.state();
        if !state.accounts.contains(&sender) {
            return Err(LedgerError::deployment(format!("unknown sender {}", sender)));
        }

        let (tx_hash, _) = state.next_tx_hash(sender, b"DAOGovernance");
        let address = Address::from_slice(&tx_hash[12..]);
        self.context.advance_time(BLOCK_INTERVAL);
        state.block_number += 1;
        state.contracts.insert(address, DecisionStore::default());

        debug!(
            "Deployed decision contract at {} (block={}, gas={})",
            address, state.block_number, DEPLOY_GAS
        );

        Ok(SimDecisionContract {
            address,
            ledger: self.clone(),
        })
    }

    /// Returns a handle to a contract deployed earlier.
    pub fn attach(&self, address: Address) -> Result<SimDecisionContract, LedgerError> {
        if !self.state().contracts.contains_key(&address) {
            return Err(LedgerError::deployment(format!("no contract at {}", address)));
        }
        Ok(SimDecisionContract {
            address,
            ledger: self.clone(),
        })
    }

    fn mine_decision(
        &self,
        contract: Address,
        call: DecisionCall,
        sender: Address,
    ) -> Result<TxHandle, LedgerError> {
        self.ensure_reachable()?;
        let mut state = self.state();
        if !state.accounts.contains(&sender) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("sender account not recognized: {}", sender),
            });
        }
        if !state.contracts.contains_key(&contract) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("no contract at {}", contract),
            });
        }

        let calldata = abi::encode_execute_decision(&call);
        let (tx_hash, _) = state.next_tx_hash(sender, &calldata);
        state.submitted.push(call);

        self.context.advance_time(BLOCK_INTERVAL);
        state.block_number += 1;
        let timestamp = self.context.unix_timestamp();

        let mined = if self.controller.reverts(call.proposal_id) {
            MinedReceipt::Reverted
        } else {
            let store = state
                .contracts
                .get_mut(&contract)
                .ok_or_else(|| LedgerError::deployment(format!("no contract at {}", contract)))?;
            let previous_count = store.decisions.len() as u64;
            let decision_id = previous_count + 1;
            let gas_used = decision_gas(&calldata, previous_count);

            let event = DecisionEvent {
                decision_id,
                proposal_id: call.proposal_id,
                dao_version: call.dao_version,
                executor: sender,
                timestamp,
            };
            store
                .decisions
                .insert(decision_id, LedgerDecision::from_event(&event, gas_used));

            MinedReceipt::Success(DecisionReceipt {
                tx_hash,
                gas_used,
                contract_address: None,
                event: Some(event),
            })
        };

        if !self.controller.drops_receipt(call.proposal_id) {
            state.receipts.insert(tx_hash, mined);
        }
        Ok(TxHandle(tx_hash))
    }

    fn take_receipt(&self, tx: &TxHandle) -> Result<DecisionReceipt, LedgerError> {
        self.ensure_reachable()?;
        match self.state().receipts.remove(&tx.hash()) {
            Some(MinedReceipt::Success(receipt)) => Ok(receipt),
            Some(MinedReceipt::Reverted) => Err(LedgerError::Reverted(tx.hash().to_string())),
            None => Err(LedgerError::ReceiptUnavailable(tx.hash().to_string())),
        }
    }
}

#[async_trait]
impl LedgerConnection for SimLedger {
    async fn is_reachable(&self) -> bool {
        !self.controller.is_unreachable()
    }

    async fn primary_account(&self) -> Result<Address, LedgerError> {
        self.ensure_reachable()?;
        self.state()
            .accounts
            .first()
            .copied()
            .ok_or(LedgerError::NoAccounts)
    }

    async fn current_gas_price(&self) -> Result<u128, LedgerError> {
        self.ensure_reachable()?;
        Ok(self.state().gas_price_wei)
    }
}

/// Handle to a decision contract on a [`SimLedger`].
#[derive(Debug, Clone)]
pub struct SimDecisionContract {
    address: Address,
    ledger: SimLedger,
}

impl SimDecisionContract {
    /// Returns the stored decisions in decision-id order.
    pub fn decisions(&self) -> Vec<LedgerDecision> {
        self.ledger.decisions(self.address)
    }
}

#[async_trait]
impl DeployedContract for SimDecisionContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn submit_decision(
        &self,
        call: DecisionCall,
        sender: Address,
    ) -> Result<TxHandle, LedgerError> {
        self.ledger.mine_decision(self.address, call, sender)
    }

    async fn await_receipt(&self, tx: &TxHandle) -> Result<DecisionReceipt, LedgerError> {
        self.ledger.take_receipt(tx)
    }

    async fn decision_count(&self) -> Result<u64, LedgerError> {
        self.ledger.ensure_reachable()?;
        Ok(self
            .ledger
            .state()
            .contracts
            .get(&self.address)
            .map(|store| store.decisions.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn deployed(seed: u64) -> (SimLedger, SimDecisionContract, Address) {
        let ledger = SimLedger::new(seed);
        let sender = ledger.primary_account().await.unwrap();
        let contract = ledger.deploy(sender).unwrap();
        (ledger, contract, sender)
    }

    #[tokio::test]
    async fn test_decision_ids_are_sequential() {
        let (ledger, contract, sender) = deployed(42).await;

        for proposal in 1..=3u64 {
            let tx = contract
                .submit_decision(DecisionCall::new(proposal, proposal as u8), sender)
                .await
                .unwrap();
            let receipt = contract.await_receipt(&tx).await.unwrap();
            let event = receipt.event.unwrap();

            assert_eq!(event.decision_id, proposal);
            assert_eq!(event.proposal_id, proposal);
            assert_eq!(event.executor, sender);
        }

        assert_eq!(contract.decision_count().await.unwrap(), 3);
        let decisions = contract.decisions();
        assert_eq!(decisions.len(), 3);
        assert_eq!(decisions[2].generation_id, 3);
        // Deployment block + three decision blocks
        assert_eq!(ledger.block_number(), 4);
        assert!(decisions[0].block_timestamp < decisions[1].block_timestamp);
    }

    #[tokio::test]
    async fn test_first_decision_costs_more() {
        let (_, contract, sender) = deployed(1).await;

        let tx1 = contract.submit_decision(DecisionCall::new(1, 1), sender).await.unwrap();
        let gas1 = contract.await_receipt(&tx1).await.unwrap().gas_used;
        let tx2 = contract.submit_decision(DecisionCall::new(2, 2), sender).await.unwrap();
        let gas2 = contract.await_receipt(&tx2).await.unwrap().gas_used;

        assert_eq!(gas1 - gas2, SSTORE_SET_GAS - SSTORE_RESET_GAS);
        assert!(gas2 > TX_BASE_GAS);
    }

    #[tokio::test]
    async fn test_same_seed_same_chain() {
        let (l1, c1, s1) = deployed(42).await;
        let (l2, c2, s2) = deployed(42).await;

        assert_eq!(s1, s2);
        assert_eq!(c1.address(), c2.address());
        assert_eq!(l1.accounts(), l2.accounts());

        let tx1 = c1.submit_decision(DecisionCall::new(1, 1), s1).await.unwrap();
        let tx2 = c2.submit_decision(DecisionCall::new(1, 1), s2).await.unwrap();
        assert_eq!(tx1, tx2);
        assert_eq!(
            c1.await_receipt(&tx1).await.unwrap(),
            c2.await_receipt(&tx2).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_receipt_can_only_be_taken_once() {
        let (_, contract, sender) = deployed(5).await;
        let tx = contract.submit_decision(DecisionCall::new(1, 1), sender).await.unwrap();

        assert!(contract.await_receipt(&tx).await.is_ok());
        assert!(matches!(
            contract.await_receipt(&tx).await,
            Err(LedgerError::ReceiptUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_reverted_proposal_is_not_stored() {
        let (ledger, contract, sender) = deployed(5).await;
        ledger.controller().revert_proposal(2);

        let tx = contract.submit_decision(DecisionCall::new(2, 2), sender).await.unwrap();
        assert!(matches!(
            contract.await_receipt(&tx).await,
            Err(LedgerError::Reverted(_))
        ));
        assert_eq!(contract.decision_count().await.unwrap(), 0);
        assert_eq!(ledger.submitted_calls(), vec![DecisionCall::new(2, 2)]);
    }

    #[tokio::test]
    async fn test_dropped_receipt() {
        let (ledger, contract, sender) = deployed(5).await;
        ledger.controller().drop_receipt(1);

        let tx = contract.submit_decision(DecisionCall::new(1, 1), sender).await.unwrap();
        assert!(matches!(
            contract.await_receipt(&tx).await,
            Err(LedgerError::ReceiptUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let (ledger, contract, sender) = deployed(5).await;
        ledger.controller().set_unreachable(true);

        assert!(!ledger.is_reachable().await);
        assert!(ledger.primary_account().await.unwrap_err().is_connectivity());
        assert!(contract
            .submit_decision(DecisionCall::new(1, 1), sender)
            .await
            .is_err());

        ledger.controller().heal_all();
        assert!(ledger.is_reachable().await);
    }

    #[tokio::test]
    async fn test_no_accounts() {
        let ledger = SimLedger::with_accounts(5, 0);
        assert!(matches!(
            ledger.primary_account().await,
            Err(LedgerError::NoAccounts)
        ));
    }

    #[tokio::test]
    async fn test_unknown_sender_rejected() {
        let (_, contract, _) = deployed(5).await;
        let stranger = Address::repeat_byte(0xee);

        assert!(matches!(
            contract.submit_decision(DecisionCall::new(1, 1), stranger).await,
            Err(LedgerError::Rpc { .. })
        ));
    }

    #[test]
    fn test_attach_requires_deployment() {
        let ledger = SimLedger::new(9);
        assert!(ledger.attach(Address::repeat_byte(1)).is_err());
    }
}
