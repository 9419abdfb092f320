//! Minimal ABI codec for the `DAOGovernance` decision contract.
//!
//! Only the three entry points the engine needs are covered:
//! `executeDecision(uint256,uint8)`, `decisionCount()` and the
//! `DecisionExecuted` event.

use alloy_primitives::{keccak256, Address, B256};

use crate::error::LedgerError;
use crate::types::{DecisionCall, DecisionEvent};

pub const EXECUTE_DECISION_SIG: &str = "executeDecision(uint256,uint8)";
pub const DECISION_COUNT_SIG: &str = "decisionCount()";
pub const DECISION_EXECUTED_SIG: &str = "DecisionExecuted(uint256,uint256,uint8,address,uint256)";

const WORD: usize = 32;

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic 0 of the `DecisionExecuted` event.
pub fn decision_executed_topic() -> B256 {
    keccak256(DECISION_EXECUTED_SIG.as_bytes())
}

/// Left-pads an integer into a 32-byte ABI word.
pub fn encode_u64_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Reads an ABI word that must fit in a u64.
pub fn decode_u64_word(word: &[u8]) -> Result<u64, LedgerError> {
    if word.len() != WORD {
        return Err(LedgerError::decode(format!(
            "expected {} byte word, got {}",
            WORD,
            word.len()
        )));
    }
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(LedgerError::decode("word does not fit in u64"));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(tail))
}

/// Calldata for `executeDecision(proposalId, daoVersion)`.
pub fn encode_execute_decision(call: &DecisionCall) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&selector(EXECUTE_DECISION_SIG));
    data.extend_from_slice(&encode_u64_word(call.proposal_id));
    data.extend_from_slice(&encode_u64_word(call.dao_version as u64));
    data
}

/// Calldata for `decisionCount()`.
pub fn encode_decision_count() -> Vec<u8> {
    selector(DECISION_COUNT_SIG).to_vec()
}

/// Decodes a `DecisionExecuted` log.
///
/// Returns `Ok(None)` for logs of any other event.
pub fn decode_decision_event(
    topics: &[B256],
    data: &[u8],
) -> Result<Option<DecisionEvent>, LedgerError> {
    if topics.first() != Some(&decision_executed_topic()) {
        return Ok(None);
    }
    if topics.len() != 4 {
        return Err(LedgerError::decode(format!(
            "DecisionExecuted has {} topics, expected 4",
            topics.len()
        )));
    }
    if data.len() < 2 * WORD {
        return Err(LedgerError::decode("DecisionExecuted data too short"));
    }

    let dao_version = decode_u64_word(topics[3].as_slice())?;
    let dao_version = u8::try_from(dao_version)
        .map_err(|_| LedgerError::decode("daoVersion does not fit in uint8"))?;

    Ok(Some(DecisionEvent {
        decision_id: decode_u64_word(topics[1].as_slice())?,
        proposal_id: decode_u64_word(topics[2].as_slice())?,
        dao_version,
        executor: Address::from_slice(&data[12..WORD]),
        timestamp: decode_u64_word(&data[WORD..2 * WORD])?,
    }))
}
