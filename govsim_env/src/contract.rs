//! Bundled `DAOGovernance` decision contract.
//!
//! The creation bytecode is a hand-assembled equivalent of the Solidity
//! source: same selectors, storage layout (`decisionCount` in slot 0,
//! `decisions` mapping in slot 1) and `DecisionExecuted` event.

use alloy_primitives::hex;

use crate::error::LedgerError;

/// Solidity source of the decision contract.
pub const DAO_GOVERNANCE_SOURCE: &str = include_str!("../contracts/DAOGovernance.sol");

/// Creation bytecode of the decision contract, hex encoded.
pub const DAO_GOVERNANCE_BYTECODE: &str = include_str!("../contracts/DAOGovernance.bin");

/// Decodes hex creation bytecode, with or without `0x` and surrounding whitespace.
pub fn decode_creation_code(text: &str) -> Result<Vec<u8>, LedgerError> {
    let code = hex::decode(text.trim())
        .map_err(|e| LedgerError::deployment(format!("invalid bytecode hex: {}", e)))?;
    if code.is_empty() {
        return Err(LedgerError::deployment("empty creation bytecode"));
    }
    Ok(code)
}

/// Creation bytecode of the bundled contract.
pub fn dao_governance_creation_code() -> Result<Vec<u8>, LedgerError> {
    decode_creation_code(DAO_GOVERNANCE_BYTECODE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{self, DECISION_COUNT_SIG, EXECUTE_DECISION_SIG};

    /// Runtime part of the creation code (after the copy-and-return prologue).
    fn runtime(code: &[u8]) -> &[u8] {
        // PUSH2 <runtime length> DUP1 PUSH2 <runtime offset> ...
        assert_eq!(code[0], 0x61);
        assert_eq!(code[4], 0x61);
        let len = u16::from_be_bytes([code[1], code[2]]) as usize;
        let offset = u16::from_be_bytes([code[5], code[6]]) as usize;
        assert_eq!(offset + len, code.len());
        &code[offset..]
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_bundled_bytecode_decodes() {
        let code = dao_governance_creation_code().unwrap();
        assert!(!code.is_empty());
        assert!(!runtime(&code).is_empty());
    }

    #[test]
    fn test_bundled_bytecode_dispatches_contract_interface() {
        let code = dao_governance_creation_code().unwrap();
        let runtime = runtime(&code);

        assert!(contains(runtime, &abi::selector(EXECUTE_DECISION_SIG)));
        assert!(contains(runtime, &abi::selector(DECISION_COUNT_SIG)));
        assert!(contains(runtime, &abi::selector("decisions(uint256)")));
        assert!(contains(runtime, abi::decision_executed_topic().as_slice()));
    }

    #[test]
    fn test_bundled_source_declares_interface() {
        assert!(DAO_GOVERNANCE_SOURCE.contains("contract DAOGovernance"));
        assert!(DAO_GOVERNANCE_SOURCE
            .contains("function executeDecision(uint256 proposalId, uint8 daoVersion)"));
        assert!(DAO_GOVERNANCE_SOURCE.contains("event DecisionExecuted("));
    }

    #[test]
    fn test_decode_creation_code() {
        assert_eq!(decode_creation_code("0x6001\n").unwrap(), vec![0x60, 0x01]);
        assert_eq!(decode_creation_code("  6001  ").unwrap(), vec![0x60, 0x01]);
        assert!(matches!(
            decode_creation_code(""),
            Err(LedgerError::Deployment(_))
        ));
        assert!(matches!(
            decode_creation_code("0xzz"),
            Err(LedgerError::Deployment(_))
        ));
    }
}
