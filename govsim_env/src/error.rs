//! Error types for the GovSim ledger abstraction.

use thiserror::Error;

/// Errors raised by a ledger collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Node could not be reached or answered with a transport failure
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),

    /// Node has no unlocked account to send from
    #[error("No accounts available on the ledger")]
    NoAccounts,

    /// JSON-RPC call returned an error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Response could not be decoded
    #[error("Malformed ledger response: {0}")]
    Decode(String),

    /// Transaction was mined but reverted
    #[error("Transaction {0} reverted")]
    Reverted(String),

    /// Receipt for a submitted transaction is unknown to the ledger
    #[error("Receipt unavailable for transaction {0}")]
    ReceiptUnavailable(String),

    /// Receipt event does not describe the submitted decision
    #[error("Decision event mismatch: {0}")]
    EventMismatch(String),

    /// Contract creation did not produce a contract address
    #[error("Deployment failed: {0}")]
    Deployment(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl LedgerError {
    /// Creates an unreachable error.
    pub fn unreachable(msg: impl std::fmt::Display) -> Self {
        Self::Unreachable(msg.to_string())
    }

    /// Creates a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates a deployment error.
    pub fn deployment(msg: impl Into<String>) -> Self {
        Self::Deployment(msg.into())
    }

    /// Classifies an HTTP transport failure.
    ///
    /// Timeouts report the per-request limit that was in force.
    pub fn transport(err: reqwest::Error, request_timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(request_timeout.as_millis() as u64)
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }

    /// Returns true if the error means the node itself is not usable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::NoAccounts)
    }
}

