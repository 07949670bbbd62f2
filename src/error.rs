//! Error types for the mint submitter

use ethers::types::H256;
use std::fmt;
use thiserror::Error;

/// Main error type for a mint run. Every variant is fatal.
#[derive(Error, Debug)]
pub enum MintError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    #[error("Key error: {0}")]
    Key(String),

    #[error("RPC error during {operation}: {message}")]
    Rpc { operation: String, message: String },

    #[error("Chain ID mismatch: expected {expected}, node reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Transaction rejected ({reason}): {message}")]
    Submission {
        reason: RejectReason,
        message: String,
    },

    #[error("Timeout waiting for receipt of {tx_hash:?}")]
    Timeout { tx_hash: H256 },

    #[error("Cancelled while waiting for receipt of {tx_hash:?}")]
    Cancelled { tx_hash: H256 },

    #[error("Transaction {tx_hash:?} reverted in block {block_number}")]
    Reverted { tx_hash: H256, block_number: u64 },
}

impl MintError {
    pub fn rpc(operation: &str, err: impl fmt::Display) -> Self {
        MintError::Rpc {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Build a submission error, classifying the node's rejection message
    pub fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        MintError::Submission {
            reason: RejectReason::classify(&message),
            message,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            MintError::Config(_) => 2,
            MintError::Connection { .. } => 3,
            MintError::Key(_) => 4,
            MintError::Rpc { .. } | MintError::ChainMismatch { .. } => 5,
            MintError::Encoding(_) => 6,
            MintError::Submission { .. } => 7,
            MintError::Timeout { .. } => 8,
            MintError::Cancelled { .. } => 9,
            MintError::Reverted { .. } => 10,
        }
    }

    /// Hash of the transaction if it already reached the node
    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            MintError::Timeout { tx_hash }
            | MintError::Cancelled { tx_hash }
            | MintError::Reverted { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }
}

/// Why the node refused a raw transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NonceTooLow,
    InsufficientFunds,
    Underpriced,
    AlreadyKnown,
    Other,
}

impl RejectReason {
    /// Classify a JSON-RPC error message. Clients word these differently,
    /// so matching is on lowercase substrings.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();
        if msg.contains("nonce too low") || msg.contains("invalid nonce") {
            RejectReason::NonceTooLow
        } else if msg.contains("insufficient funds") {
            RejectReason::InsufficientFunds
        } else if msg.contains("underpriced") || msg.contains("fee too low") {
            RejectReason::Underpriced
        } else if msg.contains("already known") || msg.contains("known transaction") {
            RejectReason::AlreadyKnown
        } else {
            RejectReason::Other
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::NonceTooLow => "nonce too low",
            RejectReason::InsufficientFunds => "insufficient funds",
            RejectReason::Underpriced => "underpriced",
            RejectReason::AlreadyKnown => "already known",
            RejectReason::Other => "rejected by node",
        };
        f.write_str(s)
    }
}

/// Result type for mint operations
pub type MintResult<T> = Result<T, MintError>;
