//! Error taxonomy shared by every escrow operation.

use thiserror::Error;

/// Result alias used across the escrow crates.
pub type Result<T> = std::result::Result<T, EscrowError>;

/// Errors that can occur while building, signing or combining escrow transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("Network mismatch: expected {expected}, got {actual}")]
    NetworkMismatch { expected: String, actual: String },

    #[error("Invalid key count: {0}")]
    InvalidKeyCount(String),

    #[error("Timelock out of range: {blocks} blocks (must be between {min} and {max})")]
    TimelockOutOfRange { blocks: u64, min: u64, max: u64 },

    #[error("Invalid input index {index}: transaction has {inputs} input(s)")]
    InvalidInputIndex { index: usize, inputs: usize },

    #[error("Invalid payout count: a resolution pays one or two destinations, got {count}")]
    InvalidPayoutCount { count: usize },

    #[error("Amount underflow: fee {fee} sats must be below the escrow amount {amount} sats")]
    AmountUnderflow { amount: u64, fee: u64 },

    #[error("Amount mismatch: outputs {outputs} sats + fee {fee} sats != input {input} sats")]
    AmountMismatch { input: u64, outputs: u64, fee: u64 },

    #[error("Signature count mismatch: expected {expected}, got {actual}")]
    SignatureCountMismatch { expected: usize, actual: usize },

    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("Invalid outpoint: {0}")]
    InvalidOutpoint(String),

    #[error("Invalid TXID: {0}")]
    InvalidTxid(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Invalid script: {0}")]
    InvalidScript(String),
}
