//! Plain data produced and consumed by the engine.

use bitcoin::consensus::deserialize;
use bitcoin::Transaction;
use escrow_types::{EscrowError, Result};
use serde::{Deserialize, Serialize};

/// Destination and amount for one side of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub address: String,
    pub amount: u64,
}

impl Payout {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// Escrow output being spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    /// Hex-encoded witness script the input must satisfy.
    pub witness_script: String,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub value: u64,
}

/// Unsigned resolution transaction plus everything a signer needs to check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub txid: String,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub escrow_amount_sats: u64,
    pub fee_sats: u64,
    pub unsigned_tx_hex: String,
    /// BIP-143 sighash of input 0, hex encoded.
    pub sighash: String,
}

impl UnsignedTransaction {
    pub fn transaction(&self) -> Result<Transaction> {
        decode_transaction(&self.unsigned_tx_hex)
    }
}

/// Fully witnessed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedTransaction {
    pub txid: String,
    pub signed_tx_hex: String,
    pub vsize: u64,
}

/// Decode a consensus-serialized transaction from hex.
pub fn decode_transaction(tx_hex: &str) -> Result<Transaction> {
    let tx_bytes =
        hex::decode(tx_hex.trim()).map_err(|e| EscrowError::InvalidTransaction(e.to_string()))?;

    deserialize(&tx_bytes).map_err(|e| EscrowError::InvalidTransaction(e.to_string()))
}
