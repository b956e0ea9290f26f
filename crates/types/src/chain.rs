//! On-chain view of an escrow address as reported by an Esplora server.

use serde::{Deserialize, Serialize};

/// Funded/spent output totals for one address, confirmed or in mempool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxoStats {
    #[serde(default)]
    pub funded_txo_count: u64,
    pub funded_txo_sum: u64,
    #[serde(default)]
    pub spent_txo_count: u64,
    pub spent_txo_sum: u64,
    #[serde(default)]
    pub tx_count: u64,
}

impl TxoStats {
    pub fn balance(&self) -> u64 {
        self.funded_txo_sum.saturating_sub(self.spent_txo_sum)
    }
}

/// Reply of `GET /address/{address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStats {
    pub address: String,
    pub chain_stats: TxoStats,
    #[serde(default)]
    pub mempool_stats: TxoStats,
}

impl AddressStats {
    /// Balance in confirmed blocks only. Unconfirmed funding is not counted.
    pub fn confirmed_balance(&self) -> u64 {
        self.chain_stats.balance()
    }

    pub fn mempool_balance(&self) -> u64 {
        self.mempool_stats.balance()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u32>,
}

/// One entry of `GET /address/{address}/txs`. Fields beyond these are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressTx {
    pub txid: String,
    #[serde(default)]
    pub status: TxStatus,
}
