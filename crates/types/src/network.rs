//! Networks the escrow can be deployed on, and the roles of its participants.

use crate::error::EscrowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bitcoin network an escrow lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet4,
    Signet,
    /// Signet variant with 30 second blocks.
    Mutinynet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Mainnet,
        Network::Testnet4,
        Network::Signet,
        Network::Mutinynet,
    ];

    /// Target block interval in seconds.
    pub fn block_interval_secs(self) -> u64 {
        match self {
            Network::Mainnet | Network::Testnet4 | Network::Signet => 600,
            Network::Mutinynet => 30,
        }
    }

    /// Network parameters used for address encoding.
    ///
    /// Testnet4 shares the `tb` prefix and WIF version with testnet3, so it
    /// maps onto the testnet parameters.
    pub fn bitcoin_network(self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet4 => bitcoin::Network::Testnet,
            Network::Signet | Network::Mutinynet => bitcoin::Network::Signet,
        }
    }

    /// Mainnet or test network, as encoded in WIF private keys.
    pub fn network_kind(self) -> bitcoin::NetworkKind {
        bitcoin::NetworkKind::from(self.bitcoin_network())
    }

    /// Human-readable part of segwit addresses on this network.
    pub fn address_hrp(self) -> &'static str {
        match self {
            Network::Mainnet => "bc",
            Network::Testnet4 | Network::Signet | Network::Mutinynet => "tb",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet4 => "testnet4",
            Network::Signet => "signet",
            Network::Mutinynet => "mutinynet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Network::Mainnet),
            "testnet4" | "testnet" => Ok(Network::Testnet4),
            "signet" => Ok(Network::Signet),
            "mutinynet" => Ok(Network::Mutinynet),
            other => Err(EscrowError::NetworkMismatch {
                expected: "mainnet, testnet4, signet or mutinynet".to_string(),
                actual: other.to_string(),
            }),
        }
    }
}

/// Role a key plays in an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowRole {
    PartyA,
    PartyB,
    Arbiter,
}

impl fmt::Display for EscrowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscrowRole::PartyA => write!(f, "party A"),
            EscrowRole::PartyB => write!(f, "party B"),
            EscrowRole::Arbiter => write!(f, "arbiter"),
        }
    }
}
