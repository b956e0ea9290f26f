//! Shared types for the escrow engine and its collaborators.
//!
//! Kept free of any curve or HTTP machinery so both the engine and the
//! Esplora adapter can depend on it.

pub mod chain;
pub mod error;
pub mod fees;
pub mod network;

pub use chain::{AddressStats, AddressTx, TxStatus, TxoStats};
pub use error::{EscrowError, Result};
pub use fees::{BroadcastResult, FeeRecommendations, FeeTier};
pub use network::{EscrowRole, Network};
