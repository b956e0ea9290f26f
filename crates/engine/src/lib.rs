//! Escrow transaction engine.
//!
//! Builds the 2-of-2 collaborative and timelocked dispute P2WSH scripts,
//! assembles the unsigned resolution transaction, signs one input per party
//! and combines independently produced signatures into a broadcastable
//! transaction. Everything here is synchronous and free of I/O.

pub mod api;
pub mod combiner;
pub mod context;
pub mod keys;
pub mod scripts;
pub mod signer;
pub mod sweep;
pub mod timelock;
pub mod tx_builder;
pub mod types;

pub use combiner::{combine_signatures, SpendingBranch};
pub use context::EscrowContext;
pub use escrow_types::{EscrowError, EscrowRole, Network, Result};
pub use keys::{
    decode_private_key, decode_public_key, derive_public_key, encode_public_key,
    identity_address, parse_public_key, validate_identity_key, PrivateKey, PublicKey,
};
pub use scripts::{EscrowAddress, LockingScript};
pub use signer::{compute_sighash, sign_input, PartialSignature};
pub use sweep::{
    build_sweep_tx, estimate_sweep_vsize, sign_sweep, sweep_fee_for_rate, sweep_identity,
};
pub use timelock::{
    check_timelock, days_hours_to_blocks, days_to_blocks, hours_to_blocks, MAX_TIMELOCK_BLOCKS,
    MIN_TIMELOCK_BLOCKS,
};
pub use tx_builder::{
    build_resolution_tx, estimate_resolution_vsize, fee_for_rate, ResolutionPath,
    ResolutionTxBuilder, DUST_LIMIT, MAX_PAYOUTS,
};
pub use types::{
    decode_transaction, CombinedTransaction, Payout, TxInput, TxOutput, UnsignedTransaction,
};
