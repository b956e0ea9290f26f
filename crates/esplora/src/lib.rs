//! Esplora / mempool.space adapter.
//!
//! Looks up escrow funding, fetches fee recommendations and broadcasts
//! finalized escrow transactions.
//! Lives outside the engine: it only exchanges plain data with it.

pub mod client;
pub mod error;

pub use client::EsploraClient;
pub use error::EsploraError;
