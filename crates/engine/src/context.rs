//! Explicit secp256k1 context.

use bitcoin::secp256k1::{All, Secp256k1};

/// Curve context shared by signing and key derivation.
///
/// Construct once and pass by reference. The context is read-only after
/// construction, so a single instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct EscrowContext {
    secp: Secp256k1<All>,
}

impl EscrowContext {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }
}

impl Default for EscrowContext {
    fn default() -> Self {
        Self::new()
    }
}
