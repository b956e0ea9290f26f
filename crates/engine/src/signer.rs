//! Per-party signing over the BIP-143 (segwit v0) sighash.

use crate::context::EscrowContext;
use crate::keys::{derive_public_key, PrivateKey, PublicKey};
use crate::scripts::LockingScript;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{ecdsa, Message};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Amount, Script, Transaction};
use escrow_types::{EscrowError, Result};
use tracing::debug;

/// One party's signature over one input, tagged with the key that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSignature {
    pub pubkey: PublicKey,
    pub signature: ecdsa::Signature,
    pub sighash_type: EcdsaSighashType,
}

impl PartialSignature {
    /// Parse a DER signature with its trailing sighash byte.
    pub fn from_slice(pubkey: PublicKey, bytes: &[u8]) -> Result<Self> {
        let sig = bitcoin::ecdsa::Signature::from_slice(bytes)
            .map_err(|e| EscrowError::SignatureMismatch(format!("malformed signature: {}", e)))?;

        Ok(Self {
            pubkey,
            signature: sig.signature,
            sighash_type: sig.sighash_type,
        })
    }

    pub fn from_hex(pubkey: PublicKey, s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| EscrowError::SignatureMismatch(format!("malformed signature: {}", e)))?;
        Self::from_slice(pubkey, &bytes)
    }

    /// DER encoding followed by the sighash byte, as it appears in the witness.
    pub fn to_bytes(&self) -> Vec<u8> {
        bitcoin::ecdsa::Signature {
            signature: self.signature,
            sighash_type: self.sighash_type,
        }
        .to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// BIP-143 sighash (SIGHASH_ALL) of `input_index` spending `amount` locked by `witness_script`.
pub fn compute_sighash(
    tx: &Transaction,
    input_index: usize,
    witness_script: &Script,
    amount: u64,
) -> Result<[u8; 32]> {
    if input_index >= tx.input.len() {
        return Err(EscrowError::InvalidInputIndex {
            index: input_index,
            inputs: tx.input.len(),
        });
    }

    let sighash = SighashCache::new(tx)
        .p2wsh_signature_hash(
            input_index,
            witness_script,
            Amount::from_sat(amount),
            EcdsaSighashType::All,
        )
        .map_err(|_| EscrowError::InvalidInputIndex {
            index: input_index,
            inputs: tx.input.len(),
        })?;

    Ok(sighash.to_byte_array())
}

/// Sign one input with RFC-6979 deterministic nonces.
///
/// The key must belong to the locking script. A raw secret whose point has
/// the other y parity than the script's key (an identity key placed in the
/// script through its `npub`) is negated first. Consumes the private key.
pub fn sign_input(
    ctx: &EscrowContext,
    tx: &Transaction,
    input_index: usize,
    private_key: PrivateKey,
    amount: u64,
    locking_script: &LockingScript,
) -> Result<PartialSignature> {
    let (private_key, pubkey) = script_signing_key(ctx, private_key, locking_script)?;

    let sighash = compute_sighash(tx, input_index, &locking_script.to_script(), amount)?;
    let message = Message::from_digest(sighash);
    let signature = ctx.secp().sign_ecdsa(&message, private_key.secret_key());

    debug!(
        input = input_index,
        pubkey = %pubkey,
        sighash = %hex::encode(sighash),
        "Signed escrow input"
    );

    Ok(PartialSignature {
        pubkey,
        signature,
        sighash_type: EcdsaSighashType::All,
    })
}

/// Match the key to a script key, trying the negated scalar when only the
/// x coordinate agrees.
fn script_signing_key(
    ctx: &EscrowContext,
    private_key: PrivateKey,
    locking_script: &LockingScript,
) -> Result<(PrivateKey, PublicKey)> {
    let keys = locking_script.all_keys();
    let pubkey = derive_public_key(ctx, &private_key);
    if keys.contains(&pubkey) {
        return Ok((private_key, pubkey));
    }

    let negated = private_key.negate();
    let negated_pubkey = derive_public_key(ctx, &negated);
    if keys.contains(&negated_pubkey) {
        debug!(pubkey = %negated_pubkey, "Signing with the script's parity of the key");
        return Ok((negated, negated_pubkey));
    }

    Err(EscrowError::SignatureMismatch(format!(
        "signing key {} is not part of the locking script",
        pubkey
    )))
}

/// Check a partial signature against a precomputed sighash.
pub(crate) fn verify_partial(
    ctx: &EscrowContext,
    sighash: [u8; 32],
    partial: &PartialSignature,
) -> Result<()> {
    if partial.sighash_type != EcdsaSighashType::All {
        return Err(EscrowError::SignatureMismatch(format!(
            "signature from {} uses {} instead of SIGHASH_ALL",
            partial.pubkey, partial.sighash_type
        )));
    }

    ctx.secp()
        .verify_ecdsa(&Message::from_digest(sighash), &partial.signature, partial.pubkey.inner())
        .map_err(|_| {
            EscrowError::SignatureMismatch(format!(
                "signature from {} does not match the transaction sighash",
                partial.pubkey
            ))
        })
}
