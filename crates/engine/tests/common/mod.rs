//! Common test utilities for engine integration tests.

pub mod fixtures;

pub use fixtures::*;

use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{ecdsa, Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::consensus::encode::serialize;
use bitcoin::{Amount, Script, Transaction, TxOut};
use escrow_engine::PublicKey;
use sha2::{Digest, Sha256};

/// Check a finalized input independently of the combiner: the witness
/// script hashes to the spent output and each signature verifies, in
/// script key order, against a freshly computed BIP-143 sighash.
pub fn assert_witness_satisfies(
    tx: &Transaction,
    input_index: usize,
    escrow_script_pubkey: &Script,
    amount: u64,
    signers_in_order: &[PublicKey],
) {
    let witness = &tx.input[input_index].witness;
    let script_bytes = witness.last().expect("witness script");
    let program: [u8; 32] = Sha256::digest(script_bytes).into();
    assert_eq!(&escrow_script_pubkey.as_bytes()[2..], &program[..]);

    assert!(witness.nth(0).unwrap().is_empty(), "CHECKMULTISIG dummy");

    let sighash = SighashCache::new(tx)
        .p2wsh_signature_hash(
            input_index,
            Script::from_bytes(script_bytes),
            Amount::from_sat(amount),
            EcdsaSighashType::All,
        )
        .unwrap();
    let message = Message::from_digest(sighash.to_byte_array());
    let secp = Secp256k1::verification_only();

    for (i, key) in signers_in_order.iter().enumerate() {
        let raw = witness.nth(i + 1).unwrap();
        assert_eq!(*raw.last().unwrap(), 0x01, "SIGHASH_ALL byte");
        let sig = ecdsa::Signature::from_der(&raw[..raw.len() - 1]).unwrap();
        secp.verify_ecdsa(&message, &sig, key.inner())
            .expect("signature verifies against its key");
    }
}

/// Run a single-input spend through libbitcoinconsensus (Bitcoin Core's
/// script interpreter with all soft-fork flags, CSV and taproot included).
pub fn consensus_verify(tx: &Transaction, spent: &TxOut) -> Result<(), bitcoinconsensus::Error> {
    assert_eq!(tx.input.len(), 1, "single-input spends only");

    let tx_bytes = serialize(tx);
    let script_bytes = spent.script_pubkey.as_bytes();
    let spent_utxo = bitcoinconsensus::Utxo {
        script_pubkey: script_bytes.as_ptr(),
        script_pubkey_len: script_bytes.len() as u32,
        value: spent.value.to_sat() as i64,
    };

    bitcoinconsensus::verify(
        script_bytes,
        spent.value.to_sat(),
        &tx_bytes,
        Some(&[spent_utxo]),
        0,
    )
}

pub fn assert_consensus_valid(tx: &Transaction, spent: &TxOut) {
    let result = consensus_verify(tx, spent);
    assert!(
        result.is_ok(),
        "consensus verification failed: {:?}",
        result.err()
    );
}
