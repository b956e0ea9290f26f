//! Key-path spend of an identity's taproot address.
//!
//! Resolution payouts default to the P2TR address of a party's `npub`
//! (see [`identity_address`](crate::keys::identity_address)). The matching
//! `nsec` sweeps it with a one-input, one-output BIP-341 key-path spend.

use crate::context::EscrowContext;
use crate::keys::PrivateKey;
use crate::tx_builder::{payout_script, DUST_LIMIT};
use crate::types::CombinedTransaction;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::hashes::Hash;
use bitcoin::key::{Keypair, TapTweak};
use bitcoin::secp256k1::Message;
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::transaction::Version;
use bitcoin::{
    absolute, taproot, Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut,
    Txid, Witness,
};
use escrow_types::{EscrowError, Network, Result};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Witness of a key-path spend: item count, length byte, 64-byte signature.
const KEY_PATH_WITNESS_SIZE: u64 = 1 + 1 + 64;

/// Unsigned sweep of `funding_txid:vout` to `destination`, paying `amount - fee`.
pub fn build_sweep_tx(
    funding_txid: &str,
    vout: u32,
    amount: u64,
    destination: &str,
    fee: u64,
    network: Network,
) -> Result<Transaction> {
    let txid = Txid::from_str(funding_txid).map_err(|e| EscrowError::InvalidTxid(e.to_string()))?;

    if fee >= amount {
        return Err(EscrowError::AmountUnderflow { amount, fee });
    }
    let value = amount - fee;
    if value < DUST_LIMIT {
        warn!(value, "Sweep output is below the dust limit");
    }

    let tx = Transaction {
        version: Version::TWO,
        lock_time: absolute::LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint { txid, vout },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey: payout_script(destination, network)?,
        }],
    };

    debug!(txid = %tx.compute_txid(), value, fee, "Built identity sweep");
    Ok(tx)
}

/// Sign input 0 of a sweep with the identity key that owns the spent output.
///
/// The spent output is recomputed from the key, so a key that does not own
/// the address produces a transaction the network rejects, not an error.
pub fn sign_sweep(
    ctx: &EscrowContext,
    tx: &Transaction,
    private_key: PrivateKey,
    amount: u64,
    network: Network,
) -> Result<Transaction> {
    if tx.input.len() != 1 {
        return Err(EscrowError::InvalidTransaction(format!(
            "sweep spends exactly one input, got {}",
            tx.input.len()
        )));
    }

    let keypair = Keypair::from_secret_key(ctx.secp(), private_key.secret_key());
    let (internal_key, _) = keypair.x_only_public_key();
    let spent = TxOut {
        value: Amount::from_sat(amount),
        script_pubkey: Address::p2tr(ctx.secp(), internal_key, None, network.bitcoin_network())
            .script_pubkey(),
    };

    let sighash = SighashCache::new(tx)
        .taproot_key_spend_signature_hash(0, &Prevouts::All(&[spent]), TapSighashType::Default)
        .map_err(|e| EscrowError::InvalidTransaction(e.to_string()))?;

    let tweaked = keypair.tap_tweak(ctx.secp(), None).to_inner();
    let message = Message::from_digest(sighash.to_byte_array());
    let signature = ctx.secp().sign_schnorr_no_aux_rand(&message, &tweaked);

    let mut signed = tx.clone();
    signed.input[0].witness = Witness::p2tr_key_spend(&taproot::Signature {
        signature,
        sighash_type: TapSighashType::Default,
    });

    info!(
        txid = %signed.compute_txid(),
        vsize = signed.vsize(),
        "Signed identity sweep"
    );
    Ok(signed)
}

/// Virtual size of a signed sweep paying to `destination`.
pub fn estimate_sweep_vsize(destination: &str, network: Network) -> Result<u64> {
    let spk_len = payout_script(destination, network)?.len() as u64;

    // version, input count, one 41-byte input, output count, output, locktime
    let base = 4 + 1 + 41 + 1 + (8 + 1 + spk_len) + 4;
    // segwit marker and flag
    let witness = 2 + KEY_PATH_WITNESS_SIZE;

    Ok((base * 4 + witness).div_ceil(4))
}

pub fn sweep_fee_for_rate(sat_per_vb: u64, destination: &str, network: Network) -> Result<u64> {
    Ok(sat_per_vb * estimate_sweep_vsize(destination, network)?)
}

/// Build and sign in one step.
#[allow(clippy::too_many_arguments)]
pub fn sweep_identity(
    ctx: &EscrowContext,
    private_key: PrivateKey,
    funding_txid: &str,
    vout: u32,
    amount: u64,
    destination: &str,
    fee: u64,
    network: Network,
) -> Result<CombinedTransaction> {
    let unsigned = build_sweep_tx(funding_txid, vout, amount, destination, fee, network)?;
    let signed = sign_sweep(ctx, &unsigned, private_key, amount, network)?;

    Ok(CombinedTransaction {
        txid: signed.compute_txid().to_string(),
        signed_tx_hex: serialize_hex(&signed),
        vsize: signed.vsize() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::identity_address;
    use bitcoin::secp256k1::schnorr;

    const SECRET: &str = "67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa";
    const FUNDING_TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
    const NPUB: &str = "npub10elfcs4fr0l0r8af98jlmgdh9c8tcxjvz9qkw038js35mp4dma8qzvjptg";
    const P2WSH_DEST: &str = "tb1q256vxujwapp655r3cdk30aq3unxacln2hmq2qtfyyd92ntu6yeasfknjse";

    fn key() -> PrivateKey {
        PrivateKey::from_hex(SECRET).unwrap()
    }

    #[test]
    fn test_build_sweep() {
        let tx = build_sweep_tx(FUNDING_TXID, 3, 50_000, P2WSH_DEST, 500, Network::Testnet4)
            .unwrap();
        assert_eq!(tx.version, Version::TWO);
        assert_eq!(tx.input.len(), 1);
        assert_eq!(tx.input[0].previous_output.vout, 3);
        assert_eq!(tx.output.len(), 1);
        assert_eq!(tx.output[0].value, Amount::from_sat(49_500));
    }

    #[test]
    fn test_build_sweep_errors() {
        let err = build_sweep_tx(FUNDING_TXID, 0, 500, P2WSH_DEST, 500, Network::Testnet4)
            .unwrap_err();
        assert_eq!(err, EscrowError::AmountUnderflow { amount: 500, fee: 500 });

        let err = build_sweep_tx("zz", 0, 50_000, P2WSH_DEST, 500, Network::Testnet4)
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidTxid(_)));

        let err = build_sweep_tx(FUNDING_TXID, 0, 50_000, P2WSH_DEST, 500, Network::Mainnet)
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidAddress(_)));
    }

    #[test]
    fn test_sweep_signature_verifies_against_output_key() {
        let ctx = EscrowContext::new();
        let tx = build_sweep_tx(FUNDING_TXID, 0, 50_000, P2WSH_DEST, 500, Network::Testnet4)
            .unwrap();
        let signed = sign_sweep(&ctx, &tx, key(), 50_000, Network::Testnet4).unwrap();

        let witness = &signed.input[0].witness;
        assert_eq!(witness.len(), 1);
        let sig = schnorr::Signature::from_slice(witness.nth(0).unwrap()).unwrap();

        let keypair = Keypair::from_secret_key(ctx.secp(), key().secret_key());
        let (internal_key, _) = keypair.x_only_public_key();
        let address = Address::p2tr(ctx.secp(), internal_key, None, bitcoin::Network::Testnet);
        let spent = TxOut {
            value: Amount::from_sat(50_000),
            script_pubkey: address.script_pubkey(),
        };
        let sighash = SighashCache::new(&tx)
            .taproot_key_spend_signature_hash(0, &Prevouts::All(&[spent]), TapSighashType::Default)
            .unwrap();
        let message = Message::from_digest(sighash.to_byte_array());
        let tweaked = keypair.tap_tweak(ctx.secp(), None).to_inner();
        let (output_key, _) = tweaked.x_only_public_key();

        ctx.secp().verify_schnorr(&sig, &message, &output_key).unwrap();

        let estimate = estimate_sweep_vsize(P2WSH_DEST, Network::Testnet4).unwrap();
        assert_eq!(signed.vsize() as u64, estimate);
    }

    #[test]
    fn test_sweep_vsize() {
        let ctx = EscrowContext::new();
        let p2tr = identity_address(&ctx, NPUB, Network::Testnet4).unwrap().to_string();

        assert_eq!(estimate_sweep_vsize(&p2tr, Network::Testnet4).unwrap(), 111);
        assert_eq!(sweep_fee_for_rate(2, &p2tr, Network::Testnet4).unwrap(), 222);
    }

    #[test]
    fn test_sign_rejects_multi_input() {
        let ctx = EscrowContext::new();
        let mut tx = build_sweep_tx(FUNDING_TXID, 0, 50_000, P2WSH_DEST, 500, Network::Testnet4)
            .unwrap();
        tx.input.push(tx.input[0].clone());
        let err = sign_sweep(&ctx, &tx, key(), 50_000, Network::Testnet4).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidTransaction(_)));
    }
}
