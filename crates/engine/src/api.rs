//! String-level engine interface.
//!
//! Keys are `npub` or compressed hex strings, private keys `nsec`, hex or
//! WIF, transactions and scripts hex, amounts satoshis. Every function is
//! a thin wrapper over the typed modules.

use crate::combiner::{combine_signatures, SpendingBranch};
use crate::context::EscrowContext;
use crate::keys::{decode_private_key, parse_public_key, PublicKey};
use crate::scripts::LockingScript;
use crate::signer::{sign_input, PartialSignature};
use crate::sweep::sweep_identity;
use crate::tx_builder::{build_resolution_tx, ResolutionPath};
use crate::types::{decode_transaction, CombinedTransaction, Payout};
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{Address, Txid};
use escrow_types::{EscrowError, EscrowRole, Network, Result};
use std::str::FromStr;

pub use crate::keys::validate_identity_key;
pub use crate::timelock::{days_hours_to_blocks, days_to_blocks, hours_to_blocks};

/// Parse a participant key, naming its role on failure.
pub fn parse_role_key(s: &str, role: EscrowRole) -> Result<PublicKey> {
    parse_public_key(s).map_err(|e| match e {
        EscrowError::InvalidKeyEncoding(detail) => {
            EscrowError::InvalidKeyEncoding(format!("{} key: {}", role, detail))
        }
        other => other,
    })
}

fn collab_script(key_a: &str, key_b: &str) -> Result<LockingScript> {
    LockingScript::collaborative(&[
        parse_role_key(key_a, EscrowRole::PartyA)?,
        parse_role_key(key_b, EscrowRole::PartyB)?,
    ])
}

fn dispute_script(
    key_a: &str,
    key_b: &str,
    key_arbiter: &str,
    timelock_blocks: u64,
) -> Result<LockingScript> {
    LockingScript::dispute(
        &[
            parse_role_key(key_a, EscrowRole::PartyA)?,
            parse_role_key(key_b, EscrowRole::PartyB)?,
        ],
        parse_role_key(key_arbiter, EscrowRole::Arbiter)?,
        timelock_blocks,
    )
}

pub fn build_collab_address(key_a: &str, key_b: &str, network: Network) -> Result<String> {
    Ok(collab_script(key_a, key_b)?.address(network).address.to_string())
}

pub fn build_dispute_address(
    key_a: &str,
    key_b: &str,
    key_arbiter: &str,
    timelock_blocks: u64,
    network: Network,
) -> Result<String> {
    Ok(dispute_script(key_a, key_b, key_arbiter, timelock_blocks)?
        .address(network)
        .address
        .to_string())
}

pub fn build_collab_script(key_a: &str, key_b: &str) -> Result<String> {
    Ok(collab_script(key_a, key_b)?.to_hex())
}

pub fn build_dispute_script(
    key_a: &str,
    key_b: &str,
    key_arbiter: &str,
    timelock_blocks: u64,
) -> Result<String> {
    Ok(dispute_script(key_a, key_b, key_arbiter, timelock_blocks)?.to_hex())
}

/// Unsigned 2-of-2 resolution spending `funding_txid:0`.
#[allow(clippy::too_many_arguments)]
pub fn build_collab_tx(
    key_a: &str,
    key_b: &str,
    amount: u64,
    dest_a: &Payout,
    dest_b: &Payout,
    funding_txid: &str,
    fee: u64,
    network: Network,
) -> Result<String> {
    let script = collab_script(key_a, key_b)?;
    build_tx(
        &script,
        amount,
        dest_a,
        dest_b,
        funding_txid,
        fee,
        ResolutionPath::Collaborative,
        network,
    )
}

/// Unsigned resolution through the collaborative branch of a dispute script.
#[allow(clippy::too_many_arguments)]
pub fn build_dispute_tx(
    key_a: &str,
    key_b: &str,
    key_arbiter: &str,
    amount: u64,
    dest_a: &Payout,
    dest_b: &Payout,
    funding_txid: &str,
    fee: u64,
    timelock_blocks: u64,
    network: Network,
) -> Result<String> {
    let script = dispute_script(key_a, key_b, key_arbiter, timelock_blocks)?;
    build_tx(
        &script,
        amount,
        dest_a,
        dest_b,
        funding_txid,
        fee,
        ResolutionPath::Collaborative,
        network,
    )
}

/// Unsigned resolution through the timelocked arbitration branch.
///
/// The input sequence already carries the relative lock, so this is the
/// transaction the arbiter and the favoured party must sign.
#[allow(clippy::too_many_arguments)]
pub fn build_dispute_arbitration_tx(
    key_a: &str,
    key_b: &str,
    key_arbiter: &str,
    amount: u64,
    dest_a: &Payout,
    dest_b: &Payout,
    funding_txid: &str,
    fee: u64,
    timelock_blocks: u64,
    network: Network,
) -> Result<String> {
    let script = dispute_script(key_a, key_b, key_arbiter, timelock_blocks)?;
    build_tx(
        &script,
        amount,
        dest_a,
        dest_b,
        funding_txid,
        fee,
        ResolutionPath::Arbitrated,
        network,
    )
}

#[allow(clippy::too_many_arguments)]
fn build_tx(
    script: &LockingScript,
    amount: u64,
    dest_a: &Payout,
    dest_b: &Payout,
    funding_txid: &str,
    fee: u64,
    path: ResolutionPath,
    network: Network,
) -> Result<String> {
    let unsigned = build_resolution_tx(
        funding_txid,
        0,
        amount,
        fee,
        &[dest_a.clone(), dest_b.clone()],
        script,
        path,
        network,
    )?;
    Ok(unsigned.unsigned_tx_hex)
}

/// Sign `input_index` of `tx_hex`; returns the DER signature plus sighash byte in hex.
pub fn sign(
    ctx: &EscrowContext,
    tx_hex: &str,
    input_index: usize,
    private_key: &str,
    amount: u64,
    locking_script_hex: &str,
    network: Network,
) -> Result<String> {
    let tx = decode_transaction(tx_hex)?;
    let script = LockingScript::from_hex(locking_script_hex)?;
    let key = decode_private_key(ctx, private_key, network)?;

    Ok(sign_input(ctx, &tx, input_index, key, amount, &script)?.to_hex())
}

pub fn combine_collab(
    ctx: &EscrowContext,
    tx_hex: &str,
    input_index: usize,
    signatures: &[&str],
    pubkeys: &[&str],
    locking_script_hex: &str,
    amount: u64,
) -> Result<String> {
    combine(
        ctx,
        tx_hex,
        input_index,
        signatures,
        pubkeys,
        locking_script_hex,
        amount,
        SpendingBranch::Collaborative,
    )
    .map(|combined| combined.signed_tx_hex)
}

pub fn combine_dispute_collab(
    ctx: &EscrowContext,
    tx_hex: &str,
    input_index: usize,
    signatures: &[&str],
    pubkeys: &[&str],
    locking_script_hex: &str,
    amount: u64,
) -> Result<String> {
    combine(
        ctx,
        tx_hex,
        input_index,
        signatures,
        pubkeys,
        locking_script_hex,
        amount,
        SpendingBranch::DisputeCollaborative,
    )
    .map(|combined| combined.signed_tx_hex)
}

pub fn combine_dispute_arbitrated(
    ctx: &EscrowContext,
    tx_hex: &str,
    input_index: usize,
    signatures: &[&str],
    pubkeys: &[&str],
    locking_script_hex: &str,
    amount: u64,
) -> Result<String> {
    combine(
        ctx,
        tx_hex,
        input_index,
        signatures,
        pubkeys,
        locking_script_hex,
        amount,
        SpendingBranch::DisputeArbitrated,
    )
    .map(|combined| combined.signed_tx_hex)
}

/// Pair signatures with their keys, combine, and report txid and size.
#[allow(clippy::too_many_arguments)]
pub fn combine(
    ctx: &EscrowContext,
    tx_hex: &str,
    input_index: usize,
    signatures: &[&str],
    pubkeys: &[&str],
    locking_script_hex: &str,
    amount: u64,
    branch: SpendingBranch,
) -> Result<CombinedTransaction> {
    if signatures.len() != pubkeys.len() {
        return Err(EscrowError::SignatureCountMismatch {
            expected: pubkeys.len(),
            actual: signatures.len(),
        });
    }

    let tx = decode_transaction(tx_hex)?;
    let script = LockingScript::from_hex(locking_script_hex)?;
    let partials = signatures
        .iter()
        .zip(pubkeys)
        .map(|(sig, key)| PartialSignature::from_hex(parse_public_key(key)?, sig))
        .collect::<Result<Vec<_>>>()?;

    let signed = combine_signatures(ctx, &tx, input_index, &partials, &script, amount, branch)?;
    Ok(CombinedTransaction {
        txid: signed.compute_txid().to_string(),
        signed_tx_hex: serialize_hex(&signed),
        vsize: signed.vsize() as u64,
    })
}

/// Spend `funding_txid:vout` from the identity address of `private_key` to
/// `destination`, paying `fee`.
#[allow(clippy::too_many_arguments)]
pub fn sweep(
    ctx: &EscrowContext,
    private_key: &str,
    funding_txid: &str,
    vout: u32,
    amount: u64,
    destination: &str,
    fee: u64,
    network: Network,
) -> Result<CombinedTransaction> {
    let key = decode_private_key(ctx, private_key, network)?;
    sweep_identity(ctx, key, funding_txid, vout, amount, destination, fee, network)
}

/// True if `address` parses and belongs to `network`.
pub fn validate_address(address: &str, network: Network) -> bool {
    Address::from_str(address)
        .map(|addr| addr.is_valid_for_network(network.bitcoin_network()))
        .unwrap_or(false)
}

/// True if `txid` is 64 hex characters.
pub fn validate_txid(txid: &str) -> bool {
    txid.len() == 64 && Txid::from_str(txid).is_ok()
}
