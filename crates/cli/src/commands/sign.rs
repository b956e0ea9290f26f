//! Signing command.

use anyhow::{Context, Result};
use escrow_engine::{
    decode_private_key, decode_transaction, derive_public_key, sign_input, EscrowContext,
    LockingScript,
};
use escrow_types::Network;
use serde::Serialize;

use crate::output::{Note, Output};

#[derive(Serialize)]
struct SignatureDocument {
    input: usize,
    pubkey: String,
    signature: String,
}

/// Sign one input of an unsigned resolution.
///
/// The key is read from a hidden prompt when not given on the command line.
#[allow(clippy::too_many_arguments)]
pub fn sign_transaction(
    ctx: &EscrowContext,
    out: &Output,
    network: Network,
    tx_hex: &str,
    script_hex: &str,
    amount: u64,
    key: Option<String>,
    input: usize,
) -> Result<()> {
    let tx = decode_transaction(tx_hex)?;
    let script = LockingScript::from_hex(script_hex)?;

    let key = match key {
        Some(key) => key,
        None => dialoguer::Password::new()
            .with_prompt("Private key (nsec, hex or WIF)")
            .interact()
            .context("Failed to read private key")?,
    };
    let private_key = decode_private_key(ctx, key.trim(), network)?;
    drop(key);

    let pubkey = derive_public_key(ctx, &private_key);
    let signature = sign_input(ctx, &tx, input, private_key, amount, &script)?;

    let document = SignatureDocument {
        input,
        pubkey: pubkey.to_hex(),
        signature: signature.to_hex(),
    };

    if out.document(&document)? {
        return Ok(());
    }

    out.section("Partial signature");
    out.field("Txid", tx.compute_txid());
    out.field("Input", input);
    out.field("Signer", &document.pubkey);
    out.hex("Signature", &document.signature);

    println!();
    out.note(
        Note::Hint,
        &format!(
            "Hand to the combiner as --sig {}:{}",
            document.pubkey, document.signature
        ),
    );
    Ok(())
}
