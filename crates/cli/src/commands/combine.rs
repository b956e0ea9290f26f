//! Signature combination command.

use anyhow::{Context, Result};
use escrow_engine::api;
use escrow_engine::{EscrowContext, SpendingBranch};

use crate::output::{Note, Output};

/// Split a `PUBKEY:SIGNATURE` argument.
fn split_signature(value: &str) -> Result<(&str, &str)> {
    value
        .split_once(':')
        .map(|(pubkey, sig)| (pubkey.trim(), sig.trim()))
        .with_context(|| format!("Expected PUBKEY:SIGNATURE, got '{}'", value))
}

/// Verify both signatures and print the broadcastable transaction.
#[allow(clippy::too_many_arguments)]
pub fn combine(
    ctx: &EscrowContext,
    out: &Output,
    branch: SpendingBranch,
    tx_hex: &str,
    script_hex: &str,
    amount: u64,
    sigs: &[String],
    input: usize,
) -> Result<()> {
    let pairs = sigs
        .iter()
        .map(|value| split_signature(value))
        .collect::<Result<Vec<_>>>()?;
    let pubkeys: Vec<&str> = pairs.iter().map(|(pubkey, _)| *pubkey).collect();
    let signatures: Vec<&str> = pairs.iter().map(|(_, sig)| *sig).collect();

    let combined = api::combine(
        ctx,
        tx_hex,
        input,
        &signatures,
        &pubkeys,
        script_hex,
        amount,
        branch,
    )?;

    if out.document(&combined)? {
        return Ok(());
    }

    out.section("Signed resolution");
    out.field("Txid", &combined.txid);
    out.field("Virtual size", format!("{} vB", combined.vsize));
    out.hex("Transaction", &combined.signed_tx_hex);

    println!();
    out.note(Note::Done, "Both signatures verify against the escrow script");
    out.note(Note::Hint, "Publish with `satoshi-escrow broadcast --tx <HEX>`");
    Ok(())
}
