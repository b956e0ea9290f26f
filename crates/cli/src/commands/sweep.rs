//! Identity sweep command.

use anyhow::{Context, Result};
use escrow_engine::{
    decode_private_key, derive_public_key, encode_public_key, identity_address,
    sweep_fee_for_rate, sweep_identity, EscrowContext,
};
use serde::Serialize;

use crate::commands::{resolve_fee, resolve_funding, FeeChoice};
use crate::config::Config;
use crate::output::{Note, Output};

/// Spend of one output of an identity's payout address.
pub struct SweepRequest {
    pub key: Option<String>,
    pub destination: String,
    pub funding_txid: Option<String>,
    pub vout: u32,
    pub amount: Option<u64>,
    pub fee: FeeChoice,
}

#[derive(Serialize)]
struct SweepDocument {
    identity_address: String,
    destination: String,
    amount: u64,
    fee: u64,
    fee_rate: Option<u64>,
    txid: String,
    vsize: u64,
    signed_tx_hex: String,
}

/// Sign a key-path spend from the P2TR payout address of an identity key.
///
/// Funding txid and amount default to the address's single funding
/// transaction and confirmed balance.
pub async fn sweep(
    ctx: &EscrowContext,
    config: &Config,
    out: &Output,
    request: SweepRequest,
) -> Result<()> {
    let network = config.network;

    let key = match request.key {
        Some(key) => key,
        None => dialoguer::Password::new()
            .with_prompt("Identity private key (nsec, hex or WIF)")
            .interact()
            .context("Failed to read private key")?,
    };
    let private_key = decode_private_key(ctx, key.trim(), network)?;
    drop(key);

    let npub = encode_public_key(&derive_public_key(ctx, &private_key))?;
    let source = identity_address(ctx, &npub, network)?.to_string();

    let (funding_txid, amount) = resolve_funding(
        config,
        out,
        &source,
        request.funding_txid,
        request.amount,
    )
    .await?;

    let (fee, fee_rate) = resolve_fee(config, out, request.fee, |rate| {
        sweep_fee_for_rate(rate, &request.destination, network)
    })
    .await?;

    let swept = sweep_identity(
        ctx,
        private_key,
        &funding_txid,
        request.vout,
        amount,
        &request.destination,
        fee,
        network,
    )?;

    let document = SweepDocument {
        identity_address: source,
        destination: request.destination,
        amount,
        fee,
        fee_rate,
        txid: swept.txid,
        vsize: swept.vsize,
        signed_tx_hex: swept.signed_tx_hex,
    };
    if out.document(&document)? {
        return Ok(());
    }

    out.section("Identity sweep");
    out.field("From", &document.identity_address);
    out.field("Outpoint", format!("{}:{}", funding_txid, request.vout));
    out.field("To", &document.destination);
    out.amount("Amount", document.amount - document.fee);
    out.amount("Fee", document.fee);
    out.field("Txid", &document.txid);
    out.field("Virtual size", format!("{} vB", document.vsize));
    out.hex("Transaction", &document.signed_tx_hex);

    println!();
    out.note(Note::Hint, "Publish with `satoshi-escrow broadcast --tx <HEX>`");
    Ok(())
}
