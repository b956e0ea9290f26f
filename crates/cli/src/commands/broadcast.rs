//! Broadcast command.

use anyhow::{Context, Result};
use escrow_engine::decode_transaction;

use crate::commands::esplora_client;
use crate::config::Config;
use crate::output::{Note, Output};

/// Publish a signed transaction through the configured explorer.
///
/// The transaction is decoded locally first so malformed hex never leaves
/// the machine. Rejections are reported with the explorer's message as-is.
pub async fn broadcast(
    config: &Config,
    out: &Output,
    tx_hex: &str,
    skip_confirm: bool,
) -> Result<()> {
    let tx = decode_transaction(tx_hex)?;
    let txid = tx.compute_txid().to_string();

    if tx.input.iter().any(|input| input.witness.is_empty()) {
        out.note(
            Note::Caution,
            "Transaction has unsigned inputs; the explorer will reject it",
        );
    }

    let client = esplora_client(config)?;

    if !out.is_json() {
        out.section("Broadcast");
        out.field("Txid", &txid);
        out.field("Virtual size", format!("{} vB", tx.vsize()));
        out.field("Network", config.network);
        out.field("Explorer", client.base_url());
        println!();

        if !skip_confirm {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt("Broadcast this transaction?")
                .default(false)
                .interact()
                .unwrap_or(false);

            if !confirmed {
                out.note(Note::Hint, "Broadcast cancelled");
                return Ok(());
            }
        }
    }

    let spinner = out.spinner("Broadcasting...");
    let result = client.broadcast(tx_hex).await;
    spinner.finish_and_clear();
    let broadcast = result.context("Broadcast failed")?;

    if out.document(&broadcast)? {
        return Ok(());
    }

    if broadcast.txid != txid {
        out.note(
            Note::Caution,
            &format!("Explorer returned txid {}, expected {}", broadcast.txid, txid),
        );
    }
    out.note(Note::Done, &format!("Transaction broadcast: {}", broadcast.txid));
    Ok(())
}
