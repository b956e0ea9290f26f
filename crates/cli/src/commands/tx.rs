//! Resolution transaction builder command.

use anyhow::{Context, Result};
use escrow_engine::{
    fee_for_rate, LockingScript, Payout, ResolutionPath, ResolutionTxBuilder, DUST_LIMIT,
};
use serde::Serialize;

use crate::commands::{resolve_fee, resolve_funding, FeeChoice};
use crate::config::Config;
use crate::output::{Note, Output};

/// Everything needed to build one resolution.
///
/// Missing funding txid or amount are looked up from the escrow address.
pub struct TxRequest {
    pub script: LockingScript,
    pub funding_txid: Option<String>,
    pub amount: Option<u64>,
    pub dest_a: String,
    pub amount_a: u64,
    pub dest_b: String,
    pub fee: FeeChoice,
    pub arbitrated: bool,
}

#[derive(Serialize)]
struct TxOutputDocument<'a> {
    path: ResolutionPath,
    fee_rate: Option<u64>,
    locking_script: String,
    #[serde(flatten)]
    transaction: &'a escrow_engine::UnsignedTransaction,
}

/// Build the unsigned resolution and print it for the signers.
pub async fn build_transaction(config: &Config, out: &Output, request: TxRequest) -> Result<()> {
    let network = config.network;
    let path = if request.arbitrated {
        ResolutionPath::Arbitrated
    } else {
        ResolutionPath::Collaborative
    };

    let escrow_address = request.script.address(network).address.to_string();
    let (funding_txid, amount) = resolve_funding(
        config,
        out,
        &escrow_address,
        request.funding_txid,
        request.amount,
    )
    .await?;

    let destinations = [request.dest_a.as_str(), request.dest_b.as_str()];
    let (fee, fee_rate) = resolve_fee(config, out, request.fee, |rate| {
        fee_for_rate(rate, &request.script, path, &destinations, network)
    })
    .await?;

    let amount_b = remainder_for_b(amount, request.amount_a, fee)?;
    if amount_b > 0 && amount_b < DUST_LIMIT {
        out.note(
            Note::Caution,
            &format!(
                "Party B payout of {} sats is below the dust limit and may not relay",
                amount_b
            ),
        );
    }

    let unsigned =
        ResolutionTxBuilder::new(funding_txid, 0, amount, request.script.clone(), network)
            .add_payout(Payout::new(request.dest_a.as_str(), request.amount_a))
            .add_payout(Payout::new(request.dest_b.as_str(), amount_b))
            .fee(fee)
            .path(path)
            .build()?;

    let document = TxOutputDocument {
        path,
        fee_rate,
        locking_script: request.script.to_hex(),
        transaction: &unsigned,
    };
    if out.document(&document)? {
        return Ok(());
    }

    out.section("Unsigned resolution");
    out.field("Txid", &unsigned.txid);
    out.field("Network", network);
    out.field("Escrow", &escrow_address);
    out.amount("Escrow amount", unsigned.escrow_amount_sats);
    for output in &unsigned.outputs {
        out.amount("Payout", output.value);
        out.field("  to", &output.address);
    }
    out.amount("Fee", fee);
    if let Some(rate) = fee_rate {
        out.field("Fee rate", format!("{} sat/vB", rate));
    }
    out.field("Sighash", &unsigned.sighash);
    out.hex("Unsigned transaction", &unsigned.unsigned_tx_hex);
    out.hex("Locking script", &document.locking_script);

    println!();
    if let (ResolutionPath::Arbitrated, Some(blocks)) = (path, request.script.timelock()) {
        out.note(
            Note::Hint,
            &format!(
                "Arbitration spend: valid {} blocks after the funding transaction confirms",
                blocks
            ),
        );
    }
    out.note(
        Note::Hint,
        "Each signer runs `satoshi-escrow sign` with this transaction and script",
    );
    Ok(())
}

/// Party B receives whatever party A's payout and the fee leave.
fn remainder_for_b(amount: u64, amount_a: u64, fee: u64) -> Result<u64> {
    amount
        .checked_sub(fee)
        .and_then(|after_fee| after_fee.checked_sub(amount_a))
        .with_context(|| {
            format!(
                "Party A payout ({} sats) plus fee ({} sats) exceeds the escrow amount ({} sats)",
                amount_a, fee, amount
            )
        })
}
