//! Resolution transaction building.
//!
//! Supports:
//! - Spending the single funding output of an escrow address
//! - Caller-specified payouts for both parties with an exact fee
//! - Collaborative spends and timelocked arbitration spends
//! - Size estimation for turning a fee rate into an absolute fee

use crate::scripts::LockingScript;
use crate::signer::compute_sighash;
use crate::types::{Payout, TxInput, TxOutput, UnsignedTransaction};
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::transaction::Version;
use bitcoin::{
    absolute, Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use escrow_types::{EscrowError, Network, Result};
use std::str::FromStr;
use tracing::{info, warn};

/// Dust limit in satoshis (546 sats).
pub const DUST_LIMIT: u64 = 546;

/// One destination per party.
pub const MAX_PAYOUTS: usize = 2;

/// Upper bound of a DER signature plus sighash byte.
const MAX_SIGNATURE_SIZE: u64 = 73;

/// Which branch of the locking script the resolution will satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    /// Both parties sign. Valid for either script.
    Collaborative,
    /// One party plus the arbiter after the relative timelock. Dispute scripts only.
    Arbitrated,
}

impl ResolutionPath {
    /// Input sequence this path requires.
    pub fn sequence(self, script: &LockingScript) -> Result<Sequence> {
        match (self, script.timelock()) {
            (ResolutionPath::Collaborative, _) => Ok(Sequence::ENABLE_RBF_NO_LOCKTIME),
            (ResolutionPath::Arbitrated, Some(blocks)) => Ok(Sequence::from_height(blocks)),
            (ResolutionPath::Arbitrated, None) => Err(EscrowError::InvalidScript(
                "arbitrated resolution requires a dispute script".to_string(),
            )),
        }
    }
}

/// Builder for the unsigned transaction that releases an escrow.
pub struct ResolutionTxBuilder {
    funding_txid: String,
    vout: u32,
    escrow_amount: u64,
    locking_script: LockingScript,
    network: Network,
    payouts: Vec<Payout>,
    fee: u64,
    path: ResolutionPath,
}

impl ResolutionTxBuilder {
    /// Create a builder spending `funding_txid:vout`, which must hold `escrow_amount` sats.
    pub fn new(
        funding_txid: impl Into<String>,
        vout: u32,
        escrow_amount: u64,
        locking_script: LockingScript,
        network: Network,
    ) -> Self {
        Self {
            funding_txid: funding_txid.into(),
            vout,
            escrow_amount,
            locking_script,
            network,
            payouts: Vec::new(),
            fee: 0,
            path: ResolutionPath::Collaborative,
        }
    }

    pub fn add_payout(mut self, payout: Payout) -> Self {
        self.payouts.push(payout);
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn path(mut self, path: ResolutionPath) -> Self {
        self.path = path;
        self
    }

    pub fn build(self) -> Result<UnsignedTransaction> {
        build_resolution_tx(
            &self.funding_txid,
            self.vout,
            self.escrow_amount,
            self.fee,
            &self.payouts,
            &self.locking_script,
            self.path,
            self.network,
        )
    }
}

/// Build the unsigned resolution transaction.
///
/// The payouts plus `fee` must add up to `escrow_amount` exactly. Zero
/// payouts are left out, so the result has one or two outputs.
#[allow(clippy::too_many_arguments)]
pub fn build_resolution_tx(
    funding_txid: &str,
    vout: u32,
    escrow_amount: u64,
    fee: u64,
    payouts: &[Payout],
    locking_script: &LockingScript,
    path: ResolutionPath,
    network: Network,
) -> Result<UnsignedTransaction> {
    if vout != 0 {
        return Err(EscrowError::InvalidOutpoint(format!(
            "escrow funding output must be vout 0, got {}",
            vout
        )));
    }
    let txid = Txid::from_str(funding_txid).map_err(|e| EscrowError::InvalidTxid(e.to_string()))?;

    if payouts.is_empty() || payouts.len() > MAX_PAYOUTS {
        return Err(EscrowError::InvalidPayoutCount {
            count: payouts.len(),
        });
    }

    if fee >= escrow_amount {
        return Err(EscrowError::AmountUnderflow {
            amount: escrow_amount,
            fee,
        });
    }

    let total_payout = payouts
        .iter()
        .try_fold(0u64, |acc, p| acc.checked_add(p.amount))
        .ok_or(EscrowError::AmountMismatch {
            input: escrow_amount,
            outputs: u64::MAX,
            fee,
        })?;
    if total_payout.checked_add(fee) != Some(escrow_amount) {
        return Err(EscrowError::AmountMismatch {
            input: escrow_amount,
            outputs: total_payout,
            fee,
        });
    }

    let sequence = path.sequence(locking_script)?;
    let witness_script = locking_script.to_script();

    // Build transaction outputs
    let mut tx_outputs = Vec::new();
    let mut output_data = Vec::new();

    for payout in payouts.iter().filter(|p| p.amount > 0) {
        let script_pubkey = payout_script(&payout.address, network)?;

        if payout.amount < DUST_LIMIT {
            warn!(
                address = %payout.address,
                amount = payout.amount,
                "Payout is below the dust limit and may not relay"
            );
        }

        tx_outputs.push(TxOut {
            value: Amount::from_sat(payout.amount),
            script_pubkey,
        });
        output_data.push(TxOutput {
            address: payout.address.clone(),
            value: payout.amount,
        });
    }

    let unsigned_tx = Transaction {
        version: Version::TWO,
        lock_time: absolute::LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint { txid, vout },
            script_sig: ScriptBuf::new(), // Empty for SegWit
            sequence,
            witness: Witness::default(), // Filled by the combiner
        }],
        output: tx_outputs,
    };

    let sighash = compute_sighash(&unsigned_tx, 0, &witness_script, escrow_amount)?;

    info!(
        txid = %unsigned_tx.compute_txid(),
        outputs = output_data.len(),
        fee,
        ?path,
        "Built unsigned resolution transaction"
    );

    Ok(UnsignedTransaction {
        txid: unsigned_tx.compute_txid().to_string(),
        inputs: vec![TxInput {
            txid: funding_txid.to_string(),
            vout,
            value: escrow_amount,
            witness_script: hex::encode(witness_script.as_bytes()),
            sequence: sequence.to_consensus_u32(),
        }],
        outputs: output_data,
        escrow_amount_sats: escrow_amount,
        fee_sats: fee,
        unsigned_tx_hex: serialize_hex(&unsigned_tx),
        sighash: hex::encode(sighash),
    })
}

/// Virtual size of the fully witnessed resolution transaction.
///
/// Assumes maximum-length signatures, so the estimate never undershoots.
pub fn estimate_resolution_vsize(
    locking_script: &LockingScript,
    path: ResolutionPath,
    payout_addresses: &[&str],
    network: Network,
) -> Result<u64> {
    path.sequence(locking_script)?;

    let mut base: u64 = 4 // version
        + 1 // input count
        + 32 + 4 + 1 + 4 // outpoint, empty scriptSig, sequence
        + compact_size_len(payout_addresses.len() as u64)
        + 4; // locktime
    for address in payout_addresses {
        let script_len = payout_script(address, network)?.len() as u64;
        base += 8 + compact_size_len(script_len) + script_len;
    }

    let script_len = locking_script.to_script().len() as u64;
    let selector: u64 = match (locking_script.is_dispute(), path) {
        (false, _) => 0,
        (true, ResolutionPath::Collaborative) => 2,
        (true, ResolutionPath::Arbitrated) => 1,
    };
    let witness = 2 // marker and flag
        + 1 // item count
        + 1 // empty CHECKMULTISIG dummy
        + 2 * (1 + MAX_SIGNATURE_SIZE)
        + selector
        + compact_size_len(script_len)
        + script_len;

    Ok((base * 4 + witness).div_ceil(4))
}

/// Absolute fee for `fee_rate` sat/vB.
pub fn fee_for_rate(
    fee_rate: u64,
    locking_script: &LockingScript,
    path: ResolutionPath,
    payout_addresses: &[&str],
    network: Network,
) -> Result<u64> {
    let vsize = estimate_resolution_vsize(locking_script, path, payout_addresses, network)?;
    Ok(fee_rate.saturating_mul(vsize))
}

pub(crate) fn payout_script(address: &str, network: Network) -> Result<ScriptBuf> {
    let address = Address::from_str(address)
        .map_err(|e| EscrowError::InvalidAddress(format!("{}: {}", address, e)))?
        .require_network(network.bitcoin_network())
        .map_err(|e| EscrowError::InvalidAddress(e.to_string()))?;
    Ok(address.script_pubkey())
}

fn compact_size_len(n: u64) -> u64 {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}
