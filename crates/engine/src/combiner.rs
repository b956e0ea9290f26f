//! Signature combination.
//!
//! Witness layouts (the leading empty item is the CHECKMULTISIG dummy):
//! - Collaborative 2-of-2: `[<>, sig, sig, script]`
//! - Dispute, collaborative branch: `[<>, sig, sig, <01>, script]`
//! - Dispute, arbitrated branch: `[<>, sig, sig, <>, script]`
//!
//! Signatures are placed in script key order regardless of the order they
//! were supplied in. Every signature is verified against the recomputed
//! sighash before any witness is written.

use crate::context::EscrowContext;
use crate::keys::PublicKey;
use crate::scripts::LockingScript;
use crate::signer::{compute_sighash, verify_partial, PartialSignature};
use crate::tx_builder::ResolutionPath;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::transaction::Version;
use bitcoin::{Transaction, Witness};
use escrow_types::{EscrowError, Result};
use tracing::{debug, info, trace};

/// Spending branch a set of signatures is meant to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendingBranch {
    /// Both keys of a collaborative script.
    Collaborative,
    /// IF branch of a dispute script: both participants.
    DisputeCollaborative,
    /// ELSE branch of a dispute script: arbiter plus one participant, after the timelock.
    DisputeArbitrated,
}

impl SpendingBranch {
    /// Resolution path the unsigned transaction must have been built with.
    pub fn path(self) -> ResolutionPath {
        match self {
            SpendingBranch::Collaborative | SpendingBranch::DisputeCollaborative => {
                ResolutionPath::Collaborative
            }
            SpendingBranch::DisputeArbitrated => ResolutionPath::Arbitrated,
        }
    }

    fn allowed_signers(self, script: &LockingScript) -> Result<Vec<PublicKey>> {
        match (self, script) {
            (SpendingBranch::Collaborative, LockingScript::Collaborative { keys }) => {
                Ok(keys.to_vec())
            }
            (SpendingBranch::DisputeCollaborative, LockingScript::Dispute { participants, .. }) => {
                Ok(participants.to_vec())
            }
            (SpendingBranch::DisputeArbitrated, LockingScript::Dispute { .. }) => {
                Ok(script.all_keys())
            }
            (branch, _) => Err(EscrowError::InvalidScript(format!(
                "{:?} spend does not match a {} script",
                branch,
                if script.is_dispute() { "dispute" } else { "collaborative" }
            ))),
        }
    }
}

/// Verify two partial signatures and return the witnessed transaction.
///
/// For the arbitrated branch the input sequence is set to the script's
/// relative timelock before verification, so signatures over any other
/// sequence are rejected. The input transaction is left untouched.
pub fn combine_signatures(
    ctx: &EscrowContext,
    tx: &Transaction,
    input_index: usize,
    signatures: &[PartialSignature],
    locking_script: &LockingScript,
    amount: u64,
    branch: SpendingBranch,
) -> Result<Transaction> {
    if input_index >= tx.input.len() {
        return Err(EscrowError::InvalidInputIndex {
            index: input_index,
            inputs: tx.input.len(),
        });
    }

    let allowed = branch.allowed_signers(locking_script)?;
    if signatures.len() != 2 {
        return Err(EscrowError::SignatureCountMismatch {
            expected: 2,
            actual: signatures.len(),
        });
    }

    for sig in signatures {
        if !allowed.contains(&sig.pubkey) {
            return Err(EscrowError::SignatureMismatch(format!(
                "{} is not a signer for the {:?} branch",
                sig.pubkey, branch
            )));
        }
    }
    if signatures[0].pubkey == signatures[1].pubkey {
        return Err(EscrowError::SignatureMismatch(format!(
            "duplicate signature from {}",
            signatures[0].pubkey
        )));
    }
    if let (SpendingBranch::DisputeArbitrated, Some(arbiter)) = (branch, locking_script.arbiter()) {
        if !signatures.iter().any(|sig| sig.pubkey == arbiter) {
            return Err(EscrowError::SignatureMismatch(
                "arbitrated spend requires the arbiter's signature".to_string(),
            ));
        }
    }

    let mut signed = tx.clone();
    if branch == SpendingBranch::DisputeArbitrated {
        if signed.version < Version::TWO {
            return Err(EscrowError::InvalidTransaction(
                "relative timelocks require transaction version 2".to_string(),
            ));
        }
        signed.input[input_index].sequence = branch.path().sequence(locking_script)?;
    }

    let witness_script = locking_script.to_script();
    let sighash = compute_sighash(&signed, input_index, &witness_script, amount)?;
    for sig in signatures {
        verify_partial(ctx, sighash, sig)?;
    }

    let mut ordered: Vec<&PartialSignature> = signatures.iter().collect();
    ordered.sort_by(|a, b| a.pubkey.cmp(&b.pubkey));

    let mut witness = Witness::new();
    witness.push(Vec::<u8>::new());
    for sig in &ordered {
        witness.push(sig.to_bytes());
    }
    match branch {
        SpendingBranch::Collaborative => {}
        SpendingBranch::DisputeCollaborative => witness.push([0x01u8]),
        SpendingBranch::DisputeArbitrated => witness.push(Vec::<u8>::new()),
    }
    witness.push(witness_script.as_bytes());

    debug!(items = witness.len(), ?branch, "Assembled witness stack");
    signed.input[input_index].witness = witness;

    info!(
        txid = %signed.compute_txid(),
        vsize = signed.vsize(),
        ?branch,
        "Combined escrow signatures"
    );
    trace!(tx_hex = %serialize_hex(&signed), "Signed transaction");

    Ok(signed)
}
