//! Escrow address and script commands.

use anyhow::Result;
use escrow_engine::api::parse_role_key;
use escrow_engine::{encode_public_key, LockingScript, PublicKey};
use escrow_types::{EscrowRole, Network};
use serde::Serialize;

use crate::output::{Note, Output};

#[derive(Serialize)]
struct EscrowDescription {
    kind: &'static str,
    network: Option<Network>,
    address: Option<String>,
    witness_program: Option<String>,
    script_hex: String,
    script_asm: String,
    keys: Vec<String>,
    arbiter: Option<String>,
    timelock_blocks: Option<u16>,
}

/// 2-of-2 script from the two party keys, in any order.
pub fn collaborative_script(key_a: &str, key_b: &str) -> Result<LockingScript> {
    let keys = [
        parse_role_key(key_a, EscrowRole::PartyA)?,
        parse_role_key(key_b, EscrowRole::PartyB)?,
    ];
    Ok(LockingScript::collaborative(&keys)?)
}

/// Dispute script from the party keys, the arbiter and a timelock in blocks.
pub fn dispute_script(
    key_a: &str,
    key_b: &str,
    arbiter: &str,
    timelock_blocks: u64,
) -> Result<LockingScript> {
    let participants = [
        parse_role_key(key_a, EscrowRole::PartyA)?,
        parse_role_key(key_b, EscrowRole::PartyB)?,
    ];
    let arbiter = parse_role_key(arbiter, EscrowRole::Arbiter)?;
    Ok(LockingScript::dispute(&participants, arbiter, timelock_blocks)?)
}

fn describe(script: &LockingScript) -> EscrowDescription {
    let witness_script = script.to_script();
    EscrowDescription {
        kind: if script.is_dispute() { "dispute" } else { "collaborative" },
        network: None,
        address: None,
        witness_program: None,
        script_hex: script.to_hex(),
        script_asm: witness_script.to_asm_string(),
        keys: script.participants().iter().map(|key| key.to_hex()).collect(),
        arbiter: script.arbiter().map(|key| key.to_hex()),
        timelock_blocks: script.timelock(),
    }
}

/// Print the escrow address with the script it commits to.
pub fn show_address(out: &Output, script: &LockingScript, network: Network) -> Result<()> {
    let escrow = script.address(network);
    let mut description = describe(script);
    description.network = Some(network);
    description.address = Some(escrow.address.to_string());
    description.witness_program = Some(hex::encode(escrow.witness_program));

    if out.document(&description)? {
        return Ok(());
    }

    out.section(&format!("Escrow address ({})", description.kind));
    out.field("Network", network);
    out.field("Address", &escrow.address);
    print_terms(out, script);
    out.hex("Locking script", &description.script_hex);

    println!();
    out.note(Note::Done, &format!("Fund {} in a single output", escrow.address));
    out.note(Note::Hint, "Both parties keep the locking script; spending needs it");
    Ok(())
}

/// Print the locking script in hex and assembly.
pub fn show_script(out: &Output, script: &LockingScript) -> Result<()> {
    let description = describe(script);

    if out.document(&description)? {
        return Ok(());
    }

    out.section(&format!("Locking script ({})", description.kind));
    print_terms(out, script);
    out.hex("Hex", &description.script_hex);
    out.hex("Asm", &description.script_asm);
    Ok(())
}

/// Keys as `npub`s, then arbiter and timelock for dispute scripts.
fn print_terms(out: &Output, script: &LockingScript) {
    let as_npub = |key: &PublicKey| encode_public_key(key).unwrap_or_else(|_| key.to_hex());

    for (i, key) in script.participants().iter().enumerate() {
        out.field(&format!("Party key {}", i + 1), as_npub(key));
    }
    if let Some(arbiter) = script.arbiter() {
        out.field("Arbiter", as_npub(&arbiter));
    }
    if let Some(blocks) = script.timelock() {
        out.field("Timelock", format!("{} blocks", blocks));
    }
}
