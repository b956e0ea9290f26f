//! End-to-end escrow tests.
//!
//! Covers address derivation, unsigned transaction building, independent
//! signing by each party, and combination for all three spending branches.

mod common;

use bitcoin::{Amount, Sequence, Transaction, TxOut};
use common::*;
use escrow_engine::api;
use escrow_engine::*;

fn party_a() -> PublicKey {
    decode_public_key(PARTY_A_NPUB).unwrap()
}

fn party_b() -> PublicKey {
    PublicKey::from_hex(PARTY_B_PUBKEY).unwrap()
}

fn arbiter() -> PublicKey {
    PublicKey::from_hex(ARBITER_PUBKEY).unwrap()
}

fn arbiter_npub() -> String {
    encode_public_key(&arbiter()).unwrap()
}

fn sorted(mut keys: Vec<PublicKey>) -> Vec<PublicKey> {
    keys.sort();
    keys
}

fn escrow_script_pubkey(script: &LockingScript) -> bitcoin::ScriptBuf {
    script.address(NETWORK).address.script_pubkey()
}

fn funding_output(script: &LockingScript) -> TxOut {
    TxOut {
        value: Amount::from_sat(ESCROW_AMOUNT),
        script_pubkey: escrow_script_pubkey(script),
    }
}

fn sign(ctx: &EscrowContext, tx_hex: &str, key: &str, script_hex: &str) -> String {
    api::sign(ctx, tx_hex, 0, key, ESCROW_AMOUNT, script_hex, NETWORK).unwrap()
}

fn collab_tx(dest_a: &Payout, dest_b: &Payout) -> String {
    api::build_collab_tx(
        PARTY_A_NPUB,
        PARTY_B_PUBKEY,
        ESCROW_AMOUNT,
        dest_a,
        dest_b,
        FUNDING_TXID,
        FEE,
        NETWORK,
    )
    .unwrap()
}

#[test]
fn test_collaborative_round_trip() {
    let ctx = EscrowContext::new();
    let (dest_a, dest_b) = sample_payouts();

    let address = api::build_collab_address(PARTY_A_NPUB, PARTY_B_PUBKEY, NETWORK).unwrap();
    let swapped = api::build_collab_address(PARTY_B_PUBKEY, PARTY_A_NPUB, NETWORK).unwrap();
    assert_eq!(address, swapped);

    let tx_hex = collab_tx(&dest_a, &dest_b);
    let script_hex = api::build_collab_script(PARTY_A_NPUB, PARTY_B_PUBKEY).unwrap();

    let sig_a = sign(&ctx, &tx_hex, PARTY_A_NSEC, &script_hex);
    let sig_b = sign(&ctx, &tx_hex, PARTY_B_SECRET, &script_hex);

    // Supplied in B, A order; the combiner reorders to match the script.
    let signed_hex = api::combine_collab(
        &ctx,
        &tx_hex,
        0,
        &[sig_b.as_str(), sig_a.as_str()],
        &[PARTY_B_PUBKEY, PARTY_A_NPUB],
        &script_hex,
        ESCROW_AMOUNT,
    )
    .unwrap();

    let signed = decode_transaction(&signed_hex).unwrap();
    let script = LockingScript::from_hex(&script_hex).unwrap();
    assert_eq!(script.address(NETWORK).address.to_string(), address);
    assert_eq!(signed.input[0].witness.len(), 4);
    assert_witness_satisfies(
        &signed,
        0,
        &escrow_script_pubkey(&script),
        ESCROW_AMOUNT,
        &sorted(vec![party_a(), party_b()]),
    );
    assert_consensus_valid(&signed, &funding_output(&script));
}

#[test]
fn test_one_satoshi_change_breaks_signatures() {
    let ctx = EscrowContext::new();
    let (dest_a, dest_b) = sample_payouts();
    let script_hex = api::build_collab_script(PARTY_A_NPUB, PARTY_B_PUBKEY).unwrap();

    let tx_hex = collab_tx(&dest_a, &dest_b);
    let sig_a = sign(&ctx, &tx_hex, PARTY_A_NSEC, &script_hex);
    let sig_b = sign(&ctx, &tx_hex, PARTY_B_SECRET, &script_hex);

    let altered_a = Payout::new(dest_a.address.clone(), dest_a.amount + 1);
    let altered_hex = api::build_collab_tx(
        PARTY_A_NPUB,
        PARTY_B_PUBKEY,
        ESCROW_AMOUNT,
        &altered_a,
        &dest_b,
        FUNDING_TXID,
        FEE - 1,
        NETWORK,
    )
    .unwrap();

    let err = api::combine_collab(
        &ctx,
        &altered_hex,
        0,
        &[sig_a.as_str(), sig_b.as_str()],
        &[PARTY_A_NPUB, PARTY_B_PUBKEY],
        &script_hex,
        ESCROW_AMOUNT,
    )
    .unwrap_err();
    assert!(matches!(err, EscrowError::SignatureMismatch(_)), "{:?}", err);
}

#[test]
fn test_dispute_collaborative_branch() {
    let ctx = EscrowContext::new();
    let (dest_a, dest_b) = sample_payouts();
    let arbiter_npub = arbiter_npub();

    let tx_hex = api::build_dispute_tx(
        PARTY_A_NPUB,
        PARTY_B_PUBKEY,
        &arbiter_npub,
        ESCROW_AMOUNT,
        &dest_a,
        &dest_b,
        FUNDING_TXID,
        FEE,
        TIMELOCK,
        NETWORK,
    )
    .unwrap();
    let script_hex =
        api::build_dispute_script(PARTY_A_NPUB, PARTY_B_PUBKEY, &arbiter_npub, TIMELOCK).unwrap();

    let sig_a = sign(&ctx, &tx_hex, PARTY_A_NSEC, &script_hex);
    let sig_b = sign(&ctx, &tx_hex, PARTY_B_SECRET, &script_hex);

    let signed_hex = api::combine_dispute_collab(
        &ctx,
        &tx_hex,
        0,
        &[sig_a.as_str(), sig_b.as_str()],
        &[PARTY_A_NPUB, PARTY_B_PUBKEY],
        &script_hex,
        ESCROW_AMOUNT,
    )
    .unwrap();

    let signed = decode_transaction(&signed_hex).unwrap();
    let witness = &signed.input[0].witness;
    assert_eq!(witness.len(), 5);
    assert_eq!(witness.nth(3).unwrap(), &[0x01]);

    let script = LockingScript::from_hex(&script_hex).unwrap();
    assert_witness_satisfies(
        &signed,
        0,
        &escrow_script_pubkey(&script),
        ESCROW_AMOUNT,
        &sorted(vec![party_a(), party_b()]),
    );
    assert_consensus_valid(&signed, &funding_output(&script));
}

#[test]
fn test_dispute_arbitrated_branch() {
    let ctx = EscrowContext::new();
    let arbiter_npub = arbiter_npub();
    let award = Payout::new(DEST_B, ESCROW_AMOUNT - FEE);
    let nothing = Payout::new(DEST_A, 0);

    let tx_hex = api::build_dispute_arbitration_tx(
        PARTY_A_NPUB,
        PARTY_B_PUBKEY,
        &arbiter_npub,
        ESCROW_AMOUNT,
        &nothing,
        &award,
        FUNDING_TXID,
        FEE,
        TIMELOCK,
        NETWORK,
    )
    .unwrap();
    let script_hex =
        api::build_dispute_script(PARTY_A_NPUB, PARTY_B_PUBKEY, &arbiter_npub, TIMELOCK).unwrap();

    let unsigned: Transaction = decode_transaction(&tx_hex).unwrap();
    assert_eq!(unsigned.output.len(), 1);
    assert_eq!(unsigned.input[0].sequence, Sequence::from_height(TIMELOCK as u16));

    let sig_b = sign(&ctx, &tx_hex, PARTY_B_SECRET, &script_hex);
    let sig_arbiter = sign(&ctx, &tx_hex, ARBITER_NSEC, &script_hex);

    let signed_hex = api::combine_dispute_arbitrated(
        &ctx,
        &tx_hex,
        0,
        &[sig_arbiter.as_str(), sig_b.as_str()],
        &[arbiter_npub.as_str(), PARTY_B_PUBKEY],
        &script_hex,
        ESCROW_AMOUNT,
    )
    .unwrap();

    let signed = decode_transaction(&signed_hex).unwrap();
    let witness = &signed.input[0].witness;
    assert_eq!(witness.len(), 5);
    assert!(witness.nth(3).unwrap().is_empty(), "ELSE branch selector");
    assert_eq!(signed.input[0].sequence, Sequence::from_height(TIMELOCK as u16));

    let script = LockingScript::from_hex(&script_hex).unwrap();
    assert_witness_satisfies(
        &signed,
        0,
        &escrow_script_pubkey(&script),
        ESCROW_AMOUNT,
        &sorted(vec![party_b(), arbiter()]),
    );
    assert_consensus_valid(&signed, &funding_output(&script));
}

#[test]
fn test_arbitrated_rejects_signatures_without_timelock() {
    let ctx = EscrowContext::new();
    let arbiter_npub = arbiter_npub();
    let (dest_a, dest_b) = sample_payouts();

    // Signed over the collaborative-path sequence instead of the relative lock.
    let tx_hex = api::build_dispute_tx(
        PARTY_A_NPUB,
        PARTY_B_PUBKEY,
        &arbiter_npub,
        ESCROW_AMOUNT,
        &dest_a,
        &dest_b,
        FUNDING_TXID,
        FEE,
        TIMELOCK,
        NETWORK,
    )
    .unwrap();
    let script_hex =
        api::build_dispute_script(PARTY_A_NPUB, PARTY_B_PUBKEY, &arbiter_npub, TIMELOCK).unwrap();

    let sig_a = sign(&ctx, &tx_hex, PARTY_A_NSEC, &script_hex);
    let sig_arbiter = sign(&ctx, &tx_hex, ARBITER_NSEC, &script_hex);

    let err = api::combine_dispute_arbitrated(
        &ctx,
        &tx_hex,
        0,
        &[sig_a.as_str(), sig_arbiter.as_str()],
        &[PARTY_A_NPUB, arbiter_npub.as_str()],
        &script_hex,
        ESCROW_AMOUNT,
    )
    .unwrap_err();
    assert!(matches!(err, EscrowError::SignatureMismatch(_)), "{:?}", err);
}

#[test]
fn test_fee_conservation() {
    let script = LockingScript::collaborative(&[party_a(), party_b()]).unwrap();

    let cases = [
        (1_000u64, 1u64),
        (10_000, 9_999),
        (250_000, 2_000),
        (21_000_000, 15_000),
    ];
    for (amount, fee) in cases {
        let net = amount - fee;
        let payouts = [Payout::new(DEST_A, net / 3), Payout::new(DEST_B, net - net / 3)];
        let unsigned = build_resolution_tx(
            FUNDING_TXID,
            0,
            amount,
            fee,
            &payouts,
            &script,
            ResolutionPath::Collaborative,
            NETWORK,
        )
        .unwrap();

        let tx = unsigned.transaction().unwrap();
        let total: u64 = tx.output.iter().map(|o| o.value.to_sat()).sum();
        assert_eq!(total + fee, amount);
    }
}

#[test]
fn test_sign_rejects_out_of_range_input() {
    let ctx = EscrowContext::new();
    let (dest_a, dest_b) = sample_payouts();
    let tx_hex = collab_tx(&dest_a, &dest_b);
    let script_hex = api::build_collab_script(PARTY_A_NPUB, PARTY_B_PUBKEY).unwrap();

    let err = api::sign(&ctx, &tx_hex, 3, PARTY_A_NSEC, ESCROW_AMOUNT, &script_hex, NETWORK)
        .unwrap_err();
    assert_eq!(err, EscrowError::InvalidInputIndex { index: 3, inputs: 1 });
}

#[test]
fn test_timelock_conversion_feeds_dispute_script() {
    let blocks = api::days_hours_to_blocks(2, 6, Network::Mutinynet);
    assert_eq!(blocks, 6_480);

    let address = api::build_dispute_address(
        PARTY_A_NPUB,
        PARTY_B_PUBKEY,
        &arbiter_npub(),
        blocks,
        Network::Mutinynet,
    )
    .unwrap();
    assert!(address.starts_with("tb1q"));

    let too_long = api::days_to_blocks(3, Network::Mutinynet) * 10;
    assert!(matches!(
        api::build_dispute_address(
            PARTY_A_NPUB,
            PARTY_B_PUBKEY,
            &arbiter_npub(),
            too_long,
            Network::Mutinynet
        ),
        Err(EscrowError::TimelockOutOfRange { .. })
    ));
}

#[test]
fn test_dispute_address_ignores_participant_order() {
    let arbiter_npub = arbiter_npub();

    let forward =
        api::build_dispute_address(PARTY_A_NPUB, PARTY_B_PUBKEY, &arbiter_npub, TIMELOCK, NETWORK)
            .unwrap();
    let swapped =
        api::build_dispute_address(PARTY_B_PUBKEY, PARTY_A_NPUB, &arbiter_npub, TIMELOCK, NETWORK)
            .unwrap();
    assert_eq!(forward, swapped);

    let forward_script =
        api::build_dispute_script(PARTY_A_NPUB, PARTY_B_PUBKEY, &arbiter_npub, TIMELOCK).unwrap();
    let swapped_script =
        api::build_dispute_script(PARTY_B_PUBKEY, PARTY_A_NPUB, &arbiter_npub, TIMELOCK).unwrap();
    assert_eq!(forward_script, swapped_script);
}

#[test]
fn test_raw_hex_arbiter_key_signs_npub_script() {
    let ctx = EscrowContext::new();
    let arbiter_npub = arbiter_npub();
    let award = Payout::new(DEST_A, ESCROW_AMOUNT - FEE);
    let nothing = Payout::new(DEST_B, 0);

    let tx_hex = api::build_dispute_arbitration_tx(
        PARTY_A_NPUB,
        PARTY_B_PUBKEY,
        &arbiter_npub,
        ESCROW_AMOUNT,
        &award,
        &nothing,
        FUNDING_TXID,
        FEE,
        TIMELOCK,
        NETWORK,
    )
    .unwrap();
    let script_hex =
        api::build_dispute_script(PARTY_A_NPUB, PARTY_B_PUBKEY, &arbiter_npub, TIMELOCK).unwrap();

    // The hex scalar's point has an odd y; the script holds the npub's even-y key.
    let sig_arbiter = sign(&ctx, &tx_hex, ARBITER_SECRET_HEX, &script_hex);
    assert_eq!(sig_arbiter, sign(&ctx, &tx_hex, ARBITER_NSEC, &script_hex));
    let sig_a = sign(&ctx, &tx_hex, PARTY_A_NSEC, &script_hex);

    let signed_hex = api::combine_dispute_arbitrated(
        &ctx,
        &tx_hex,
        0,
        &[sig_a.as_str(), sig_arbiter.as_str()],
        &[PARTY_A_NPUB, arbiter_npub.as_str()],
        &script_hex,
        ESCROW_AMOUNT,
    )
    .unwrap();

    let signed = decode_transaction(&signed_hex).unwrap();
    let script = LockingScript::from_hex(&script_hex).unwrap();
    assert_consensus_valid(&signed, &funding_output(&script));
}
