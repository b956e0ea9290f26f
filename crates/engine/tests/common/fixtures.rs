//! Test data fixtures for integration tests.

use escrow_engine::{Network, Payout};

/// Party A identity keys.
pub const PARTY_A_NSEC: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5";
pub const PARTY_A_NPUB: &str = "npub10elfcs4fr0l0r8af98jlmgdh9c8tcxjvz9qkw038js35mp4dma8qzvjptg";

/// Party B raw keys.
pub const PARTY_B_SECRET: &str = "30e8a8ea9f4402731d43ebc0aa34bb2812d5f255324e1fc6773a87f40af50aa4";
pub const PARTY_B_PUBKEY: &str =
    "021e0081633de90cc312d507416a6f1f056980cfb131b3ae64a0c953017f0f494f";

/// Arbiter identity key whose raw scalar has an odd-y point.
pub const ARBITER_NSEC: &str = "nsec103m6x7a369k95rhtdn5w5mxsdpgyqprnysdtvhe6m0ef5xuz9d6s6emzda";
pub const ARBITER_PUBKEY: &str =
    "022d7b3d8028c474251676708ec41f12100685b200ccbb394e5e782d73b233a8eb";
/// The arbiter's scalar exactly as the `nsec` encodes it, before any
/// y-parity normalization.
pub const ARBITER_SECRET_HEX: &str =
    "7c77a37bb1d16c5a0eeb6ce8ea6cd06850400473241ab65f3adbf29a1b822b75";

pub const FUNDING_TXID: &str = "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16";
pub const ESCROW_AMOUNT: u64 = 250_000;
pub const FEE: u64 = 2_000;
pub const TIMELOCK: u64 = 144;
pub const NETWORK: Network = Network::Testnet4;

pub const DEST_A: &str = "tb1q256vxujwapp655r3cdk30aq3unxacln2hmq2qtfyyd92ntu6yeasfknjse";
pub const DEST_B: &str = "tb1q2g57akwgzmhmrrfseafr3nre4fs0l0a7hsf7nsj3wqeltcqehycskvfxtr";

/// A 60/40 split of the escrow after fees.
pub fn sample_payouts() -> (Payout, Payout) {
    let net = ESCROW_AMOUNT - FEE;
    let a = net * 60 / 100;
    (Payout::new(DEST_A, a), Payout::new(DEST_B, net - a))
}
