//! Key codec.
//!
//! Converts between the bech32 social-identity encodings (`npub` / `nsec`)
//! and raw secp256k1 key material. Public keys can also be given as 33-byte
//! compressed hex; private keys as 32-byte hex or network-tagged WIF.

use crate::context::EscrowContext;
use bech32::{Bech32, Hrp};
use bitcoin::secp256k1::{self, Parity, SecretKey, XOnlyPublicKey};
use bitcoin::{Address, CompressedPublicKey};
use escrow_types::{EscrowError, Network, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const NPUB_HRP: Hrp = Hrp::parse_unchecked("npub");
const NSEC_HRP: Hrp = Hrp::parse_unchecked("nsec");

/// Compressed secp256k1 public key.
///
/// Ordered lexicographically by its 33-byte serialization, which is the
/// canonical key order inside escrow scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(CompressedPublicKey);

impl PublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 33 {
            return Err(EscrowError::InvalidKeyEncoding(format!(
                "expected 33-byte compressed public key, got {} bytes",
                bytes.len()
            )));
        }
        CompressedPublicKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| EscrowError::InvalidKeyEncoding(e.to_string()))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| EscrowError::InvalidKeyEncoding(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; 33] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The 32-byte x coordinate.
    pub fn x_only(&self) -> XOnlyPublicKey {
        self.0 .0.x_only_public_key().0
    }

    pub fn inner(&self) -> &secp256k1::PublicKey {
        &self.0 .0
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(key: secp256k1::PublicKey) -> Self {
        Self(CompressedPublicKey(key))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        parse_public_key(s)
    }
}

/// Secret scalar supplied for a single signing call.
///
/// Never printed; `Debug` is redacted.
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    pub fn from_secret_key(secret: SecretKey) -> Self {
        Self { secret }
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| EscrowError::InvalidKeyEncoding(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(EscrowError::InvalidKeyEncoding(format!(
                "expected 32-byte private key, got {} bytes",
                bytes.len()
            )));
        }
        SecretKey::from_slice(&bytes)
            .map(Self::from_secret_key)
            .map_err(|e| EscrowError::InvalidKeyEncoding(e.to_string()))
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Scalar for the same x coordinate with the opposite y parity.
    pub(crate) fn negate(self) -> Self {
        Self {
            secret: self.secret.negate(),
        }
    }

    /// Negate the scalar if its point has an odd y coordinate, so the public
    /// key is the even-y representative an `npub` decodes to.
    fn into_even_y(self, ctx: &EscrowContext) -> Self {
        let (_, parity) = self.secret.x_only_public_key(ctx.secp());
        match parity {
            Parity::Even => self,
            Parity::Odd => {
                debug!("Normalizing odd-y identity key to its even-y representative");
                self.negate()
            }
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Decode an `npub` identity key into the even-y compressed public key.
pub fn decode_public_key(npub: &str) -> Result<PublicKey> {
    let data = decode_bech32(npub, NPUB_HRP)?;
    let x_only = XOnlyPublicKey::from_slice(&data)
        .map_err(|e| EscrowError::InvalidKeyEncoding(format!("not a curve point: {}", e)))?;

    let key = secp256k1::PublicKey::from_x_only_public_key(x_only, Parity::Even);
    debug!(npub = %npub, pubkey = %hex::encode(key.serialize()), "Decoded identity key");
    Ok(PublicKey::from(key))
}

/// Parse a public key given either as an `npub` or as compressed hex.
pub fn parse_public_key(s: &str) -> Result<PublicKey> {
    let s = s.trim();
    if s.to_ascii_lowercase().starts_with("npub1") {
        decode_public_key(s)
    } else {
        PublicKey::from_hex(s)
    }
}

/// Decode a private key from an `nsec`, 64-character hex, or WIF string.
///
/// `nsec` keys are normalized to the even-y representative so that they
/// sign for the key their `npub` places in the script. Hex and WIF secrets
/// are kept as given; [`sign_input`](crate::signer::sign_input) picks the
/// parity the script expects. WIF keys carry a network tag that must match
/// `network`.
pub fn decode_private_key(ctx: &EscrowContext, s: &str, network: Network) -> Result<PrivateKey> {
    let s = s.trim();

    if s.to_ascii_lowercase().starts_with("nsec1") {
        let data = decode_bech32(s, NSEC_HRP)?;
        let secret = SecretKey::from_slice(&data)
            .map_err(|e| EscrowError::InvalidKeyEncoding(e.to_string()))?;
        return Ok(PrivateKey::from_secret_key(secret).into_even_y(ctx));
    }

    if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        return PrivateKey::from_hex(s);
    }

    let wif = bitcoin::PrivateKey::from_wif(s)
        .map_err(|e| EscrowError::InvalidKeyEncoding(e.to_string()))?;
    if !wif.compressed {
        return Err(EscrowError::InvalidKeyEncoding(
            "uncompressed WIF keys are not supported".to_string(),
        ));
    }
    if wif.network != network.network_kind() {
        return Err(EscrowError::NetworkMismatch {
            expected: network.to_string(),
            actual: format!("{:?} WIF key", wif.network),
        });
    }

    Ok(PrivateKey::from_secret_key(wif.inner))
}

/// Public key for a private key.
pub fn derive_public_key(ctx: &EscrowContext, key: &PrivateKey) -> PublicKey {
    PublicKey::from(key.secret_key().public_key(ctx.secp()))
}

/// Cheap syntactic check of an `npub`: checksum, prefix and payload length.
///
/// Does not check that the payload is a point on the curve.
pub fn validate_identity_key(s: &str) -> bool {
    match bech32::decode(s) {
        Ok((hrp, data)) => hrp == NPUB_HRP && data.len() == 32,
        Err(_) => false,
    }
}

/// Encode a public key as an `npub` (x-only).
pub fn encode_public_key(key: &PublicKey) -> Result<String> {
    bech32::encode::<Bech32>(NPUB_HRP, &key.x_only().serialize())
        .map_err(|e| EscrowError::InvalidKeyEncoding(e.to_string()))
}

/// Key-path P2TR address of an identity key, usable as a default payout destination.
pub fn identity_address(ctx: &EscrowContext, npub: &str, network: Network) -> Result<Address> {
    let key = decode_public_key(npub)?;
    Ok(Address::p2tr(
        ctx.secp(),
        key.x_only(),
        None,
        network.bitcoin_network(),
    ))
}

fn decode_bech32(s: &str, expected: Hrp) -> Result<Vec<u8>> {
    let (hrp, data) =
        bech32::decode(s).map_err(|e| EscrowError::InvalidKeyEncoding(e.to_string()))?;

    if hrp != expected {
        return Err(EscrowError::InvalidKeyEncoding(format!(
            "expected '{}' prefix, got '{}'",
            expected, hrp
        )));
    }
    if data.len() != 32 {
        return Err(EscrowError::InvalidKeyEncoding(format!(
            "expected 32-byte payload, got {} bytes",
            data.len()
        )));
    }

    Ok(data)
}
