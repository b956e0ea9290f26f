//! Escrow locking scripts and their P2WSH addresses.
//!
//! Two templates exist:
//! - Collaborative: `2 <k1> <k2> 2 CHECKMULTISIG`
//! - Dispute: `IF 2 <p1> <p2> 2 CHECKMULTISIG ELSE 2 <s1> <s2> <s3> 3 CHECKMULTISIG
//!   <timelock> CSV DROP ENDIF`
//!
//! Keys are always sorted by their compressed serialization, so both parties
//! derive the same script no matter which order they pass keys in.

use crate::keys::PublicKey;
use crate::timelock::check_timelock;
use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::{
    OP_CHECKMULTISIG, OP_CSV, OP_DROP, OP_ELSE, OP_ENDIF, OP_IF, OP_PUSHNUM_1, OP_PUSHNUM_16,
    OP_PUSHNUM_2, OP_PUSHNUM_3,
};
use bitcoin::script::{Builder, Instruction};
use bitcoin::{Address, Script, ScriptBuf};
use escrow_types::{EscrowError, Network, Result};
use tracing::debug;

/// Spending policy committed to by an escrow address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockingScript {
    /// Both parties must sign.
    Collaborative { keys: [PublicKey; 2] },
    /// Both parties, or any two of the three keys once `timelock` blocks
    /// have passed since funding.
    Dispute {
        participants: [PublicKey; 2],
        arbiter: PublicKey,
        timelock: u16,
    },
}

/// Address derived from a locking script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowAddress {
    pub script: ScriptBuf,
    /// SHA-256 of the script.
    pub witness_program: [u8; 32],
    pub address: Address,
    pub network: Network,
}

impl LockingScript {
    /// 2-of-2 between exactly two distinct keys.
    pub fn collaborative(keys: &[PublicKey]) -> Result<Self> {
        Ok(LockingScript::Collaborative {
            keys: sorted_pair(keys)?,
        })
    }

    /// Collaborative branch for the two participants plus a timelocked
    /// branch where any two of participants and arbiter can spend.
    pub fn dispute(
        participants: &[PublicKey],
        arbiter: PublicKey,
        timelock_blocks: u64,
    ) -> Result<Self> {
        let participants = sorted_pair(participants)?;
        if participants.contains(&arbiter) {
            return Err(EscrowError::InvalidKeyCount(
                "arbiter key must differ from both participant keys".to_string(),
            ));
        }
        let timelock = check_timelock(timelock_blocks)?;

        Ok(LockingScript::Dispute {
            participants,
            arbiter,
            timelock,
        })
    }

    pub fn is_dispute(&self) -> bool {
        matches!(self, LockingScript::Dispute { .. })
    }

    /// The two keys of the collaborative 2-of-2, sorted.
    pub fn participants(&self) -> [PublicKey; 2] {
        match self {
            LockingScript::Collaborative { keys } => *keys,
            LockingScript::Dispute { participants, .. } => *participants,
        }
    }

    pub fn arbiter(&self) -> Option<PublicKey> {
        match self {
            LockingScript::Collaborative { .. } => None,
            LockingScript::Dispute { arbiter, .. } => Some(*arbiter),
        }
    }

    pub fn timelock(&self) -> Option<u16> {
        match self {
            LockingScript::Collaborative { .. } => None,
            LockingScript::Dispute { timelock, .. } => Some(*timelock),
        }
    }

    /// Every key that appears in the script, sorted.
    pub fn all_keys(&self) -> Vec<PublicKey> {
        let mut keys = self.participants().to_vec();
        if let Some(arbiter) = self.arbiter() {
            keys.push(arbiter);
            keys.sort();
        }
        keys
    }

    pub fn to_script(&self) -> ScriptBuf {
        match self {
            LockingScript::Collaborative { keys } => {
                multisig(Builder::new(), 2, keys).into_script()
            }
            LockingScript::Dispute {
                participants,
                timelock,
                ..
            } => {
                let builder = multisig(Builder::new().push_opcode(OP_IF), 2, participants)
                    .push_opcode(OP_ELSE);
                multisig(builder, 2, &self.all_keys())
                    .push_int(i64::from(*timelock))
                    .push_opcode(OP_CSV)
                    .push_opcode(OP_DROP)
                    .push_opcode(OP_ENDIF)
                    .into_script()
            }
        }
    }

    pub fn witness_program(&self) -> [u8; 32] {
        self.to_script().wscript_hash().to_byte_array()
    }

    /// P2WSH address for `network`.
    pub fn address(&self, network: Network) -> EscrowAddress {
        let script = self.to_script();
        let address = Address::p2wsh(&script, network.bitcoin_network());
        debug!(%address, %network, dispute = self.is_dispute(), "Derived escrow address");

        EscrowAddress {
            witness_program: script.wscript_hash().to_byte_array(),
            script,
            address,
            network,
        }
    }

    /// Recover the typed script from its serialization.
    ///
    /// Succeeds only if re-encoding reproduces `script` byte for byte.
    pub fn from_script(script: &Script) -> Result<Self> {
        let instructions = script
            .instructions()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| EscrowError::InvalidScript(e.to_string()))?;

        let keys = instructions
            .iter()
            .filter_map(|ins| match ins {
                Instruction::PushBytes(bytes) if bytes.len() == 33 => {
                    Some(PublicKey::from_slice(bytes.as_bytes()))
                }
                _ => None,
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| EscrowError::InvalidScript(e.to_string()))?;

        let candidate = match instructions.first() {
            Some(Instruction::Op(op)) if *op == OP_PUSHNUM_2 => Self::collaborative(&keys),
            Some(Instruction::Op(op)) if *op == OP_IF => {
                if keys.len() != 5 {
                    return Err(EscrowError::InvalidScript(format!(
                        "dispute script must contain 5 key pushes, found {}",
                        keys.len()
                    )));
                }
                let participants = &keys[..2];
                let mut others = keys[2..].iter().filter(|k| !participants.contains(k));
                let arbiter = match (others.next(), others.next()) {
                    (Some(arbiter), None) => *arbiter,
                    _ => {
                        return Err(EscrowError::InvalidScript(
                            "cannot identify the arbiter key".to_string(),
                        ))
                    }
                };
                let timelock = instructions
                    .iter()
                    .position(|ins| matches!(ins, Instruction::Op(op) if *op == OP_CSV))
                    .and_then(|pos| pos.checked_sub(1))
                    .and_then(|pos| read_small_int(&instructions[pos]))
                    .ok_or_else(|| {
                        EscrowError::InvalidScript("missing relative timelock".to_string())
                    })?;
                Self::dispute(participants, arbiter, timelock)
            }
            _ => {
                return Err(EscrowError::InvalidScript(
                    "not a collaborative or dispute escrow script".to_string(),
                ))
            }
        }
        .map_err(|e| EscrowError::InvalidScript(e.to_string()))?;

        if candidate.to_script().as_script() != script {
            return Err(EscrowError::InvalidScript(
                "script is not in canonical escrow form".to_string(),
            ));
        }
        Ok(candidate)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| EscrowError::InvalidScript(e.to_string()))?;
        Self::from_script(Script::from_bytes(&bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_script().as_bytes())
    }
}

fn sorted_pair(keys: &[PublicKey]) -> Result<[PublicKey; 2]> {
    match keys {
        [a, b] if a != b => {
            let mut pair = [*a, *b];
            pair.sort();
            Ok(pair)
        }
        [_, _] => Err(EscrowError::InvalidKeyCount(
            "the two participant keys must be distinct".to_string(),
        )),
        _ => Err(EscrowError::InvalidKeyCount(format!(
            "expected 2 participant keys, got {}",
            keys.len()
        ))),
    }
}

/// `<m> <keys...> <n> CHECKMULTISIG`, keys already sorted.
fn multisig(builder: Builder, required: i64, keys: &[PublicKey]) -> Builder {
    let builder = keys
        .iter()
        .fold(builder.push_int(required), |b, key| {
            b.push_key(&bitcoin::PublicKey::new(*key.inner()))
        });
    let total = if keys.len() == 3 { OP_PUSHNUM_3 } else { OP_PUSHNUM_2 };
    builder.push_opcode(total).push_opcode(OP_CHECKMULTISIG)
}

fn read_small_int(ins: &Instruction<'_>) -> Option<u64> {
    match ins {
        Instruction::Op(op) => {
            let code = op.to_u8();
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&code) {
                Some(u64::from(code - OP_PUSHNUM_1.to_u8() + 1))
            } else {
                None
            }
        }
        Instruction::PushBytes(bytes) => {
            let bytes = bytes.as_bytes();
            if bytes.is_empty() || bytes.len() > 3 || bytes[bytes.len() - 1] & 0x80 != 0 {
                return None;
            }
            Some(
                bytes
                    .iter()
                    .rev()
                    .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)),
            )
        }
    }
}
