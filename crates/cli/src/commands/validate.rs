//! Validation commands.
//!
//! Each prints the verdict and fails with exit code 1 when the value is invalid.

use anyhow::Result;
use escrow_engine::api::{validate_address, validate_identity_key, validate_txid};
use escrow_engine::{identity_address, EscrowContext};
use escrow_types::Network;
use serde::Serialize;

use crate::output::Output;

#[derive(Serialize)]
struct Verdict<'a> {
    kind: &'static str,
    value: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn report(out: &Output, verdict: Verdict<'_>) -> Result<()> {
    if !out.document(&verdict)? {
        out.verdict(verdict.kind, verdict.valid);
        if let Some(detail) = &verdict.detail {
            out.field("Detail", detail);
        }
    }

    if !verdict.valid {
        anyhow::bail!("'{}' is not a valid {}", verdict.value, verdict.kind);
    }
    Ok(())
}

/// Identity key; a valid key also shows its payout address.
pub fn key(
    ctx: &EscrowContext,
    out: &Output,
    network: Network,
    value: &str,
) -> Result<()> {
    let valid = validate_identity_key(value);
    let detail = if valid {
        identity_address(ctx, value, network)
            .ok()
            .map(|address| format!("payout address {}", address))
    } else {
        None
    };

    report(
        out,
        Verdict {
            kind: "identity key",
            value,
            valid,
            detail,
        },
    )
}

pub fn address(out: &Output, network: Network, value: &str) -> Result<()> {
    report(
        out,
        Verdict {
            kind: "address",
            value,
            valid: validate_address(value, network),
            detail: Some(format!("checked against {}", network)),
        },
    )
}

pub fn txid(out: &Output, value: &str) -> Result<()> {
    report(
        out,
        Verdict {
            kind: "txid",
            value,
            valid: validate_txid(value),
            detail: None,
        },
    )
}
