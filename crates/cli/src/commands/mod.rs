//! Subcommand implementations.

pub mod broadcast;
pub mod combine;
pub mod escrow;
pub mod fees;
pub mod sign;
pub mod sweep;
pub mod timelock;
pub mod tx;
pub mod validate;

use anyhow::{Context, Result};
use escrow_engine::{check_timelock, days_hours_to_blocks};
use escrow_esplora::{EsploraClient, EsploraError};
use escrow_types::{FeeTier, Network};
use std::io::Read;
use tracing::debug;

use crate::config::Config;
use crate::output::Output;

/// How the absolute fee is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeChoice {
    Absolute(u64),
    /// sat/vB applied to the estimated witnessed size
    Rate(u64),
    /// Explorer recommendation, applied like `Rate`
    Tier(FeeTier),
}

/// Explorer client for the configured network and URL.
pub fn esplora_client(config: &Config) -> Result<EsploraClient> {
    EsploraClient::new(config.esplora_url(), config.timeout_secs)
        .context("Failed to create Esplora client")
}

/// Absolute fee and the rate it came from, if any.
///
/// `fee_at` turns a sat/vB rate into satoshis for the transaction at hand.
pub async fn resolve_fee<F>(
    config: &Config,
    out: &Output,
    choice: FeeChoice,
    fee_at: F,
) -> Result<(u64, Option<u64>)>
where
    F: Fn(u64) -> escrow_types::Result<u64>,
{
    let rate = match choice {
        FeeChoice::Absolute(sats) => return Ok((sats, None)),
        FeeChoice::Rate(rate) => rate,
        FeeChoice::Tier(tier) => {
            let client = esplora_client(config)?;
            let spinner = out.spinner(format!("Fetching {} fee rate", tier));
            let fees = client.fee_recommendations().await;
            spinner.finish_and_clear();
            fees.context("Failed to fetch fee recommendations (pass --fee or --fee-rate to skip)")?
                .rate(tier)
        }
    };
    Ok((fee_at(rate)?, Some(rate)))
}

/// Funding txid and amount of `address`, querying the explorer for
/// whichever of the two was not given.
pub async fn resolve_funding(
    config: &Config,
    out: &Output,
    address: &str,
    funding_txid: Option<String>,
    amount: Option<u64>,
) -> Result<(String, u64)> {
    if let (Some(txid), Some(amount)) = (&funding_txid, amount) {
        return Ok((txid.clone(), amount));
    }

    let client = esplora_client(config)?;
    let spinner = out.spinner(format!("Looking up funding of {}", address));
    let result = async {
        let txid = match funding_txid {
            Some(txid) => txid,
            None => client.funding_txid(address).await?,
        };
        let amount = match amount {
            Some(amount) => amount,
            None => client.balance(address).await?,
        };
        Ok::<_, EsploraError>((txid, amount))
    }
    .await;
    spinner.finish_and_clear();

    let (txid, amount) = result.with_context(|| {
        format!(
            "Failed to look up funding of {} (pass --funding-txid and --amount to skip)",
            address
        )
    })?;
    if amount == 0 {
        anyhow::bail!("{} has no confirmed balance", address);
    }

    debug!(%address, %txid, amount, "Resolved funding from explorer");
    Ok((txid, amount))
}

/// Timelock in blocks from either an explicit count or a days/hours duration.
pub fn resolve_timelock(
    blocks: Option<u64>,
    days: Option<u32>,
    hours: Option<u32>,
    network: Network,
) -> Result<u64> {
    let blocks = match (blocks, days, hours) {
        (Some(blocks), _, _) => blocks,
        (None, None, None) => {
            anyhow::bail!("Dispute escrows need --timelock-blocks or --days/--hours")
        }
        (None, days, hours) => {
            days_hours_to_blocks(days.unwrap_or(0), hours.unwrap_or(0), network)
        }
    };

    check_timelock(blocks)?;
    Ok(blocks)
}

/// Hex argument, or stdin when the argument is "-".
pub fn read_hex_arg(value: &str) -> Result<String> {
    if value != "-" {
        return Ok(value.trim().to_string());
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read transaction from stdin")?;
    Ok(buffer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_explicit_blocks() {
        assert_eq!(resolve_timelock(Some(144), None, None, Network::Mainnet).unwrap(), 144);
    }

    #[test]
    fn test_resolve_duration() {
        let blocks = resolve_timelock(None, Some(1), None, Network::Mutinynet).unwrap();
        assert_eq!(blocks, 2_880);
        let blocks = resolve_timelock(None, None, Some(3), Network::Testnet4).unwrap();
        assert_eq!(blocks, 18);
    }

    #[test]
    fn test_resolve_requires_some_input() {
        assert!(resolve_timelock(None, None, None, Network::Signet).is_err());
    }

    #[test]
    fn test_resolve_rejects_zero_and_overflow() {
        assert!(resolve_timelock(Some(0), None, None, Network::Mainnet).is_err());
        assert!(resolve_timelock(None, Some(365), None, Network::Mutinynet).is_err());
    }

    #[test]
    fn test_read_hex_arg_trims() {
        assert_eq!(read_hex_arg("  0200abcd \n").unwrap(), "0200abcd");
    }

    fn unreachable_explorer() -> Config {
        Config {
            esplora_url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_given_funding_skips_explorer() {
        let txid = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
        let (found, amount) = resolve_funding(
            &unreachable_explorer(),
            &Output::new(false, true),
            "tb1q2g57akwgzmhmrrfseafr3nre4fs0l0a7hsf7nsj3wqeltcqehycskvfxtr",
            Some(txid.to_string()),
            Some(250_000),
        )
        .await
        .unwrap();
        assert_eq!((found.as_str(), amount), (txid, 250_000));
    }

    #[tokio::test]
    async fn test_missing_funding_names_escape_hatch() {
        let err = resolve_funding(
            &unreachable_explorer(),
            &Output::new(false, true),
            "tb1q2g57akwgzmhmrrfseafr3nre4fs0l0a7hsf7nsj3wqeltcqehycskvfxtr",
            None,
            Some(250_000),
        )
        .await
        .unwrap_err();
        assert!(format!("{:#}", err).contains("--funding-txid"));
    }

    #[tokio::test]
    async fn test_explicit_fee_rate_is_applied_offline() {
        let (fee, rate) = resolve_fee(
            &unreachable_explorer(),
            &Output::new(false, true),
            FeeChoice::Rate(4),
            |rate| Ok(rate * 150),
        )
        .await
        .unwrap();
        assert_eq!((fee, rate), (600, Some(4)));
    }
}
