//! Fee recommendation command.

use anyhow::{Context, Result};
use escrow_types::FeeTier;
use serde::Serialize;
use tabled::Tabled;

use crate::{commands::esplora_client, config::Config, output::Output};

const TIERS: [FeeTier; 5] = [
    FeeTier::Fastest,
    FeeTier::HalfHour,
    FeeTier::Hour,
    FeeTier::Economy,
    FeeTier::Minimum,
];

#[derive(Serialize, Tabled)]
struct FeeRow {
    #[tabled(rename = "Tier")]
    tier: FeeTier,
    #[tabled(rename = "sat/vB")]
    rate: u64,
}

/// Show the explorer's fee tiers, rounded up to whole sat/vB.
pub async fn show_fees(config: &Config, out: &Output) -> Result<()> {
    let client = esplora_client(config)?;

    let spinner = out.spinner(format!("Fetching fees from {}", client.base_url()));
    let result = client.fee_recommendations().await;
    spinner.finish_and_clear();
    let fees = result.context("Failed to fetch fee recommendations")?;

    if out.document(&fees)? {
        return Ok(());
    }

    out.section(&format!("Fee rates ({})", config.network));
    out.table(
        TIERS
            .iter()
            .map(|&tier| FeeRow {
                tier,
                rate: fees.rate(tier),
            })
            .collect(),
    );
    Ok(())
}
