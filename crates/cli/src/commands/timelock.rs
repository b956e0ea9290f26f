//! Timelock conversion command.

use anyhow::Result;
use escrow_engine::{check_timelock, days_hours_to_blocks};
use escrow_types::Network;
use serde::Serialize;
use tabled::Tabled;

use crate::output::Output;

#[derive(Debug, Serialize, Tabled)]
struct TimelockRow {
    #[tabled(rename = "Network")]
    network: Network,
    #[tabled(rename = "Block interval (s)")]
    block_interval_secs: u64,
    #[tabled(rename = "Blocks")]
    blocks: u64,
    #[tabled(rename = "Fits CSV")]
    valid: bool,
}

#[derive(Serialize)]
struct TimelockDocument {
    days: u32,
    hours: u32,
    network: Network,
    blocks: u64,
    networks: Vec<TimelockRow>,
}

fn row(network: Network, days: u32, hours: u32) -> TimelockRow {
    let blocks = days_hours_to_blocks(days, hours, network);
    TimelockRow {
        network,
        block_interval_secs: network.block_interval_secs(),
        blocks,
        valid: check_timelock(blocks).is_ok(),
    }
}

/// Convert days and hours to blocks for the selected network.
///
/// Fails when the result is not a usable relative timelock on that network.
pub fn convert(out: &Output, network: Network, days: u32, hours: u32) -> Result<()> {
    let selected = row(network, days, hours);
    let networks: Vec<TimelockRow> = Network::ALL
        .iter()
        .map(|&other| row(other, days, hours))
        .collect();

    let blocks = selected.blocks;
    let document = TimelockDocument {
        days,
        hours,
        network,
        blocks,
        networks,
    };
    if !out.document(&document)? {
        out.section("Relative timelock");
        out.field("Duration", format!("{}d {}h", days, hours));
        out.field("Network", network);
        out.field("Blocks", blocks);
        println!();
        out.table(document.networks);
    }

    check_timelock(blocks)?;
    Ok(())
}
