//! Duration to block-count conversion for relative timelocks.

use escrow_types::{EscrowError, Network, Result};

/// Smallest accepted dispute timelock.
pub const MIN_TIMELOCK_BLOCKS: u64 = 1;

/// Largest block-based relative lock BIP-68 can express.
pub const MAX_TIMELOCK_BLOCKS: u64 = u16::MAX as u64;

const SECS_PER_HOUR: u64 = 3_600;
const HOURS_PER_DAY: u64 = 24;

/// Blocks needed to cover `hours` on `network`, rounded up.
pub fn hours_to_blocks(hours: u32, network: Network) -> u64 {
    secs_to_blocks(u64::from(hours) * SECS_PER_HOUR, network)
}

/// Blocks needed to cover `days` on `network`, rounded up.
pub fn days_to_blocks(days: u32, network: Network) -> u64 {
    secs_to_blocks(u64::from(days) * HOURS_PER_DAY * SECS_PER_HOUR, network)
}

/// Blocks needed to cover `days` plus `hours` on `network`, rounded up.
pub fn days_hours_to_blocks(days: u32, hours: u32, network: Network) -> u64 {
    let total_hours = u64::from(days) * HOURS_PER_DAY + u64::from(hours);
    secs_to_blocks(total_hours * SECS_PER_HOUR, network)
}

fn secs_to_blocks(secs: u64, network: Network) -> u64 {
    secs.div_ceil(network.block_interval_secs())
}

/// Check that a block count fits a block-based relative lock.
pub fn check_timelock(blocks: u64) -> Result<u16> {
    if !(MIN_TIMELOCK_BLOCKS..=MAX_TIMELOCK_BLOCKS).contains(&blocks) {
        return Err(EscrowError::TimelockOutOfRange {
            blocks,
            min: MIN_TIMELOCK_BLOCKS,
            max: MAX_TIMELOCK_BLOCKS,
        });
    }
    Ok(blocks as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_conversions() {
        assert_eq!(hours_to_blocks(1, Network::Mainnet), 6);
        assert_eq!(days_to_blocks(1, Network::Mainnet), 144);
        assert_eq!(days_hours_to_blocks(1, 12, Network::Mainnet), 216);
    }

    #[test]
    fn test_mutinynet_conversions() {
        assert_eq!(hours_to_blocks(1, Network::Mutinynet), 120);
        assert_eq!(days_to_blocks(1, Network::Mutinynet), 2_880);
    }

    #[test]
    fn test_zero_duration() {
        assert_eq!(hours_to_blocks(0, Network::Signet), 0);
        assert!(check_timelock(0).is_err());
    }

    #[test]
    fn test_never_undershoots() {
        for network in Network::ALL {
            for hours in [0u32, 1, 7, 23, 100, 1_000, 24_000] {
                let blocks = hours_to_blocks(hours, network);
                assert!(blocks * network.block_interval_secs() >= u64::from(hours) * 3_600);
            }
        }
    }

    #[test]
    fn test_large_inputs_do_not_overflow() {
        let blocks = days_to_blocks(u32::MAX, Network::Mutinynet);
        assert_eq!(blocks, u64::from(u32::MAX) * 2_880);
        assert!(check_timelock(blocks).is_err());
    }

    #[test]
    fn test_check_timelock_bounds() {
        assert_eq!(check_timelock(1).unwrap(), 1);
        assert_eq!(check_timelock(65_535).unwrap(), u16::MAX);
        assert!(matches!(
            check_timelock(65_536),
            Err(EscrowError::TimelockOutOfRange { blocks: 65_536, .. })
        ));
    }
}
