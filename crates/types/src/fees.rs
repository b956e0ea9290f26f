//! Fee recommendations and broadcast results exchanged with the fee/broadcast service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Named fee tiers in sat/vB, as published by mempool.space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeeRecommendations {
    #[serde(rename = "fastestFee", default)]
    pub fastest: f64,
    #[serde(rename = "halfHourFee", default)]
    pub half_hour: f64,
    #[serde(rename = "hourFee", default)]
    pub hour: f64,
    #[serde(rename = "economyFee", default)]
    pub economy: f64,
    #[serde(rename = "minimumFee", default)]
    pub minimum: f64,
}

impl FeeRecommendations {
    /// Build tiers from an Esplora `/fee-estimates` map (confirmation target -> sat/vB).
    ///
    /// Missing targets fall back to the next slower tier that is present.
    pub fn from_targets(targets: &HashMap<String, f64>) -> Self {
        let at = |target: u16| targets.get(&target.to_string()).copied();

        let minimum = at(1008).or_else(|| at(504)).unwrap_or(1.0);
        let economy = at(144).unwrap_or(minimum);
        let hour = at(6).unwrap_or(economy);
        let half_hour = at(3).unwrap_or(hour);
        let fastest = at(1).unwrap_or(half_hour);

        Self {
            fastest,
            half_hour,
            hour,
            economy,
            minimum,
        }
    }

    /// Fee rate for a tier, rounded up to whole sat/vB and never below 1.
    pub fn rate(&self, tier: FeeTier) -> u64 {
        let raw = match tier {
            FeeTier::Fastest => self.fastest,
            FeeTier::HalfHour => self.half_hour,
            FeeTier::Hour => self.hour,
            FeeTier::Economy => self.economy,
            FeeTier::Minimum => self.minimum,
        };
        (raw.ceil() as u64).max(1)
    }
}

/// Fee tier selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTier {
    Fastest,
    HalfHour,
    Hour,
    Economy,
    Minimum,
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeeTier::Fastest => "fastest",
            FeeTier::HalfHour => "half_hour",
            FeeTier::Hour => "hour",
            FeeTier::Economy => "economy",
            FeeTier::Minimum => "minimum",
        };
        f.write_str(name)
    }
}

/// Parse errors are plain messages so `clap` can show them as-is.
impl FromStr for FeeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fastest" => Ok(FeeTier::Fastest),
            "half_hour" | "halfhour" => Ok(FeeTier::HalfHour),
            "hour" => Ok(FeeTier::Hour),
            "economy" => Ok(FeeTier::Economy),
            "minimum" => Ok(FeeTier::Minimum),
            _ => Err(format!(
                "unknown fee tier '{}' (expected fastest, half-hour, hour, economy or minimum)",
                s
            )),
        }
    }
}

/// Result of a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub txid: String,
}
