use serde::{Deserialize, Serialize};

/// Engine timing and randomness configuration.
///
/// All periods are counted in master ticks. With the default 500 ms master
/// interval a month (`monthly_period`) lasts 30 s and a quarter 90 s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock length of one master tick in milliseconds.
    pub master_interval_ms: u64,
    /// Ticks per month: debt amortisation and history sampling.
    pub monthly_period: u64,
    /// Ticks per quarter: GDP growth recomputation.
    pub quarterly_period: u64,
    /// Ticks between random walks of the sector mix.
    pub sector_drift_period: u64,
    /// Apply the ±0.2 random drift to needs percentages each tick.
    pub needs_drift: bool,
    /// Interval of full-store snapshots in milliseconds.
    pub save_interval_ms: u64,
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            master_interval_ms: 500,
            monthly_period: 60,
            quarterly_period: 180,
            sector_drift_period: 15,
            needs_drift: true,
            save_interval_ms: 50_000,
            rng_seed: 42,
        }
    }
}

impl EngineConfig {
    pub fn is_monthly_boundary(&self, cycle: u64) -> bool {
        cycle > 0 && cycle % self.monthly_period == 0
    }

    pub fn is_quarterly_boundary(&self, cycle: u64) -> bool {
        cycle > 0 && cycle % self.quarterly_period == 0
    }

    pub fn is_sector_drift_boundary(&self, cycle: u64) -> bool {
        cycle > 0 && cycle % self.sector_drift_period == 0
    }
}
