use crate::constants::MAX_HISTORY_SIZE;
use crate::rating::CreditRating;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Bounded ring buffer of recent samples used for moving-average smoothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    values: VecDeque<f64>,
}

impl History {
    /// History seeded with a single sample.
    pub fn seeded(value: f64) -> Self {
        let mut h = Self::default();
        h.push(value);
        h
    }

    /// Append a sample, evicting the oldest once [`MAX_HISTORY_SIZE`] is reached.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == MAX_HISTORY_SIZE {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Arithmetic mean of the buffered samples, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// The most recent `n` samples, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<f64> {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}

/// Indicator histories sampled on every monthly sub-cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorHistory {
    pub gdp: History,
    pub inflation: History,
    pub popularity: History,
    pub unemployment: History,
}

/// Aggregated trade flows for one country, refreshed every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeStats {
    pub commodity_imports: f64,
    pub commodity_exports: f64,
    pub manufacture_imports: f64,
    pub manufacture_exports: f64,
}

/// Sector mix and needs the country started from; drift is pulled back towards it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorBaseline {
    pub services: f64,
    pub commodities: f64,
    pub manufactures: f64,
    /// Commodities needs as % of GDP before employment/inflation effects.
    pub commodities_needs_pct: f64,
    /// Manufactures needs as % of GDP before employment/inflation effects.
    pub manufactures_needs_pct: f64,
}

/// Player-controlled policy levers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyLever {
    InterestRate,
    TaxBurden,
    PublicServices,
}

impl PolicyLever {
    pub const ALL: [PolicyLever; 3] = [
        PolicyLever::InterestRate,
        PolicyLever::TaxBurden,
        PolicyLever::PublicServices,
    ];

    /// Largest change one player action may apply.
    pub fn max_step(self) -> f64 {
        use crate::constants::*;
        match self {
            PolicyLever::InterestRate => MAX_INTEREST_RATE_STEP,
            PolicyLever::TaxBurden => MAX_TAX_BURDEN_STEP,
            PolicyLever::PublicServices => MAX_PUBLIC_SERVICES_STEP,
        }
    }

    /// Inclusive absolute range accepted for the lever.
    pub fn range(self) -> (f64, f64) {
        use crate::constants::*;
        match self {
            PolicyLever::InterestRate => (0.0, MAX_INTEREST_RATE),
            PolicyLever::TaxBurden => (0.0, MAX_TAX_BURDEN),
            PolicyLever::PublicServices => (0.0, MAX_PUBLIC_SERVICES),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyLever::InterestRate => "interestRate",
            PolicyLever::TaxBurden => "taxBurden",
            PolicyLever::PublicServices => "publicServices",
        }
    }
}

impl fmt::Display for PolicyLever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full macroeconomic state of one country inside one room.
///
/// Rates are stored as plain numbers: `inflation` as a fraction (0.04 = 4%),
/// every other percentage as percentage points (`unemployment = 12.5`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryEconomicState {
    pub gdp: f64,
    pub treasury: f64,
    pub public_debt: f64,

    pub inflation: f64,
    pub unemployment: f64,
    pub popularity: f64,
    pub credit_rating: CreditRating,
    /// Quarter-over-quarter GDP growth in percent.
    pub gdp_growth: f64,

    pub interest_rate: f64,
    pub tax_burden: f64,
    pub public_services: f64,

    pub services: f64,
    pub commodities: f64,
    pub manufactures: f64,

    pub services_output: f64,
    pub commodities_output: f64,
    pub manufactures_output: f64,
    pub commodities_needs: f64,
    pub manufactures_needs: f64,
    /// Current commodities needs as % of GDP (drifts around the baseline).
    pub commodities_needs_pct: f64,
    /// Current manufactures needs as % of GDP (drifts around the baseline).
    pub manufactures_needs_pct: f64,
    pub commodities_balance: f64,
    pub manufactures_balance: f64,
    pub trade_stats: TradeStats,

    /// Set while emergency issuance is refused by the debt ceiling.
    pub debt_ceiling_locked: bool,

    pub cycle_count: u64,
    pub last_quarter_gdp: f64,
    pub baseline: SectorBaseline,
    pub history: IndicatorHistory,
}

impl CountryEconomicState {
    /// Public debt relative to GDP.
    pub fn debt_to_gdp(&self) -> f64 {
        if self.gdp > 0.0 {
            self.public_debt / self.gdp
        } else {
            f64::INFINITY
        }
    }

    /// Quarterly growth as a fraction (`gdp_growth` is stored in percent).
    pub fn quarterly_growth(&self) -> f64 {
        self.gdp_growth / 100.0
    }

    pub fn lever(&self, lever: PolicyLever) -> f64 {
        match lever {
            PolicyLever::InterestRate => self.interest_rate,
            PolicyLever::TaxBurden => self.tax_burden,
            PolicyLever::PublicServices => self.public_services,
        }
    }

    pub fn set_lever(&mut self, lever: PolicyLever, value: f64) {
        match lever {
            PolicyLever::InterestRate => self.interest_rate = value,
            PolicyLever::TaxBurden => self.tax_burden = value,
            PolicyLever::PublicServices => self.public_services = value,
        }
    }

    /// Sector shares as `[services, commodities, manufactures]`.
    pub fn sector_shares(&self) -> [f64; 3] {
        [self.services, self.commodities, self.manufactures]
    }

    pub fn set_sector_shares(&mut self, shares: [f64; 3]) {
        self.services = shares[0];
        self.commodities = shares[1];
        self.manufactures = shares[2];
    }

    /// Append the current indicators to their histories.
    pub fn record_history(&mut self) {
        self.history.gdp.push(self.gdp);
        self.history.inflation.push(self.inflation);
        self.history.popularity.push(self.popularity);
        self.history.unemployment.push(self.unemployment);
    }
}
