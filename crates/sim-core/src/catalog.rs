use crate::constants::*;
use crate::rating::CreditRating;
use crate::sectors::normalize_shares;
use crate::state::{CountryEconomicState, History, IndicatorHistory, SectorBaseline, TradeStats};
use crate::CountryName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static starting data for one country.
///
/// Every field is optional; missing values fall back to a neutral economy.
/// Catalog files may carry other sections (defense, politics) which are
/// ignored here.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CountryDefinition {
    pub gdp: Option<f64>,
    pub treasury: Option<f64>,
    pub public_debt: Option<f64>,
    pub services: Option<f64>,
    pub commodities: Option<f64>,
    pub manufactures: Option<f64>,
    pub inflation: Option<f64>,
    pub unemployment: Option<f64>,
    pub popularity: Option<f64>,
    pub interest_rate: Option<f64>,
    pub tax_burden: Option<f64>,
    pub public_services: Option<f64>,
}

/// Country definitions keyed by name, as loaded from a catalog file.
pub type CountryCatalog = BTreeMap<CountryName, CountryDefinition>;

fn positive_or(v: Option<f64>, fallback: f64) -> f64 {
    match v {
        Some(x) if x.is_finite() && x > 0.0 => x,
        _ => fallback,
    }
}

fn finite_or(v: Option<f64>, fallback: f64) -> f64 {
    match v {
        Some(x) if x.is_finite() => x,
        _ => fallback,
    }
}

impl CountryDefinition {
    /// Build the initial economic state for this definition.
    ///
    /// Implausible seeds (zero inflation, unemployment below 5%, popularity
    /// below 20) are replaced by neutral values so a game never starts in a
    /// degenerate corner.
    pub fn seed_state(&self) -> CountryEconomicState {
        let gdp = positive_or(self.gdp, 100.0);
        let shares = normalize_shares([
            positive_or(self.services, 35.0),
            positive_or(self.commodities, 35.0),
            positive_or(self.manufactures, 30.0),
        ]);

        let mut inflation = finite_or(self.inflation, EQUILIBRIUM_INFLATION);
        if inflation == 0.0 {
            inflation = EQUILIBRIUM_INFLATION;
        }
        let inflation = inflation.clamp(MIN_INFLATION, MAX_INFLATION);
        let mut unemployment = finite_or(self.unemployment, 12.5);
        if unemployment < 5.0 {
            unemployment = 12.5;
        }
        let unemployment = unemployment.clamp(MIN_UNEMPLOYMENT, MAX_UNEMPLOYMENT);
        let mut popularity = finite_or(self.popularity, IDEAL_POPULARITY);
        if popularity < 20.0 {
            popularity = IDEAL_POPULARITY;
        }
        let popularity = popularity.clamp(MIN_POPULARITY, MAX_POPULARITY);

        let commodities_needs_pct =
            (25.0 + shares[1] * 0.1).clamp(MIN_COMMODITIES_NEEDS, MAX_COMMODITIES_NEEDS);
        let manufactures_needs_pct =
            (35.0 + shares[2] * 0.1).clamp(MIN_MANUFACTURES_NEEDS, MAX_MANUFACTURES_NEEDS);

        let commodities_output = gdp * shares[1] / 100.0;
        let manufactures_output = gdp * shares[2] / 100.0;
        let commodities_needs = gdp * commodities_needs_pct / 100.0;
        let manufactures_needs = gdp * manufactures_needs_pct / 100.0;

        CountryEconomicState {
            gdp,
            treasury: finite_or(self.treasury, 10.0),
            public_debt: finite_or(self.public_debt, 0.0).max(0.0),
            inflation,
            unemployment,
            popularity,
            credit_rating: CreditRating::default(),
            gdp_growth: 2.5,
            interest_rate: finite_or(self.interest_rate, EQUILIBRIUM_INTEREST_RATE),
            tax_burden: finite_or(self.tax_burden, EQUILIBRIUM_TAX_RATE),
            public_services: finite_or(self.public_services, PUBLIC_SERVICES_FLOOR),
            services: shares[0],
            commodities: shares[1],
            manufactures: shares[2],
            services_output: gdp * shares[0] / 100.0,
            commodities_output,
            manufactures_output,
            commodities_needs,
            manufactures_needs,
            commodities_needs_pct,
            manufactures_needs_pct,
            commodities_balance: commodities_output - commodities_needs,
            manufactures_balance: manufactures_output - manufactures_needs,
            trade_stats: TradeStats::default(),
            debt_ceiling_locked: false,
            cycle_count: 0,
            // Slightly lower so the first quarter reports modest growth.
            last_quarter_gdp: gdp * 0.975,
            baseline: SectorBaseline {
                services: shares[0],
                commodities: shares[1],
                manufactures: shares[2],
                commodities_needs_pct,
                manufactures_needs_pct,
            },
            history: IndicatorHistory {
                gdp: History::seeded(gdp),
                inflation: History::seeded(inflation),
                popularity: History::seeded(popularity),
                unemployment: History::seeded(unemployment),
            },
        }
    }
}
