#![deny(warnings)]

//! Core domain models and invariants for the economy engine.
//!
//! This crate defines the serializable types shared by the calculators, the
//! runtime and the persistence layer, together with validation helpers that
//! guarantee the numeric invariants of a country's economy.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod catalog;
pub mod config;
pub mod constants;
pub mod debt;
pub mod rating;
pub mod sectors;
pub mod snapshot;
pub mod state;
pub mod trade;

pub use catalog::{CountryCatalog, CountryDefinition};
pub use config::EngineConfig;
pub use debt::DebtContract;
pub use rating::CreditRating;
pub use sectors::normalize_shares;
pub use snapshot::{RoomSnapshot, StoreSnapshot};
pub use state::{
    CountryEconomicState, History, IndicatorHistory, PolicyLever, SectorBaseline, TradeStats,
};
pub use trade::{Product, TradeAgreement, TradeKind};

use constants::*;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Name of a game room, e.g. "lobby-7".
    RoomName
);
string_id!(
    /// Name of a country as it appears in the catalog, e.g. "Brazil".
    CountryName
);
string_id!(
    /// Identifier of the player controlling a country.
    PlayerId
);

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite value in field {0}")]
    NonFinite(&'static str),
    /// GDP must be strictly positive.
    #[error("gdp must be > 0")]
    NonPositiveGdp,
    /// Debt must be non-negative.
    #[error("public debt must be >= 0")]
    NegativeDebt,
    /// Indicator outside its allowed band.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfBounds {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Sector shares must sum to 100 (±1).
    #[error("sector shares sum to {0}, expected 100")]
    SectorSum(f64),
    /// Engine configuration is unusable.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(&'static str),
}

fn check_bounds(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    // Allow for floating-point noise at the edges.
    let eps = 1e-9;
    if value < min - eps || value > max + eps {
        return Err(ValidationError::OutOfBounds {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Validate the invariants every country must hold after a tick.
pub fn validate_country_state(s: &CountryEconomicState) -> Result<(), ValidationError> {
    let finite = [
        ("gdp", s.gdp),
        ("treasury", s.treasury),
        ("publicDebt", s.public_debt),
        ("gdpGrowth", s.gdp_growth),
        ("interestRate", s.interest_rate),
        ("taxBurden", s.tax_burden),
        ("publicServices", s.public_services),
        ("commoditiesBalance", s.commodities_balance),
        ("manufacturesBalance", s.manufactures_balance),
    ];
    for (field, v) in finite {
        if !v.is_finite() {
            return Err(ValidationError::NonFinite(field));
        }
    }
    if s.gdp <= 0.0 {
        return Err(ValidationError::NonPositiveGdp);
    }
    if s.public_debt < 0.0 {
        return Err(ValidationError::NegativeDebt);
    }
    check_bounds("inflation", s.inflation, MIN_INFLATION, MAX_INFLATION)?;
    check_bounds("unemployment", s.unemployment, MIN_UNEMPLOYMENT, MAX_UNEMPLOYMENT)?;
    check_bounds("popularity", s.popularity, MIN_POPULARITY, MAX_POPULARITY)?;
    for (field, v) in [
        ("services", s.services),
        ("commodities", s.commodities),
        ("manufactures", s.manufactures),
    ] {
        check_bounds(field, v, MIN_SECTOR_PERCENT, MAX_SECTOR_PERCENT)?;
    }
    let sum = s.services + s.commodities + s.manufactures;
    if !(99.0..=101.0).contains(&sum) {
        return Err(ValidationError::SectorSum(sum));
    }
    Ok(())
}

/// Validate engine timing configuration.
pub fn validate_engine_config(c: &EngineConfig) -> Result<(), ValidationError> {
    if c.master_interval_ms == 0 {
        return Err(ValidationError::InvalidConfig("master_interval_ms must be > 0"));
    }
    if c.monthly_period == 0 || c.quarterly_period == 0 || c.sector_drift_period == 0 {
        return Err(ValidationError::InvalidConfig("periods must be > 0"));
    }
    if c.save_interval_ms < c.master_interval_ms.saturating_mul(10) {
        return Err(ValidationError::InvalidConfig(
            "save_interval_ms must be at least 10 master intervals",
        ));
    }
    Ok(())
}
