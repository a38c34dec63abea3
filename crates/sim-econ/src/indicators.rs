//! Macroeconomic indicator calculators.
//!
//! Each function reads a country snapshot and returns the next value of one
//! indicator; none of them mutate the state. Stochastic terms draw from the
//! caller's RNG so a seeded room replays identically.

use rand::Rng;
use sim_core::constants::*;
use sim_core::{CountryEconomicState, CreditRating, History};

/// Amplitude of the per-tick growth noise.
const GROWTH_NOISE: f64 = 0.00002;
/// Amplitude of the per-tick inflation noise.
const INFLATION_NOISE: f64 = 0.00025;
/// Amplitude of the per-tick popularity noise.
const POPULARITY_NOISE: f64 = 0.25;

/// Mean of a history buffer, or `fallback` when it is empty.
pub fn moving_average(history: &History, fallback: f64) -> f64 {
    history.mean().unwrap_or(fallback)
}

/// Clamp `value` to `[min, max]` and pull it towards `target`.
///
/// The pull is proportional to the distance (1% per unit) and capped at 20%.
pub fn limit_with_curve(value: f64, min: f64, max: f64, target: f64) -> f64 {
    let v = value.clamp(min, max);
    let distance = (v - target).abs();
    if distance == 0.0 {
        return v;
    }
    let correction = 1.0 - (distance * 0.01).min(0.2);
    v * correction + target * (1.0 - correction)
}

/// Per-tick GDP growth rate (fraction) produced by the current policy mix.
pub fn growth_rate<R: Rng + ?Sized>(s: &CountryEconomicState, rng: &mut R) -> f64 {
    let interest_diff = s.interest_rate - EQUILIBRIUM_INTEREST_RATE;
    let interest_effect = if s.interest_rate <= HIGH_INTEREST_THRESHOLD {
        -interest_diff * 0.0002
    } else {
        let excess = s.interest_rate - HIGH_INTEREST_THRESHOLD;
        -(interest_diff * 0.0002) - excess.powf(1.5) * 0.0001
    };

    let tax_effect = -(s.tax_burden - EQUILIBRIUM_TAX_RATE) * 0.00015;

    let investment_effect = if s.public_services >= PUBLIC_SERVICES_FLOOR {
        s.public_services * 0.0001
    } else {
        let deficit = (PUBLIC_SERVICES_FLOOR - s.public_services) / PUBLIC_SERVICES_FLOOR;
        let penalty = 1.0 - deficit.max(0.0).powf(1.5) * 0.5;
        s.public_services * 0.0001 * penalty
    };

    let debt_ratio = s.debt_to_gdp();
    let debt_effect = if debt_ratio > 0.9 {
        -(debt_ratio - 0.9) * 0.05
    } else {
        0.0
    };

    let base = (interest_effect + tax_effect + investment_effect + debt_effect) * GROWTH_DAMPING;
    let noise = rng.gen_range(-GROWTH_NOISE..=GROWTH_NOISE);
    (base + noise).clamp(MIN_GROWTH, MAX_GROWTH)
}

/// Quarter-over-quarter growth in percent.
pub fn quarterly_growth_pct(current_gdp: f64, last_quarter_gdp: f64) -> f64 {
    if last_quarter_gdp <= 0.0 {
        return 0.0;
    }
    (current_gdp - last_quarter_gdp) / last_quarter_gdp * 100.0
}

/// GDP multiplier applied while inflation runs above 10%.
pub fn inflation_gdp_drag(inflation: f64) -> f64 {
    if inflation <= 0.1 {
        return 1.0;
    }
    (0.9998 - (inflation - 0.1) * 0.001).max(0.9995)
}

/// Next inflation value (fraction).
pub fn inflation<R: Rng + ?Sized>(s: &CountryEconomicState, rng: &mut R) -> f64 {
    let mut next = s.inflation;

    if s.interest_rate < EQUILIBRIUM_INTEREST_RATE {
        next *= 1.0 + (EQUILIBRIUM_INTEREST_RATE - s.interest_rate) * 0.03;
    } else if s.interest_rate > EQUILIBRIUM_INTEREST_RATE {
        if s.interest_rate <= HIGH_INTEREST_THRESHOLD {
            let reduction = 1.0 - (s.interest_rate - EQUILIBRIUM_INTEREST_RATE) * 0.025;
            next *= reduction.max(0.85);
        } else {
            let initial = 1.0 - (HIGH_INTEREST_THRESHOLD - EQUILIBRIUM_INTEREST_RATE) * 0.025;
            let kicker = 1.2f64.powf(s.interest_rate - HIGH_INTEREST_THRESHOLD) * 0.05;
            next *= (initial - kicker).max(0.65);
        }
    }

    if s.tax_burden > EQUILIBRIUM_TAX_RATE {
        let reduction = 1.0 - (s.tax_burden - EQUILIBRIUM_TAX_RATE) * 0.003;
        next *= reduction.max(0.96);
    } else if s.tax_burden < EQUILIBRIUM_TAX_RATE {
        next *= 1.0 + (EQUILIBRIUM_TAX_RATE - s.tax_burden) * 0.002;
    }

    let growth = s.quarterly_growth();
    if growth > EQUILIBRIUM_GROWTH {
        let excess = growth - EQUILIBRIUM_GROWTH;
        next += excess * 0.12 * (1.0 + excess * 5.0);
    } else if growth > 0.0 {
        next += growth * 0.005;
    } else if growth < 0.0 {
        next -= growth.abs() * 0.025;
    }

    let debt_ratio = s.debt_to_gdp();
    if debt_ratio > 0.7 {
        next += (debt_ratio - 0.7) * 0.02;
    }

    next += rng.gen_range(-INFLATION_NOISE..=INFLATION_NOISE);

    let blended = s.inflation * INFLATION_INERTIA + next * (1.0 - INFLATION_INERTIA);
    let limited = limit_with_curve(blended, MIN_INFLATION, MAX_INFLATION, EQUILIBRIUM_INFLATION);
    let average = moving_average(&s.history.inflation, limited);
    (limited * 0.8 + average * 0.2).clamp(MIN_INFLATION, MAX_INFLATION)
}

/// Next unemployment rate (percent), Phillips-curve style.
pub fn unemployment(s: &CountryEconomicState) -> f64 {
    let mut next = s.unemployment;

    let growth = s.quarterly_growth();
    if growth > 0.0 {
        next -= growth * 5.0;
    } else {
        next += growth.abs() * 8.0;
    }

    if s.inflation < 0.05 {
        next += (0.05 - s.inflation) * 2.0;
    } else if s.inflation > 0.1 {
        // stagflation
        next += (s.inflation - 0.1) * 3.0;
    } else {
        next -= (s.inflation - 0.05) * 1.0;
    }

    if s.tax_burden > EQUILIBRIUM_TAX_RATE {
        next += (s.tax_burden - EQUILIBRIUM_TAX_RATE) * 0.05;
    }

    let next = next.clamp(MIN_UNEMPLOYMENT, MAX_UNEMPLOYMENT);
    (s.unemployment * UNEMPLOYMENT_INERTIA + next * (1.0 - UNEMPLOYMENT_INERTIA))
        .clamp(MIN_UNEMPLOYMENT, MAX_UNEMPLOYMENT)
}

/// Next government popularity (percent), mean-reverting around 50.
pub fn popularity<R: Rng + ?Sized>(s: &CountryEconomicState, rng: &mut R) -> f64 {
    let mut next = s.popularity;

    let growth = s.quarterly_growth();
    if growth > 0.0 {
        next += growth * 100.0 * 0.2;
    } else if growth < 0.0 {
        next += growth * 100.0 * 0.3;
    }

    let inflation_diff = s.inflation - EQUILIBRIUM_INFLATION;
    if inflation_diff > 0.0 {
        next -= inflation_diff * 100.0 * 0.25;
    } else if inflation_diff < 0.0 && s.inflation > 0.0 {
        next += inflation_diff.abs() * 100.0 * 0.1;
    }

    let tax_diff = s.tax_burden - EQUILIBRIUM_TAX_RATE;
    if tax_diff > 0.0 {
        next -= tax_diff * 0.2;
    } else if tax_diff < 0.0 {
        next += tax_diff.abs() * 0.1;
    }

    let reference = (s.gdp / 3.33).round();
    let investment_diff = s.public_services - reference;
    next += (investment_diff / 10.0).tanh() * 0.8 * investment_diff.abs() * 0.15;

    let unemployment_diff = s.unemployment - IDEAL_UNEMPLOYMENT;
    if unemployment_diff > 0.0 {
        let penalty = 1.0 + (unemployment_diff / 10.0).powf(1.5);
        next -= unemployment_diff * 0.3 * penalty;
    } else if unemployment_diff < 0.0 {
        next += unemployment_diff.abs() * 0.3;
    }

    if s.unemployment > 30.0 && s.inflation > 0.08 {
        let misery = (s.unemployment - 30.0) * (s.inflation - 0.08) * 100.0;
        next -= misery * 0.2;
    }

    next += rng.gen_range(-POPULARITY_NOISE..=POPULARITY_NOISE);
    next = resist_gain(s.popularity, next);

    let distance = next - IDEAL_POPULARITY;
    let return_force = distance * distance * 0.002;
    if distance > 0.0 {
        next -= return_force;
    } else if distance < 0.0 {
        next += return_force;
    }
    let next = next.clamp(MIN_POPULARITY, MAX_POPULARITY);

    let average = moving_average(&s.history.popularity, next);
    (next * POPULARITY_INERTIA + average * (1.0 - POPULARITY_INERTIA))
        .clamp(MIN_POPULARITY, MAX_POPULARITY)
}

/// Damp a popularity gain once the current level is 60 or above; losses pass
/// through unchanged.
fn resist_gain(current: f64, next: f64) -> f64 {
    if next <= current || current < 60.0 {
        return next;
    }
    let factor = match current {
        x if x < 70.0 => 0.8,
        x if x < 80.0 => 0.6,
        x if x < 90.0 => 0.4,
        _ => 0.2,
    };
    current + (next - current) * factor
}

fn base_grade(inflation_pct: f64) -> CreditRating {
    match inflation_pct {
        x if x <= 2.0 => CreditRating::AAA,
        x if x <= 3.0 => CreditRating::AA,
        x if x <= 4.0 => CreditRating::A,
        x if x <= 5.5 => CreditRating::BBB,
        x if x <= 7.0 => CreditRating::BB,
        x if x <= 9.0 => CreditRating::B,
        x if x <= 12.0 => CreditRating::CCC,
        x if x <= 15.0 => CreditRating::CC,
        _ => CreditRating::C,
    }
}

fn debt_notches(debt_ratio: f64) -> usize {
    match debt_ratio {
        r if r > 1.2 => 4,
        r if r > 0.9 => 3,
        r if r > 0.6 => 2,
        r if r > 0.3 => 1,
        _ => 0,
    }
}

fn growth_notches(growth_pct: f64, inflation_pct: f64) -> usize {
    if growth_pct >= 0.0 {
        return 0;
    }
    let notches = match growth_pct {
        g if g >= -1.0 => 1,
        g if g >= -3.0 => 2,
        g if g >= -5.0 => 3,
        _ => 4,
    };
    if inflation_pct > 7.0 {
        notches + 1
    } else {
        notches
    }
}

/// Credit rating derived from inflation, debt load and quarterly growth.
pub fn credit_rating(s: &CountryEconomicState) -> CreditRating {
    let debt_ratio = s.debt_to_gdp();
    let inflation_pct = s.inflation * 100.0;
    let growth_pct = s.gdp_growth;

    if inflation_pct > 15.0 {
        let recent = s.history.inflation.last_n(3);
        if recent.len() == 3 && recent[2] >= recent[0] {
            return CreditRating::D;
        }
    }
    if inflation_pct > 9.0 && debt_ratio > 0.9 && growth_pct < -3.0 {
        return CreditRating::D;
    }

    base_grade(inflation_pct)
        .downgrade(debt_notches(debt_ratio) + growth_notches(growth_pct, inflation_pct))
}

/// Treasury movement of one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiscalFlow {
    pub revenue: f64,
    pub investment_expense: f64,
}

impl FiscalFlow {
    pub fn net(&self) -> f64 {
        self.revenue - self.investment_expense
    }
}

/// Tax revenue and public-investment spending for one tick.
pub fn fiscal_flow(s: &CountryEconomicState) -> FiscalFlow {
    let revenue = s.gdp * (s.tax_burden / 100.0) * REVENUE_FACTOR;
    let investment_expense = if s.public_services <= 0.0 {
        0.0
    } else if s.public_services <= PUBLIC_SERVICES_EXPENSE_THRESHOLD {
        s.gdp * (s.public_services / 100.0) * EXPENSE_FACTOR
    } else {
        let base = s.gdp * (PUBLIC_SERVICES_EXPENSE_THRESHOLD / 100.0) * EXPENSE_FACTOR;
        let excess = s.public_services - PUBLIC_SERVICES_EXPENSE_THRESHOLD;
        base + s.gdp * (excess / 100.0) * EXPENSE_FACTOR * EXCESS_EXPENSE_FACTOR
    };
    FiscalFlow {
        revenue,
        investment_expense,
    }
}
