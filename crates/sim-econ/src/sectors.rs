//! Sector outputs, domestic needs and trade balances.

use rand::Rng;
use sim_core::constants::*;
use sim_core::{
    normalize_shares, CountryEconomicState, CountryName, Product, SectorBaseline, TradeAgreement,
    TradeKind, TradeStats,
};

/// Unemployment level treated as full employment for consumption purposes.
const FULL_EMPLOYMENT_UNEMPLOYMENT: f64 = 15.0;
const MAX_EMPLOYMENT_EFFECT: f64 = 0.05;

/// Absolute output of each sector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectorOutputs {
    pub services: f64,
    pub commodities: f64,
    pub manufactures: f64,
}

pub fn sector_outputs(gdp: f64, shares: [f64; 3]) -> SectorOutputs {
    SectorOutputs {
        services: gdp * shares[0] / 100.0,
        commodities: gdp * shares[1] / 100.0,
        manufactures: gdp * shares[2] / 100.0,
    }
}

/// Random walk of the stored needs percentages, pulled back towards the
/// country's baseline needs and kept within their bounds.
pub fn drift_needs<R: Rng + ?Sized>(
    commodities_pct: f64,
    manufactures_pct: f64,
    baseline: &SectorBaseline,
    rng: &mut R,
) -> (f64, f64) {
    let mut c = commodities_pct + rng.gen_range(-NEEDS_DRIFT..=NEEDS_DRIFT);
    let mut m = manufactures_pct + rng.gen_range(-NEEDS_DRIFT..=NEEDS_DRIFT);
    c += (baseline.commodities_needs_pct - c) * SECTOR_BASELINE_PULL;
    m += (baseline.manufactures_needs_pct - m) * SECTOR_BASELINE_PULL;
    (
        c.clamp(MIN_COMMODITIES_NEEDS, MAX_COMMODITIES_NEEDS),
        m.clamp(MIN_MANUFACTURES_NEEDS, MAX_MANUFACTURES_NEEDS),
    )
}

/// Relative consumption change caused by employment, as
/// `(commodities, manufactures)` fractions.
///
/// Manufactures react fully, commodities at 60%.
pub fn employment_effect(unemployment: f64) -> (f64, f64) {
    let employment = 100.0 - unemployment;
    let deviation = employment - (100.0 - FULL_EMPLOYMENT_UNEMPLOYMENT);
    let effect = (deviation / FULL_EMPLOYMENT_UNEMPLOYMENT * MAX_EMPLOYMENT_EFFECT)
        .clamp(-MAX_EMPLOYMENT_EFFECT, MAX_EMPLOYMENT_EFFECT);
    (effect * 0.6, effect)
}

/// Share of consumption that moves from manufactures to commodities when
/// inflation runs above 8%.
pub fn inflation_shift(inflation: f64) -> f64 {
    if inflation <= 0.08 {
        return 0.0;
    }
    ((inflation - 0.08) * 0.5).min(0.05)
}

/// Effective needs percentages after employment and inflation effects.
pub fn effective_needs_pct(s: &CountryEconomicState) -> (f64, f64) {
    let (c_eff, m_eff) = employment_effect(s.unemployment);
    let mut c = s.commodities_needs_pct * (1.0 + c_eff);
    let mut m = s.manufactures_needs_pct * (1.0 + m_eff);
    let shift = inflation_shift(s.inflation);
    if shift > 0.0 {
        c *= 1.0 + shift;
        m *= 1.0 - shift;
    }
    (
        c.clamp(MIN_COMMODITIES_NEEDS, MAX_COMMODITIES_NEEDS),
        m.clamp(MIN_MANUFACTURES_NEEDS, MAX_MANUFACTURES_NEEDS),
    )
}

/// Imports and exports of `country` summed from the agreements it originates.
///
/// Only the origin half of each mirrored pair is counted, so a bilateral
/// agreement never contributes twice.
pub fn trade_impact(agreements: &[TradeAgreement], country: &CountryName) -> TradeStats {
    let mut stats = TradeStats::default();
    for a in agreements.iter().filter(|a| &a.origin_country == country) {
        if !a.value.is_finite() || a.value <= 0.0 {
            continue;
        }
        match (a.kind, a.product) {
            (TradeKind::Import, Product::Commodity) => stats.commodity_imports += a.value,
            (TradeKind::Export, Product::Commodity) => stats.commodity_exports += a.value,
            (TradeKind::Import, Product::Manufacture) => stats.manufacture_imports += a.value,
            (TradeKind::Export, Product::Manufacture) => stats.manufacture_exports += a.value,
        }
    }
    stats
}

/// Output plus imports minus exports minus needs.
pub fn sector_balance(output: f64, imports: f64, exports: f64, needs: f64) -> f64 {
    output + imports - exports - needs
}

/// Recompute outputs, needs and trade balances in place.
pub fn refresh_sectors(s: &mut CountryEconomicState, trade: TradeStats) {
    let outputs = sector_outputs(s.gdp, s.sector_shares());
    s.services_output = outputs.services;
    s.commodities_output = outputs.commodities;
    s.manufactures_output = outputs.manufactures;

    let (c_pct, m_pct) = effective_needs_pct(s);
    s.commodities_needs = s.gdp * c_pct / 100.0;
    s.manufactures_needs = s.gdp * m_pct / 100.0;

    s.commodities_balance = sector_balance(
        outputs.commodities,
        trade.commodity_imports,
        trade.commodity_exports,
        s.commodities_needs,
    );
    s.manufactures_balance = sector_balance(
        outputs.manufactures,
        trade.manufacture_imports,
        trade.manufacture_exports,
        s.manufactures_needs,
    );
    s.trade_stats = trade;
}

/// Slow random walk of the sector mix, pulled back towards its baseline.
pub fn drift_sector_mix<R: Rng + ?Sized>(
    shares: [f64; 3],
    baseline: &SectorBaseline,
    rng: &mut R,
) -> [f64; 3] {
    let mut walked = shares;
    for share in walked.iter_mut() {
        *share += rng.gen_range(-1i32..=1) as f64;
    }
    let walked = normalize_shares(walked);
    let base = [baseline.services, baseline.commodities, baseline.manufactures];
    let mut pulled = walked;
    for (share, target) in pulled.iter_mut().zip(base) {
        *share += (target - *share) * SECTOR_BASELINE_PULL;
    }
    normalize_shares(pulled)
}
