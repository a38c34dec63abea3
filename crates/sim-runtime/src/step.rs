//! One country's tick: the fixed calculator pipeline.
//!
//! The pipeline runs on copies of the state and debt book and returns them
//! only when the result validates, so a failing country never leaves a
//! half-updated state behind.

use crate::error::RuntimeError;
use chrono::{DateTime, Utc};
use sim_core::{
    validate_country_state, CountryEconomicState, CountryName, CreditRating, DebtContract,
    EngineConfig, TradeAgreement,
};
use sim_econ::debt::{self, EmergencyOutcome};
use sim_econ::{indicators, sectors, EconRng, PaymentSummary};
use tracing::{debug, warn};

/// Which parts of the pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepMode {
    /// Regular master tick: fiscal flow, growth, sub-cycles.
    Scheduled,
    /// Out-of-band refresh after a policy change. Recomputes indicators,
    /// rating and sectors without advancing time.
    Immediate,
}

/// Debt-ledger side effects of a step, turned into player notifications.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerEvent {
    Payments {
        summary: PaymentSummary,
        active_contracts: usize,
        total_remaining: f64,
        cycle: u64,
    },
    EmergencyIssued {
        amount: f64,
        rate: f64,
        rating: CreditRating,
        at_limit: bool,
    },
    CeilingLocked {
        shortfall: f64,
    },
}

/// Inputs shared by every country of a room during one tick.
pub struct StepContext<'a> {
    pub config: &'a EngineConfig,
    pub agreements: &'a [TradeAgreement],
    pub now: DateTime<Utc>,
}

/// Committed output of a successful step.
#[derive(Clone, Debug)]
pub struct CountryStep {
    pub state: CountryEconomicState,
    pub debts: Vec<DebtContract>,
    pub next_debt_id: u64,
    pub events: Vec<LedgerEvent>,
}

struct Draft {
    state: CountryEconomicState,
    debts: Vec<DebtContract>,
    next_debt_id: u64,
    events: Vec<LedgerEvent>,
}

impl Draft {
    fn cover_shortfall(&mut self, country: &CountryName, now: DateTime<Utc>) {
        match debt::cover_shortfall(&mut self.state, &self.debts, self.next_debt_id, now) {
            EmergencyOutcome::NotNeeded => {
                if self.state.debt_ceiling_locked && self.state.treasury > 0.0 {
                    self.state.debt_ceiling_locked = false;
                }
            }
            EmergencyOutcome::Issued { contract, at_limit } => {
                warn!(%country, amount = contract.original_value, rate = contract.interest_rate, at_limit, "emergency bonds issued");
                self.events.push(LedgerEvent::EmergencyIssued {
                    amount: contract.original_value,
                    rate: contract.interest_rate,
                    rating: self.state.credit_rating,
                    at_limit,
                });
                self.next_debt_id += 1;
                self.debts.push(contract);
            }
            EmergencyOutcome::CeilingLocked { shortfall } => {
                warn!(%country, shortfall, "debt ceiling reached, treasury floored at zero");
                self.events.push(LedgerEvent::CeilingLocked { shortfall });
            }
        }
    }

    fn pay_debts(&mut self) {
        if self.debts.is_empty() {
            return;
        }
        let summary = debt::process_payments(&mut self.debts, 1.0);
        self.state.treasury -= summary.total_paid;
        self.state.public_debt = (self.state.public_debt - summary.principal_paid).max(0.0);
        self.events.push(LedgerEvent::Payments {
            summary,
            active_contracts: self.debts.len(),
            total_remaining: self.debts.iter().map(|c| c.remaining_value).sum(),
            cycle: self.state.cycle_count,
        });
    }
}

/// Advance one country.
///
/// Order: fiscal flow and emergency cover, growth, indicators, rating,
/// inflation drag, needs and sector drift, trade balances, monthly debt
/// service, quarterly growth. [`StepMode::Immediate`] keeps only the
/// indicator, rating and sector stages.
pub fn step_country(
    country: &CountryName,
    state: &CountryEconomicState,
    debts: &[DebtContract],
    next_debt_id: u64,
    ctx: &StepContext<'_>,
    mode: StepMode,
    rng: &mut EconRng,
) -> Result<CountryStep, RuntimeError> {
    let scheduled = mode == StepMode::Scheduled;
    let mut d = Draft {
        state: state.clone(),
        debts: debts.to_vec(),
        next_debt_id,
        events: Vec::new(),
    };

    if scheduled {
        d.state.cycle_count += 1;
        let flow = indicators::fiscal_flow(&d.state);
        d.state.treasury += flow.net();
        d.cover_shortfall(country, ctx.now);

        let growth = indicators::growth_rate(&d.state, rng);
        d.state.gdp *= 1.0 + growth;
    }

    d.state.inflation = indicators::inflation(&d.state, rng);
    d.state.unemployment = indicators::unemployment(&d.state);
    d.state.popularity = indicators::popularity(&d.state, rng);
    d.state.credit_rating = indicators::credit_rating(&d.state);

    let cycle = d.state.cycle_count;
    if scheduled {
        d.state.gdp *= indicators::inflation_gdp_drag(d.state.inflation);

        if ctx.config.needs_drift {
            let (c, m) = sectors::drift_needs(
                d.state.commodities_needs_pct,
                d.state.manufactures_needs_pct,
                &d.state.baseline,
                rng,
            );
            d.state.commodities_needs_pct = c;
            d.state.manufactures_needs_pct = m;
        }
        if ctx.config.is_sector_drift_boundary(cycle) {
            let shares = sectors::drift_sector_mix(d.state.sector_shares(), &d.state.baseline, rng);
            d.state.set_sector_shares(shares);
        }
    }

    let trade = sectors::trade_impact(ctx.agreements, country);
    sectors::refresh_sectors(&mut d.state, trade);

    if scheduled && ctx.config.is_monthly_boundary(cycle) {
        d.pay_debts();
        d.cover_shortfall(country, ctx.now);
        d.state.record_history();
    }

    if scheduled && ctx.config.is_quarterly_boundary(cycle) {
        d.state.gdp_growth = indicators::quarterly_growth_pct(d.state.gdp, d.state.last_quarter_gdp);
        d.state.last_quarter_gdp = d.state.gdp;
        debug!(%country, cycle, growth = d.state.gdp_growth, "quarter closed");
    }

    validate_country_state(&d.state)?;
    Ok(CountryStep {
        state: d.state,
        debts: d.debts,
        next_debt_id: d.next_debt_id,
        events: d.events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::CountryDefinition;
    use sim_econ::room_rng;

    fn run(
        state: &CountryEconomicState,
        debts: &[DebtContract],
        config: &EngineConfig,
        mode: StepMode,
        rng: &mut EconRng,
    ) -> CountryStep {
        let ctx = StepContext {
            config,
            agreements: &[],
            now: Utc::now(),
        };
        step_country(&"X".into(), state, debts, 1, &ctx, mode, rng).unwrap()
    }

    #[test]
    fn scheduled_step_advances_cycle() {
        let cfg = EngineConfig::default();
        let s = CountryDefinition::default().seed_state();
        let mut rng = room_rng(1, "r");
        let out = run(&s, &[], &cfg, StepMode::Scheduled, &mut rng);
        assert_eq!(out.state.cycle_count, 1);
        assert!(out.state.gdp > s.gdp);
        assert!(out.events.is_empty());
    }

    #[test]
    fn immediate_step_keeps_clock_and_treasury() {
        let cfg = EngineConfig::default();
        let s = CountryDefinition::default().seed_state();
        let mut rng = room_rng(1, "r");
        let out = run(&s, &[], &cfg, StepMode::Immediate, &mut rng);
        assert_eq!(out.state.cycle_count, 0);
        assert_eq!(out.state.treasury, s.treasury);
        assert_eq!(out.state.gdp, s.gdp);
    }

    #[test]
    fn monthly_boundary_services_debt() {
        let cfg = EngineConfig::default();
        let mut s = CountryDefinition {
            public_debt: Some(40.0),
            ..Default::default()
        }
        .seed_state();
        s.cycle_count = cfg.monthly_period - 1;
        let book = debt::seed_initial_contracts(40.0, 8.0, 1, Utc::now());
        let mut rng = room_rng(1, "r");
        let out = run(&s, &book, &cfg, StepMode::Scheduled, &mut rng);
        assert!(out.state.public_debt < 40.0);
        assert_eq!(out.state.history.gdp.len(), 2);
        assert!(matches!(out.events[0], LedgerEvent::Payments { cycle: 60, .. }));
    }

    #[test]
    fn quarterly_boundary_recomputes_growth() {
        let cfg = EngineConfig::default();
        let mut s = CountryDefinition::default().seed_state();
        s.cycle_count = cfg.quarterly_period - 1;
        s.last_quarter_gdp = 95.0;
        let mut rng = room_rng(1, "r");
        let out = run(&s, &[], &cfg, StepMode::Scheduled, &mut rng);
        assert!(out.state.gdp_growth > 5.0);
        assert_eq!(out.state.last_quarter_gdp, out.state.gdp);
    }

    #[test]
    fn invalid_result_is_rejected() {
        let cfg = EngineConfig::default();
        let mut s = CountryDefinition::default().seed_state();
        s.treasury = f64::NAN;
        let mut rng = room_rng(1, "r");
        let ctx = StepContext {
            config: &cfg,
            agreements: &[],
            now: Utc::now(),
        };
        let err = step_country(&"X".into(), &s, &[], 1, &ctx, StepMode::Immediate, &mut rng);
        assert!(matches!(err, Err(RuntimeError::Validation(_))));
    }
}
