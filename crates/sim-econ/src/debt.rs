//! Sovereign bond issuance, amortisation and emergency financing.
//!
//! Every bond is a 120-installment annuity. A contract tracks the scheduled
//! amount still owed (`remaining_value`, principal plus interest) and the
//! principal part of it (`outstanding_principal`); public debt moves with the
//! principal only.

use crate::EconError;
use chrono::{DateTime, Months, Utc};
use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use sim_core::constants::*;
use sim_core::{CountryEconomicState, CreditRating, DebtContract};
use tracing::debug;

/// Random spread added to voluntary issuance rates, in percentage points.
const RATE_JITTER: f64 = 0.1;
/// Debt-to-GDP ratio above which lenders charge a surcharge.
const SURCHARGE_THRESHOLD: f64 = 0.6;
/// Debt-to-GDP ratio above which emergency issuance is scaled up further.
const EMERGENCY_SCALE_THRESHOLD: f64 = 0.8;

/// Fixed monthly installment of an annuity.
///
/// `annual_rate` is in percent. A zero rate repays the principal in equal
/// parts.
pub fn monthly_payment(principal: f64, annual_rate: f64, installments: u32) -> f64 {
    if installments == 0 {
        return principal;
    }
    let n = f64::from(installments);
    let r = annual_rate / 100.0 / 12.0;
    if r.abs() < f64::EPSILON {
        return principal / n;
    }
    let growth = (1.0 + r).powf(n);
    principal * r * growth / (growth - 1.0)
}

/// Principal still owed after `paid` installments of an annuity.
pub fn outstanding_after(principal: f64, annual_rate: f64, installments: u32, paid: u32) -> f64 {
    let n = f64::from(installments);
    let k = f64::from(paid.min(installments));
    let r = annual_rate / 100.0 / 12.0;
    if r.abs() < f64::EPSILON {
        return principal * (n - k) / n;
    }
    let gn = (1.0 + r).powf(n);
    let gk = (1.0 + r).powf(k);
    principal * (gn - gk) / (gn - 1.0)
}

/// Annual rate (percent) lenders demand from a country.
///
/// Policy rate plus the rating premium, plus a surcharge once debt exceeds
/// 60% of GDP (steeper for emergency issuance).
pub fn effective_rate(
    policy_rate: f64,
    rating: CreditRating,
    debt_to_gdp: f64,
    emergency: bool,
) -> f64 {
    let surcharge = if debt_to_gdp > SURCHARGE_THRESHOLD {
        let slope = if emergency { 25.0 } else { 20.0 };
        (debt_to_gdp - SURCHARGE_THRESHOLD) * slope
    } else {
        0.0
    };
    policy_rate + rating.risk_premium(emergency) + surcharge
}

/// Whether `debt` stays within the ceiling for `gdp`.
pub fn within_ceiling(debt: f64, gdp: f64) -> bool {
    gdp > 0.0 && debt / gdp <= MAX_DEBT_TO_GDP + 1e-9
}

/// Build a fresh 120-installment contract.
pub fn new_contract(
    id: u64,
    amount: f64,
    rate: f64,
    emergency: bool,
    issue_date: DateTime<Utc>,
) -> DebtContract {
    let payment = monthly_payment(amount, rate, DEBT_INSTALLMENTS);
    DebtContract {
        id,
        original_value: amount,
        remaining_value: payment * f64::from(DEBT_INSTALLMENTS),
        outstanding_principal: amount,
        interest_rate: rate,
        monthly_payment: payment,
        remaining_installments: DEBT_INSTALLMENTS,
        issue_date,
        emergency,
    }
}

/// Voluntary bond issuance.
///
/// Amounts outside `(0, 1000]` are rejected before the ceiling is checked.
/// On success the proceeds land in the treasury and the principal is added
/// to public debt.
pub fn issue_bonds<R: Rng + ?Sized>(
    state: &mut CountryEconomicState,
    amount: f64,
    id: u64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<DebtContract, EconError> {
    if !amount.is_finite() || amount <= 0.0 || amount > MAX_BOND_ISSUE {
        return Err(EconError::InvalidBondAmount(amount));
    }
    if state.gdp <= 0.0 {
        return Err(EconError::NonPositiveGdp);
    }
    let projected = state.public_debt + amount;
    if !within_ceiling(projected, state.gdp) {
        return Err(EconError::DebtCeiling {
            ratio: projected / state.gdp,
        });
    }

    let base = effective_rate(
        state.interest_rate,
        state.credit_rating,
        state.debt_to_gdp(),
        false,
    );
    let rate = (base + rng.gen_range(-RATE_JITTER..=RATE_JITTER)).max(0.0);
    let contract = new_contract(id, amount, rate, false, now);

    state.treasury += amount;
    state.public_debt = projected;
    state.debt_ceiling_locked = false;
    debug!(id, amount, rate, "bonds issued");
    Ok(contract)
}

/// Totals of one amortisation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PaymentSummary {
    pub total_paid: f64,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub contracts_closed: usize,
}

/// Pay one installment (scaled by `cycle_factor`) on every active contract.
///
/// Closed contracts are removed from `contracts`. An installment is only
/// consumed for a full cycle; partial cycles pay pro-rata without advancing
/// the schedule.
pub fn process_payments(contracts: &mut Vec<DebtContract>, cycle_factor: f64) -> PaymentSummary {
    let mut summary = PaymentSummary::default();
    for c in contracts.iter_mut().filter(|c| c.remaining_installments > 0) {
        let payment = (c.monthly_payment * cycle_factor).min(c.remaining_value).max(0.0);
        let interest = (c.outstanding_principal * c.monthly_rate() * cycle_factor)
            .min(payment)
            .max(0.0);
        let mut principal = (payment - interest).min(c.outstanding_principal);

        c.remaining_value = (c.remaining_value - payment).max(0.0);
        c.outstanding_principal = (c.outstanding_principal - principal).max(0.0);
        if cycle_factor >= 1.0 {
            c.remaining_installments -= 1;
        }

        if c.remaining_value <= MONEY_EPSILON || c.remaining_installments == 0 {
            principal += c.outstanding_principal;
            c.remaining_value = 0.0;
            c.outstanding_principal = 0.0;
            c.remaining_installments = 0;
            summary.contracts_closed += 1;
        }

        summary.total_paid += payment;
        summary.interest_paid += interest;
        summary.principal_paid += principal;
    }
    contracts.retain(DebtContract::is_active);
    summary
}

/// Principal-weighted mean coupon of the active contracts.
pub fn weighted_average_rate(contracts: &[DebtContract]) -> Option<f64> {
    let total: f64 = contracts.iter().map(|c| c.outstanding_principal).sum();
    if total <= 0.0 {
        return None;
    }
    let weighted: f64 = contracts
        .iter()
        .map(|c| c.outstanding_principal * c.interest_rate)
        .sum();
    Some(weighted / total)
}

/// Multiplier applied to a shortfall when sizing emergency bonds.
pub fn emergency_factor(contracts: &[DebtContract], policy_rate: f64, debt_to_gdp: f64) -> f64 {
    let average = weighted_average_rate(contracts).unwrap_or(policy_rate);
    let mut factor = 1.0 + ((average - EQUILIBRIUM_INTEREST_RATE) / 16.0).max(0.0);
    if debt_to_gdp > EMERGENCY_SCALE_THRESHOLD {
        factor *= 1.0 + (debt_to_gdp - EMERGENCY_SCALE_THRESHOLD) * 0.5;
    }
    factor.max(EMERGENCY_PENALTY_FACTOR)
}

/// Result of covering a negative treasury.
#[derive(Clone, Debug, PartialEq)]
pub enum EmergencyOutcome {
    /// Treasury was not negative.
    NotNeeded,
    /// Bonds were issued; `at_limit` when capped by the debt ceiling.
    Issued {
        contract: DebtContract,
        at_limit: bool,
    },
    /// Not even the shortfall fits under the ceiling; treasury floored at zero.
    CeilingLocked { shortfall: f64 },
}

/// Cover a negative treasury with emergency bonds.
///
/// The shortfall is scaled by [`emergency_factor`]. When the scaled amount
/// breaches the ceiling but the remaining headroom still covers the raw
/// shortfall, the headroom is issued instead. Otherwise the country is
/// locked out of the market and its treasury floored at zero.
pub fn cover_shortfall(
    state: &mut CountryEconomicState,
    contracts: &[DebtContract],
    id: u64,
    now: DateTime<Utc>,
) -> EmergencyOutcome {
    if state.treasury >= 0.0 {
        return EmergencyOutcome::NotNeeded;
    }
    let shortfall = -state.treasury;
    let debt_ratio = state.debt_to_gdp();
    let amount = shortfall * emergency_factor(contracts, state.interest_rate, debt_ratio);

    let (amount, at_limit) = if within_ceiling(state.public_debt + amount, state.gdp) {
        (amount, false)
    } else {
        let headroom = (MAX_DEBT_TO_GDP * state.gdp - state.public_debt).max(0.0);
        if headroom >= shortfall {
            (headroom, true)
        } else {
            state.treasury = 0.0;
            state.debt_ceiling_locked = true;
            return EmergencyOutcome::CeilingLocked { shortfall };
        }
    };

    let rate = effective_rate(state.interest_rate, state.credit_rating, debt_ratio, true);
    let contract = new_contract(id, amount, rate, true, now);
    state.treasury += amount;
    state.public_debt += amount;
    state.debt_ceiling_locked = false;
    debug!(id, amount, rate, at_limit, "emergency bonds issued");
    EmergencyOutcome::Issued { contract, at_limit }
}

/// Split of a pre-existing debt stock into seasoned contracts.
const LEGACY_TRANCHES: [(f64, u32, f64); 4] = [
    (0.4, 24, -1.0),
    (0.3, 12, 0.0),
    (0.2, 6, 0.0),
    (0.1, 0, 1.5),
];

/// Contracts representing the debt a country starts the game with.
///
/// Each tranche is dated `age` months in the past; its original principal is
/// chosen so that the principal still outstanding today matches the tranche
/// share of `public_debt`.
pub fn seed_initial_contracts(
    public_debt: f64,
    policy_rate: f64,
    first_id: u64,
    now: DateTime<Utc>,
) -> Vec<DebtContract> {
    if public_debt <= MONEY_EPSILON {
        return Vec::new();
    }
    LEGACY_TRANCHES
        .iter()
        .zip(first_id..)
        .map(|(&(share, age, spread), id)| {
            let rate = (policy_rate + spread).max(0.0);
            let outstanding = public_debt * share;
            let ratio = outstanding_after(1.0, rate, DEBT_INSTALLMENTS, age);
            let original = if ratio > 0.0 { outstanding / ratio } else { outstanding };
            let payment = monthly_payment(original, rate, DEBT_INSTALLMENTS);
            let remaining = DEBT_INSTALLMENTS - age;
            DebtContract {
                id,
                original_value: original,
                remaining_value: payment * f64::from(remaining),
                outstanding_principal: outstanding,
                interest_rate: rate,
                monthly_payment: payment,
                remaining_installments: remaining,
                issue_date: now.checked_sub_months(Months::new(age)).unwrap_or(now),
                emergency: false,
            }
        })
        .collect()
}

/// Debt overview returned to clients, money rounded to cents.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtSummary {
    pub treasury: Decimal,
    pub gdp: Decimal,
    pub public_debt: Decimal,
    pub principal_remaining: Decimal,
    pub total_future_payments: Decimal,
    pub monthly_payment: Decimal,
    pub average_interest_rate: Decimal,
    pub debt_to_gdp_ratio: Decimal,
    pub number_of_contracts: usize,
    pub contracts: Vec<DebtContract>,
}

fn cents(value: f64) -> Result<Decimal, EconError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .ok_or(EconError::NonFinite)
}

/// Summarise a country's debt book.
pub fn debt_summary(
    state: &CountryEconomicState,
    contracts: &[DebtContract],
) -> Result<DebtSummary, EconError> {
    let principal: f64 = contracts.iter().map(|c| c.outstanding_principal).sum();
    let future: f64 = contracts.iter().map(|c| c.remaining_value).sum();
    let monthly: f64 = contracts.iter().map(|c| c.monthly_payment).sum();
    let average = weighted_average_rate(contracts).unwrap_or(0.0);
    Ok(DebtSummary {
        treasury: cents(state.treasury)?,
        gdp: cents(state.gdp)?,
        public_debt: cents(state.public_debt)?,
        principal_remaining: cents(principal)?,
        total_future_payments: cents(future)?,
        monthly_payment: cents(monthly)?,
        average_interest_rate: cents(average)?,
        debt_to_gdp_ratio: cents(state.debt_to_gdp() * 100.0)?,
        number_of_contracts: contracts.len(),
        contracts: contracts.to_vec(),
    })
}

impl DebtSummary {
    /// Monthly debt service as a float, for quick comparisons.
    pub fn monthly_payment_f64(&self) -> f64 {
        self.monthly_payment.to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::CountryDefinition;

    fn state() -> CountryEconomicState {
        CountryDefinition::default().seed_state()
    }

    #[test]
    fn annuity_formula() {
        let p = monthly_payment(100.0, 12.0, 120);
        // 100 * 0.01 * 1.01^120 / (1.01^120 - 1)
        assert!((p - 1.4347).abs() < 1e-3, "payment {p}");
        assert!((monthly_payment(120.0, 0.0, 120) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn contract_amortises_to_zero() {
        let mut book = vec![new_contract(1, 100.0, 9.0, false, Utc::now())];
        let mut principal = 0.0;
        let mut interest = 0.0;
        for month in 0..DEBT_INSTALLMENTS {
            assert_eq!(book.len(), 1, "closed early at month {month}");
            assert!(book[0].is_active());
            let s = process_payments(&mut book, 1.0);
            principal += s.principal_paid;
            interest += s.interest_paid;
        }
        assert!(book.is_empty());
        assert!((principal - 100.0).abs() < 1e-6, "principal {principal}");
        assert!(interest > 0.0);
    }

    #[test]
    fn partial_cycle_does_not_consume_installment() {
        let mut book = vec![new_contract(1, 100.0, 9.0, false, Utc::now())];
        let s = process_payments(&mut book, 0.5);
        assert_eq!(book[0].remaining_installments, DEBT_INSTALLMENTS);
        assert!((s.total_paid - book[0].monthly_payment * 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_oversized_issue() {
        let mut s = state();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let before = s.clone();
        let err = issue_bonds(&mut s, 2000.0, 1, Utc::now(), &mut rng).unwrap_err();
        assert_eq!(err, EconError::InvalidBondAmount(2000.0));
        assert_eq!(s, before);
        assert!(issue_bonds(&mut s, 0.0, 1, Utc::now(), &mut rng).is_err());
    }

    #[test]
    fn rejects_issue_over_ceiling() {
        let mut s = state();
        s.public_debt = 110.0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            issue_bonds(&mut s, 20.0, 1, Utc::now(), &mut rng),
            Err(EconError::DebtCeiling { .. })
        ));
        assert_eq!(s.public_debt, 110.0);
    }

    #[test]
    fn issue_credits_treasury_and_debt() {
        let mut s = state();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let c = issue_bonds(&mut s, 20.0, 7, Utc::now(), &mut rng).unwrap();
        assert_eq!(s.treasury, 30.0);
        assert_eq!(s.public_debt, 20.0);
        assert_eq!(c.id, 7);
        assert_eq!(c.remaining_installments, DEBT_INSTALLMENTS);
        // policy 8 + A premium 1, no surcharge, ±0.1 jitter
        assert!((c.interest_rate - 9.0).abs() <= 0.1 + 1e-12);
    }

    #[test]
    fn rate_surcharge_above_sixty_percent() {
        assert_eq!(effective_rate(8.0, CreditRating::A, 0.5, false), 9.0);
        assert!((effective_rate(8.0, CreditRating::A, 0.8, false) - 13.0).abs() < 1e-9);
        assert!((effective_rate(8.0, CreditRating::A, 0.8, true) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn emergency_scenario() {
        let mut s = state();
        s.treasury = -15.0;
        let outcome = cover_shortfall(&mut s, &[], 1, Utc::now());
        match outcome {
            EmergencyOutcome::Issued { contract, at_limit } => {
                assert!(!at_limit);
                assert!(contract.emergency);
                assert!((contract.original_value - 18.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!((s.treasury - 3.0).abs() < 1e-9);
        assert!((s.public_debt - 18.0).abs() < 1e-9);
    }

    #[test]
    fn emergency_capped_at_headroom() {
        let mut s = state();
        s.public_debt = 103.0;
        s.treasury = -15.0;
        match cover_shortfall(&mut s, &[], 1, Utc::now()) {
            EmergencyOutcome::Issued { contract, at_limit } => {
                assert!(at_limit);
                assert!((contract.original_value - 17.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!((s.public_debt - 120.0).abs() < 1e-9);
        assert!(s.treasury >= 0.0);
    }

    #[test]
    fn emergency_locks_when_ceiling_reached() {
        let mut s = state();
        s.public_debt = 118.0;
        s.treasury = -5.0;
        let outcome = cover_shortfall(&mut s, &[], 1, Utc::now());
        assert_eq!(outcome, EmergencyOutcome::CeilingLocked { shortfall: 5.0 });
        assert_eq!(s.treasury, 0.0);
        assert!(s.debt_ceiling_locked);
        assert_eq!(s.public_debt, 118.0);
    }

    #[test]
    fn emergency_factor_grows_with_rates_and_debt() {
        assert_eq!(emergency_factor(&[], 8.0, 0.2), EMERGENCY_PENALTY_FACTOR);
        let pricey = new_contract(1, 50.0, 24.0, false, Utc::now());
        assert!((emergency_factor(&[pricey], 8.0, 0.2) - 2.0).abs() < 1e-9);
        assert!(emergency_factor(&[], 16.0, 1.0) > 1.5);
    }

    #[test]
    fn legacy_contracts_match_debt_stock() {
        let now = Utc::now();
        let book = seed_initial_contracts(60.0, 8.0, 1, now);
        assert_eq!(book.len(), 4);
        let principal: f64 = book.iter().map(|c| c.outstanding_principal).sum();
        assert!((principal - 60.0).abs() < 1e-9);
        assert_eq!(book[0].remaining_installments, 96);
        assert_eq!(book[0].interest_rate, 7.0);
        assert_eq!(book[3].interest_rate, 9.5);
        assert!(book[0].original_value > book[0].outstanding_principal);
        assert!(seed_initial_contracts(0.0, 8.0, 1, now).is_empty());
    }

    #[test]
    fn summary_rounds_to_cents() {
        let mut s = state();
        s.public_debt = 33.333_333;
        let book = seed_initial_contracts(33.333_333, 8.0, 1, Utc::now());
        let summary = debt_summary(&s, &book).unwrap();
        assert_eq!(summary.public_debt, Decimal::new(3333, 2));
        assert_eq!(summary.gdp, Decimal::new(100, 0));
        assert_eq!(summary.number_of_contracts, 4);
        assert!(summary.monthly_payment_f64() > 0.0);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("debtToGdpRatio").is_some());
    }

    proptest! {
        #[test]
        fn legacy_book_amortises_fully(debt in 1.0f64..500.0, rate in 0.0f64..20.0) {
            let mut book = seed_initial_contracts(debt, rate, 1, Utc::now());
            let mut principal = 0.0;
            for _ in 0..DEBT_INSTALLMENTS {
                principal += process_payments(&mut book, 1.0).principal_paid;
            }
            prop_assert!(book.is_empty());
            prop_assert!((principal - debt).abs() < 1e-6 * debt.max(1.0));
        }
    }
}
