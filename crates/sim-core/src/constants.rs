//! Named equilibrium values and bounds shared by every calculator.

/// Policy interest rate (%) at which rates neither stimulate nor cool the economy.
pub const EQUILIBRIUM_INTEREST_RATE: f64 = 8.0;
/// Interest rate (%) above which growth and inflation react convexly.
pub const HIGH_INTEREST_THRESHOLD: f64 = 10.0;
/// Tax burden (%) at equilibrium.
pub const EQUILIBRIUM_TAX_RATE: f64 = 40.0;
/// Annual inflation at equilibrium (0.04 = 4%).
pub const EQUILIBRIUM_INFLATION: f64 = 0.04;
/// Quarterly growth (as a fraction) considered neutral for inflation.
pub const EQUILIBRIUM_GROWTH: f64 = 0.02;
/// Public-services level (%) below which investment is penalised.
pub const PUBLIC_SERVICES_FLOOR: f64 = 30.0;
/// Public-services level (% of GDP) above which spending gets a convex penalty.
pub const PUBLIC_SERVICES_EXPENSE_THRESHOLD: f64 = 15.0;
/// Unemployment (%) the population considers acceptable.
pub const IDEAL_UNEMPLOYMENT: f64 = 15.0;
/// Popularity the approval rating reverts to.
pub const IDEAL_POPULARITY: f64 = 50.0;

/// Hard ceiling on public debt relative to GDP.
pub const MAX_DEBT_TO_GDP: f64 = 1.2;

pub const MIN_INFLATION: f64 = -0.02;
pub const MAX_INFLATION: f64 = 0.18;
pub const MIN_UNEMPLOYMENT: f64 = 3.0;
pub const MAX_UNEMPLOYMENT: f64 = 40.0;
pub const MIN_POPULARITY: f64 = 1.0;
pub const MAX_POPULARITY: f64 = 99.0;
/// Per-tick growth rate bounds (-8% .. +12%).
pub const MIN_GROWTH: f64 = -0.08;
pub const MAX_GROWTH: f64 = 0.12;

/// Weight of the previous value when blending a fresh inflation estimate.
pub const INFLATION_INERTIA: f64 = 0.8;
/// Weight of the previous value when blending a fresh unemployment estimate.
pub const UNEMPLOYMENT_INERTIA: f64 = 0.9;
/// Weight of the fresh popularity value against its moving average.
pub const POPULARITY_INERTIA: f64 = 0.7;
/// Damping applied to the summed growth effects.
pub const GROWTH_DAMPING: f64 = 0.061;

/// Capacity of every indicator history ring buffer.
pub const MAX_HISTORY_SIZE: usize = 20;

pub const MIN_SECTOR_PERCENT: f64 = 20.0;
pub const MAX_SECTOR_PERCENT: f64 = 50.0;
/// Fraction of the distance to the baseline mix recovered at each sector drift.
pub const SECTOR_BASELINE_PULL: f64 = 0.02;

pub const MIN_COMMODITIES_NEEDS: f64 = 15.0;
pub const MAX_COMMODITIES_NEEDS: f64 = 45.0;
pub const MIN_MANUFACTURES_NEEDS: f64 = 20.0;
pub const MAX_MANUFACTURES_NEEDS: f64 = 70.0;
/// Amplitude of the per-tick random drift applied to needs percentages.
pub const NEEDS_DRIFT: f64 = 0.2;

/// Share of taxed GDP that reaches the treasury each tick.
pub const REVENUE_FACTOR: f64 = 0.017;
/// Share of public-services spending charged to the treasury each tick.
pub const EXPENSE_FACTOR: f64 = 0.015;
/// Multiplier on spending above [`PUBLIC_SERVICES_EXPENSE_THRESHOLD`].
pub const EXCESS_EXPENSE_FACTOR: f64 = 2.0;

/// Number of monthly installments of every bond.
pub const DEBT_INSTALLMENTS: u32 = 120;
/// Largest amount a single voluntary issuance may raise.
pub const MAX_BOND_ISSUE: f64 = 1000.0;
/// Minimum multiplier applied to a shortfall covered by emergency bonds.
pub const EMERGENCY_PENALTY_FACTOR: f64 = 1.2;

/// Largest change a single player action may apply to each policy lever.
pub const MAX_INTEREST_RATE_STEP: f64 = 2.0;
pub const MAX_TAX_BURDEN_STEP: f64 = 5.0;
pub const MAX_PUBLIC_SERVICES_STEP: f64 = 5.0;

/// Absolute policy ranges accepted from players.
pub const MAX_INTEREST_RATE: f64 = 25.0;
pub const MAX_TAX_BURDEN: f64 = 60.0;
pub const MAX_PUBLIC_SERVICES: f64 = 60.0;

/// Tolerance used when comparing monetary balances against zero.
pub const MONEY_EPSILON: f64 = 0.01;
