use crate::constants::MONEY_EPSILON;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An amortising sovereign bond.
///
/// `remaining_value` holds what is still owed under the schedule, principal
/// plus future interest; `outstanding_principal` is the principal part of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtContract {
    pub id: u64,
    pub original_value: f64,
    pub remaining_value: f64,
    pub outstanding_principal: f64,
    /// Annual coupon in percent.
    pub interest_rate: f64,
    pub monthly_payment: f64,
    pub remaining_installments: u32,
    pub issue_date: DateTime<Utc>,
    pub emergency: bool,
}

impl DebtContract {
    /// Monthly coupon as a fraction.
    pub fn monthly_rate(&self) -> f64 {
        self.interest_rate / 100.0 / 12.0
    }

    /// Whether the contract still has payments due.
    pub fn is_active(&self) -> bool {
        self.remaining_installments > 0 && self.remaining_value > MONEY_EPSILON
    }
}
