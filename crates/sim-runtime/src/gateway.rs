//! Player-facing operations: policy levers, bond issuance, debt overview.

use crate::{EconomyService, EngineEvent, RuntimeError, StepContext};
use chrono::Utc;
use serde::Serialize;
use sim_core::{CountryEconomicState, CountryName, DebtContract, PolicyLever, RoomName};
use sim_econ::DebtSummary;
use tracing::info;

/// Result of a bond request as shown to the player.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondIssueResponse {
    pub success: bool,
    pub message: String,
    pub effective_rate: Option<f64>,
    pub new_contract: Option<DebtContract>,
}

/// Check a requested lever value against its absolute range and the
/// largest change allowed per action.
pub fn check_policy_change(lever: PolicyLever, current: f64, value: f64) -> Result<(), RuntimeError> {
    let reject = |reason: String| Err(RuntimeError::InvalidParameter { lever, reason });
    if !value.is_finite() {
        return reject("value must be a finite number".into());
    }
    let (min, max) = lever.range();
    if value < min || value > max {
        return reject(format!("must be within [{min}, {max}], got {value}"));
    }
    let step = lever.max_step();
    if (value - current).abs() > step + 1e-9 {
        return reject(format!(
            "may change by at most {step} per action ({current} -> {value})"
        ));
    }
    Ok(())
}

impl EconomyService {
    /// Set a policy lever and recompute the country at once.
    ///
    /// The new state is published to the room; background ticks continue on
    /// their own schedule.
    pub async fn update_parameter(
        &self,
        room: &RoomName,
        country: &CountryName,
        lever: PolicyLever,
        value: f64,
    ) -> Result<CountryEconomicState, RuntimeError> {
        let shared = self.inner.store.get(room).await?;
        let agreements = self.inner.collaborators.agreements.trade_agreements(room);
        let now = Utc::now();
        let ctx = StepContext {
            config: &self.inner.config,
            agreements: &agreements,
            now,
        };

        let (state, states) = {
            let mut economy = shared.lock().await;
            let current = economy.state(country)?.lever(lever);
            check_policy_change(lever, current, value)?;
            let state = economy.apply_policy(country, lever, value, &ctx)?.clone();
            (state, economy.states.clone())
        };
        info!(%room, %country, %lever, value, "policy updated");
        self.inner
            .collaborators
            .transport
            .publish(EngineEvent::StatesUpdated {
                room_name: room.clone(),
                states,
                timestamp: now,
            });
        Ok(state)
    }

    /// Voluntary bond issuance.
    ///
    /// Invalid amounts and ceiling breaches come back as an unsuccessful
    /// response with the reason; only a missing room or country is an error.
    pub async fn issue_debt_bonds(
        &self,
        room: &RoomName,
        country: &CountryName,
        amount: f64,
    ) -> Result<BondIssueResponse, RuntimeError> {
        let shared = self.inner.store.get(room).await?;
        let mut economy = shared.lock().await;
        match economy.issue_bonds(country, amount, Utc::now()) {
            Ok(contract) => {
                info!(%room, %country, amount, rate = contract.interest_rate, "bonds issued");
                Ok(BondIssueResponse {
                    success: true,
                    message: format!(
                        "issued {amount:.2} in bonds at {:.2}% over {} months",
                        contract.interest_rate, contract.remaining_installments
                    ),
                    effective_rate: Some(contract.interest_rate),
                    new_contract: Some(contract),
                })
            }
            Err(e) if e.is_not_found() => Err(e),
            Err(e) => Ok(BondIssueResponse {
                success: false,
                message: e.to_string(),
                effective_rate: None,
                new_contract: None,
            }),
        }
    }

    /// Debt book overview with money rounded to cents.
    pub async fn debt_summary(
        &self,
        room: &RoomName,
        country: &CountryName,
    ) -> Result<DebtSummary, RuntimeError> {
        let shared = self.inner.store.get(room).await?;
        let economy = shared.lock().await;
        let state = economy.state(country)?;
        Ok(sim_econ::debt::debt_summary(state, economy.contracts(country))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_step_limits() {
        assert!(check_policy_change(PolicyLever::InterestRate, 8.0, 10.0).is_ok());
        assert!(check_policy_change(PolicyLever::InterestRate, 8.0, 10.5).is_err());
        assert!(check_policy_change(PolicyLever::TaxBurden, 40.0, 45.0).is_ok());
        assert!(check_policy_change(PolicyLever::PublicServices, 30.0, 24.0).is_err());
    }

    #[test]
    fn policy_absolute_range() {
        assert!(check_policy_change(PolicyLever::InterestRate, 1.0, -0.5).is_err());
        assert!(check_policy_change(PolicyLever::TaxBurden, 58.0, 62.0).is_err());
        let err = check_policy_change(PolicyLever::TaxBurden, 40.0, f64::NAN).unwrap_err();
        assert!(err.to_string().starts_with("invalid taxBurden"));
    }
}
