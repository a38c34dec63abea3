#![deny(warnings)]

//! Economic calculators for the geo-economy engine.
//!
//! This crate provides seeded, side-effect free utilities for:
//! - Macroeconomic indicators (growth, inflation, unemployment, popularity, rating)
//! - Sector outputs, domestic needs and trade balances
//! - Bond issuance, amortisation and emergency financing

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

pub mod debt;
pub mod indicators;
pub mod sectors;

pub use debt::{DebtSummary, EmergencyOutcome, PaymentSummary};
pub use indicators::FiscalFlow;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Voluntary issuance must raise a finite amount in `(0, 1000]`.
    #[error("bond amount must be in (0, 1000], got {0}")]
    InvalidBondAmount(f64),
    /// Issuance would push debt above 120% of GDP.
    #[error("issuance would raise debt to {:.1}% of GDP, above the 120% ceiling", .ratio * 100.0)]
    DebtCeiling { ratio: f64 },
    /// GDP must be strictly positive to price debt.
    #[error("gdp must be > 0")]
    NonPositiveGdp,
    /// Numeric conversion to decimal failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// Random source used by every stochastic calculator.
pub type EconRng = ChaCha8Rng;

/// Deterministic RNG for one room.
///
/// The engine seed is mixed with an FNV-1a hash of the room name so rooms
/// started from the same seed still evolve independently.
pub fn room_rng(seed: u64, room: &str) -> EconRng {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in room.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    ChaCha8Rng::seed_from_u64(seed ^ hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn room_rng_is_deterministic_per_room() {
        let a: u64 = room_rng(42, "alpha").gen();
        let b: u64 = room_rng(42, "alpha").gen();
        let c: u64 = room_rng(42, "beta").gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ceiling_error_message() {
        let e = EconError::DebtCeiling { ratio: 1.25 };
        assert_eq!(
            e.to_string(),
            "issuance would raise debt to 125.0% of GDP, above the 120% ceiling"
        );
    }
}
