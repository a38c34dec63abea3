use serde::{Deserialize, Serialize};
use std::fmt;

/// Sovereign credit rating, best (`AAA`) to worst (`D`).
///
/// The derived ordering follows the declaration order, so `AAA < D`
/// means "AAA is a better grade than D".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CreditRating {
    AAA,
    AA,
    #[default]
    A,
    BBB,
    BB,
    B,
    CCC,
    CC,
    C,
    D,
}

impl CreditRating {
    /// Every grade in order from best to worst.
    pub const LEVELS: [CreditRating; 10] = [
        CreditRating::AAA,
        CreditRating::AA,
        CreditRating::A,
        CreditRating::BBB,
        CreditRating::BB,
        CreditRating::B,
        CreditRating::CCC,
        CreditRating::CC,
        CreditRating::C,
        CreditRating::D,
    ];

    /// Position in [`Self::LEVELS`]; 0 is the best grade.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Grade at `index`, saturating at `D`.
    pub fn from_index(index: usize) -> Self {
        Self::LEVELS[index.min(Self::LEVELS.len() - 1)]
    }

    /// Grade moved `notches` steps towards `D`.
    pub fn downgrade(self, notches: usize) -> Self {
        Self::from_index(self.index().saturating_add(notches))
    }

    /// Coupon markup (percentage points) lenders demand for this grade.
    pub fn risk_premium(self, emergency: bool) -> f64 {
        let (regular, urgent) = match self {
            CreditRating::AAA => (0.0, 1.0),
            CreditRating::AA => (0.5, 2.0),
            CreditRating::A => (1.0, 3.0),
            CreditRating::BBB => (2.0, 5.0),
            CreditRating::BB => (3.5, 8.0),
            CreditRating::B => (5.0, 12.0),
            CreditRating::CCC => (8.0, 18.0),
            CreditRating::CC => (12.0, 25.0),
            CreditRating::C => (18.0, 35.0),
            CreditRating::D => (25.0, 50.0),
        };
        if emergency {
            urgent
        } else {
            regular
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CreditRating::AAA => "AAA",
            CreditRating::AA => "AA",
            CreditRating::A => "A",
            CreditRating::BBB => "BBB",
            CreditRating::BB => "BB",
            CreditRating::B => "B",
            CreditRating::CCC => "CCC",
            CreditRating::CC => "CC",
            CreditRating::C => "C",
            CreditRating::D => "D",
        }
    }
}

impl fmt::Display for CreditRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
