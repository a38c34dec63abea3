use crate::CountryName;
use serde::{Deserialize, Serialize};

/// Direction of a trade agreement from the point of view of its origin country.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Import,
    Export,
}

impl TradeKind {
    pub fn mirrored(self) -> Self {
        match self {
            TradeKind::Import => TradeKind::Export,
            TradeKind::Export => TradeKind::Import,
        }
    }
}

/// Tradable product family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Commodity,
    Manufacture,
}

/// One half of a bilateral agreement.
///
/// Agreements exist in mirrored pairs: an export from A to B is stored once
/// with `origin_country = A, kind = Export` and once with
/// `origin_country = B, kind = Import`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeAgreement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TradeKind,
    pub product: Product,
    pub value: f64,
    pub origin_country: CountryName,
    pub target_country: CountryName,
}

impl TradeAgreement {
    /// Whether `other` is the mirrored half of `self`.
    pub fn mirrors(&self, other: &TradeAgreement) -> bool {
        self.kind.mirrored() == other.kind
            && self.product == other.product
            && self.origin_country == other.target_country
            && self.target_country == other.origin_country
    }
}
