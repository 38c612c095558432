//! Metal types and purity selectors

use crate::core::error::RateError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Gold karats the deriver produces rates for.
pub const SUPPORTED_GOLD_KARATS: [u32; 7] = [24, 22, 21, 20, 18, 16, 14];

/// Karat of pure gold; every other karat is priced relative to it.
pub const BASE_KARAT: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetalType {
    Gold,
    Silver,
    Platinum,
}

impl MetalType {
    pub const ALL: [MetalType; 3] = [MetalType::Gold, MetalType::Silver, MetalType::Platinum];

    /// Whether the purity is a valid selector for this metal.
    ///
    /// Gold is restricted to the karats the deriver scales to. Silver and
    /// platinum rates are not scaled, so any positive selector is accepted.
    pub fn supports(&self, purity: Purity) -> bool {
        match self {
            MetalType::Gold => SUPPORTED_GOLD_KARATS
                .iter()
                .any(|k| Decimal::from(*k) == purity.value()),
            MetalType::Silver | MetalType::Platinum => purity.value() > Decimal::ZERO,
        }
    }
}

impl Display for MetalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MetalType::Gold => "GOLD",
                MetalType::Silver => "SILVER",
                MetalType::Platinum => "PLATINUM",
            }
        )
    }
}

impl FromStr for MetalType {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GOLD" | "XAU" => Ok(MetalType::Gold),
            "SILVER" | "XAG" => Ok(MetalType::Silver),
            "PLATINUM" | "XPT" => Ok(MetalType::Platinum),
            _ => Err(RateError::invalid(format!("Unknown metal type: {s}"))),
        }
    }
}

/// Fineness selector: a karat for gold, an opaque (possibly fractional)
/// percentage for silver and platinum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Purity(Decimal);

impl Purity {
    pub fn new(value: Decimal) -> Self {
        Purity(value.normalize())
    }

    pub fn karat(karat: u32) -> Self {
        Purity(Decimal::from(karat))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Display for Purity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Purity {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches(['k', 'K']);
        Decimal::from_str(trimmed)
            .map(Purity::new)
            .map_err(|e| RateError::invalid(format!("Invalid purity '{s}': {e}")))
    }
}
