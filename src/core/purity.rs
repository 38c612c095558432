//! Converts a troy-ounce spot quote into local per-gram rates by purity.

use crate::core::error::{RateError, Result};
use crate::core::metal::{BASE_KARAT, MetalType, Purity, SUPPORTED_GOLD_KARATS};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Grams per troy ounce, exact by definition.
pub const TROY_OUNCE_GRAMS: Decimal = dec!(31.1034768);

/// Decimal places kept on derived per-gram rates.
pub const RATE_SCALE: u32 = 4;

/// Per-gram rates derived from one spot quote.
#[derive(Debug, Clone, PartialEq)]
pub enum PurityRates {
    /// Karat-scaled rates, keyed by every supported karat.
    Fineness { rates: BTreeMap<Purity, Decimal> },
    /// One rate regardless of the purity selector.
    Flat { rate: Decimal },
}

impl PurityRates {
    pub fn rate_for(&self, purity: Purity) -> Option<Decimal> {
        match self {
            PurityRates::Fineness { rates } => rates.get(&purity).copied(),
            PurityRates::Flat { rate } if purity.value() > Decimal::ZERO => Some(*rate),
            PurityRates::Flat { .. } => None,
        }
    }
}

/// Derives per-gram rates in the local currency.
///
/// Gold uses the 24K rate as the base and scales every supported karat by
/// `karat / 24`. Silver and platinum are priced flat: every purity selector
/// maps to the same per-gram figure.
pub fn derive(price_per_troy_ounce: Decimal, fx_rate: Decimal, metal: MetalType) -> Result<PurityRates> {
    if price_per_troy_ounce <= Decimal::ZERO {
        return Err(RateError::invalid(format!(
            "Spot price must be positive, got {price_per_troy_ounce}"
        )));
    }
    if fx_rate <= Decimal::ZERO {
        return Err(RateError::invalid(format!(
            "FX rate must be positive, got {fx_rate}"
        )));
    }

    let per_gram = price_per_troy_ounce * fx_rate / TROY_OUNCE_GRAMS;

    match metal {
        MetalType::Gold => {
            let base_karat = Decimal::from(BASE_KARAT);
            let rates = SUPPORTED_GOLD_KARATS
                .iter()
                .map(|karat| {
                    let rate = per_gram * Decimal::from(*karat) / base_karat;
                    (Purity::karat(*karat), round_rate(rate))
                })
                .collect();
            Ok(PurityRates::Fineness { rates })
        }
        MetalType::Silver | MetalType::Platinum => Ok(PurityRates::Flat {
            rate: round_rate(per_gram),
        }),
    }
}

fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
