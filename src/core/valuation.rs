//! Tax-inclusive valuation of a jewelry item at a given rate.

use crate::core::error::{RateError, Result};
use crate::core::rate::RateRecord;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// GST on gold jewelry.
pub const DEFAULT_TAX_RATE: Decimal = dec!(0.03);

/// Decimal places of presented monetary amounts.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationInput {
    pub net_weight_grams: Decimal,
    pub making_charges: Decimal,
    pub wastage_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    pub metal_value: Decimal,
    pub wastage_value: Decimal,
    pub making_charges: Decimal,
    pub stone_value: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_value: Decimal,
    pub rate_used: Decimal,
}

/// Values an item against a rate record.
///
/// Intermediate amounts keep full precision; only `tax_amount` and
/// `total_value` are rounded, and the total is taken from the unrounded tax.
pub fn value(rate: &RateRecord, input: &ValuationInput, tax_rate: Decimal) -> Result<ValuationResult> {
    validate(rate, input, tax_rate)?;

    let rate_per_gram = rate.rate_per_gram;
    let metal_value = input.net_weight_grams * rate_per_gram;
    let wastage_value = (input.net_weight_grams * input.wastage_percentage / dec!(100)) * rate_per_gram;
    // Stones are priced by a separate collaborator.
    let stone_value = Decimal::ZERO;

    let subtotal = metal_value + wastage_value + input.making_charges + stone_value;
    let tax = subtotal * tax_rate;
    let total = subtotal + tax;

    Ok(ValuationResult {
        metal_value,
        wastage_value,
        making_charges: input.making_charges,
        stone_value,
        subtotal,
        tax_amount: round_money(tax),
        total_value: round_money(total),
        rate_used: rate_per_gram,
    })
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn validate(rate: &RateRecord, input: &ValuationInput, tax_rate: Decimal) -> Result<()> {
    if input.net_weight_grams.is_sign_negative() {
        return Err(RateError::invalid(format!(
            "Net weight cannot be negative: {}",
            input.net_weight_grams
        )));
    }
    if input.making_charges.is_sign_negative() {
        return Err(RateError::invalid(format!(
            "Making charges cannot be negative: {}",
            input.making_charges
        )));
    }
    if input.wastage_percentage.is_sign_negative() {
        return Err(RateError::invalid(format!(
            "Wastage percentage cannot be negative: {}",
            input.wastage_percentage
        )));
    }
    if tax_rate.is_sign_negative() {
        return Err(RateError::invalid(format!(
            "Tax rate cannot be negative: {tax_rate}"
        )));
    }
    if rate.rate_per_gram <= Decimal::ZERO {
        return Err(RateError::invalid(format!(
            "Rate per gram must be positive: {}",
            rate.rate_per_gram
        )));
    }
    if !rate.metal_type.supports(rate.purity) {
        return Err(RateError::invalid(format!(
            "Unsupported purity {} for {}",
            rate.purity, rate.metal_type
        )));
    }
    Ok(())
}
