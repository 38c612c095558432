//! Spot quote abstractions

use crate::core::error::Result;
use crate::core::metal::MetalType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Raw spot price from a commodity feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotPrice {
    pub price_per_troy_ounce: Decimal,
    pub currency: String,
    pub as_of: DateTime<Utc>,
}

#[async_trait]
pub trait SpotPriceProvider: Send + Sync {
    async fn fetch_spot_price(&self, metal: MetalType) -> Result<SpotPrice>;
}

/// Spot price combined with the factor converting it to the local currency.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotQuote {
    pub price_per_troy_ounce: Decimal,
    pub fx_rate: Decimal,
    pub as_of: DateTime<Utc>,
}

/// Produces spot quotes ready for purity derivation.
///
/// Implementations perform network I/O only and never retry.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_spot(&self, metal: MetalType) -> Result<SpotQuote>;
}
