use crate::core::currency::CurrencyRateProvider;
use crate::core::error::Result;
use crate::core::metal::MetalType;
use crate::core::quote::{QuoteSource, SpotPriceProvider, SpotQuote};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Joins a spot feed and an FX feed into quotes in the local currency.
///
/// Both feeds must answer. The error names the feed that failed; the spot
/// feed is reported first when both fail.
pub struct CombinedQuoteSource {
    spot: Arc<dyn SpotPriceProvider>,
    fx: Arc<dyn CurrencyRateProvider>,
    quote_currency: String,
    local_currency: String,
}

impl CombinedQuoteSource {
    pub fn new(
        spot: Arc<dyn SpotPriceProvider>,
        fx: Arc<dyn CurrencyRateProvider>,
        quote_currency: &str,
        local_currency: &str,
    ) -> Self {
        Self {
            spot,
            fx,
            quote_currency: quote_currency.to_uppercase(),
            local_currency: local_currency.to_uppercase(),
        }
    }

    async fn fx_rate(&self) -> Result<Decimal> {
        if self.quote_currency == self.local_currency {
            return Ok(Decimal::ONE);
        }
        self.fx
            .get_rate(&self.quote_currency, &self.local_currency)
            .await
    }
}

#[async_trait]
impl QuoteSource for CombinedQuoteSource {
    #[instrument(name = "FetchSpotQuote", skip(self), fields(metal = %metal))]
    async fn fetch_spot(&self, metal: MetalType) -> Result<SpotQuote> {
        let (spot, fx_rate) = tokio::join!(self.spot.fetch_spot_price(metal), self.fx_rate());
        let spot = spot?;
        let fx_rate = fx_rate?;

        debug!(
            price = %spot.price_per_troy_ounce,
            %fx_rate,
            from = %self.quote_currency,
            to = %self.local_currency,
            "Combined spot quote"
        );
        Ok(SpotQuote {
            price_per_troy_ounce: spot.price_per_troy_ounce,
            fx_rate,
            as_of: spot.as_of,
        })
    }
}
