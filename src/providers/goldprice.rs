use crate::core::error::{RateError, Result, UpstreamFeed};
use crate::core::metal::MetalType;
use crate::core::quote::{SpotPrice, SpotPriceProvider};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Spot prices per troy ounce from the goldprice.org rate feed.
pub struct GoldPriceProvider {
    base_url: String,
    currency: String,
    timeout: Duration,
}

impl GoldPriceProvider {
    pub fn new(base_url: &str, currency: &str, timeout: Duration) -> Self {
        GoldPriceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: currency.to_uppercase(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    /// Milliseconds since the epoch.
    ts: Option<i64>,
    items: Vec<RateItem>,
}

#[derive(Debug, Deserialize)]
struct RateItem {
    #[serde(alias = "xauPrice")]
    xau_price: Option<Decimal>,
    #[serde(alias = "xagPrice")]
    xag_price: Option<Decimal>,
    #[serde(alias = "xptPrice")]
    xpt_price: Option<Decimal>,
}

impl RateItem {
    fn price_for(&self, metal: MetalType) -> Option<Decimal> {
        match metal {
            MetalType::Gold => self.xau_price,
            MetalType::Silver => self.xag_price,
            MetalType::Platinum => self.xpt_price,
        }
    }
}

fn spot_error(reason: impl Into<String>) -> RateError {
    RateError::upstream(UpstreamFeed::Spot, reason)
}

#[async_trait]
impl SpotPriceProvider for GoldPriceProvider {
    #[instrument(name = "GoldPriceFetch", skip(self), fields(metal = %metal))]
    async fn fetch_spot_price(&self, metal: MetalType) -> Result<SpotPrice> {
        let url = format!("{}/dbXRates/{}", self.base_url, self.currency);
        debug!("Requesting spot prices from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("bullion/1.0")
            .timeout(self.timeout)
            .build()
            .map_err(|e| spot_error(format!("Failed to build HTTP client: {e}")))?;
        let response = client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| spot_error(format!("Request error: {e} for URL: {url}")))?;

        if !response.status().is_success() {
            return Err(spot_error(format!(
                "HTTP error: {} for URL: {}",
                response.status(),
                url
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| spot_error(format!("Failed to read response body: {e}")))?;
        let data: RatesResponse = serde_json::from_str(&text)
            .map_err(|e| spot_error(format!("Failed to parse spot response: {e}")))?;

        let item = data
            .items
            .first()
            .ok_or_else(|| spot_error(format!("No spot data found in {} feed", self.currency)))?;
        let price = item
            .price_for(metal)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| spot_error(format!("No {metal} price in spot response")))?;

        let as_of = data
            .ts
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        debug!(%price, %as_of, "Received spot price");
        Ok(SpotPrice {
            price_per_troy_ounce: price,
            currency: self.currency.clone(),
            as_of,
        })
    }
}
