use crate::core::currency::CurrencyRateProvider;
use crate::core::error::{RateError, Result, UpstreamFeed};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

/// Conversion factors from the fawazahmed0 currency-api dataset.
pub struct CurrencyApiProvider {
    base_url: String,
    timeout: Duration,
}

impl CurrencyApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        CurrencyApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

fn fx_error(reason: impl Into<String>) -> RateError {
    RateError::upstream(UpstreamFeed::Fx, reason)
}

/// The rate sits at `{from}.{to}` as a plain JSON number.
fn extract_rate(data: &Value, from: &str, to: &str) -> Option<Decimal> {
    let raw = data.get(from)?.get(to)?;
    let rate = match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
        _ => return None,
    };
    (rate > Decimal::ZERO).then_some(rate)
}

#[async_trait]
impl CurrencyRateProvider for CurrencyApiProvider {
    #[instrument(name = "CurrencyApiFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal> {
        let from = from.to_lowercase();
        let to = to.to_lowercase();
        let pair = format!("{from}/{to}");

        let url = format!("{}/v1/currencies/{}.json", self.base_url, from);
        debug!("Requesting currency rate from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("bullion/1.0")
            .timeout(self.timeout)
            .build()
            .map_err(|e| fx_error(format!("Failed to build HTTP client: {e}")))?;
        let response = client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| fx_error(format!("Request error: {e} for currency pair: {pair}")))?;

        if !response.status().is_success() {
            return Err(fx_error(format!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                pair
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| fx_error(format!("Failed to read response for {pair}: {e}")))?;
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| fx_error(format!("Failed to parse JSON response for {pair}: {e}")))?;

        let rate = extract_rate(&data, &from, &to)
            .ok_or_else(|| fx_error(format!("No rate data found for currency pair: {pair}")))?;
        debug!(%rate, "Received currency rate");
        Ok(rate)
    }
}
