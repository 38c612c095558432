//! One acquisition run: fetch, derive and persist rates for a set of pairs.

use crate::core::config::{AcquisitionConfig, RatePair};
use crate::core::error::{RateError, Result};
use crate::core::metal::{MetalType, Purity};
use crate::core::purity;
use crate::core::quote::{QuoteSource, SpotQuote};
use crate::core::rate::{RateRecord, RateSource};
use crate::core::rate_store::RateStore;
use crate::providers::util::with_retry;
use chrono::Utc;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Step of the per-pair pipeline where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Deriving,
    Persisting,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetching => write!(f, "fetching"),
            Stage::Deriving => write!(f, "deriving"),
            Stage::Persisting => write!(f, "persisting"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub metal: MetalType,
    pub purity: Purity,
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct AcquisitionReport {
    pub succeeded: Vec<RateRecord>,
    pub failed: Vec<PairFailure>,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: usize,
    pub delay_ms: u64,
}

impl From<&AcquisitionConfig> for RetryPolicy {
    fn from(config: &AcquisitionConfig) -> Self {
        RetryPolicy {
            retries: config.retries,
            delay_ms: config.retry_delay_ms,
        }
    }
}

/// Runs the acquisition pipeline over `pairs`.
///
/// A failing pair is recorded with its stage and the run moves on. Pairs that
/// already succeeded stay persisted. Spot quotes are fetched once per metal;
/// a failed fetch is retried for the next pair of the same metal.
pub async fn run_acquisition(
    source: &dyn QuoteSource,
    store: &dyn RateStore,
    pairs: &[RatePair],
    retry: RetryPolicy,
) -> AcquisitionReport {
    let mut report = AcquisitionReport::default();
    let mut quotes: HashMap<MetalType, SpotQuote> = HashMap::new();

    for pair in pairs {
        match acquire_pair(source, store, pair.metal, pair.purity, retry, &mut quotes).await {
            Ok(record) => report.succeeded.push(record),
            Err((stage, err)) => {
                warn!(
                    metal = %pair.metal,
                    purity = %pair.purity,
                    %stage,
                    error = %err,
                    "Rate acquisition failed"
                );
                report.failed.push(PairFailure {
                    metal: pair.metal,
                    purity: pair.purity,
                    stage,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Acquisition run complete"
    );
    report
}

/// Acquires and persists a single pair.
pub async fn acquire_one(
    source: &dyn QuoteSource,
    store: &dyn RateStore,
    metal: MetalType,
    purity: Purity,
    retry: RetryPolicy,
) -> Result<RateRecord> {
    let mut quotes = HashMap::new();
    acquire_pair(source, store, metal, purity, retry, &mut quotes)
        .await
        .map_err(|(_, err)| err)
}

async fn acquire_pair(
    source: &dyn QuoteSource,
    store: &dyn RateStore,
    metal: MetalType,
    purity: Purity,
    retry: RetryPolicy,
    quotes: &mut HashMap<MetalType, SpotQuote>,
) -> std::result::Result<RateRecord, (Stage, RateError)> {
    let quote = match quotes.get(&metal) {
        Some(quote) => {
            debug!(%metal, "Using spot quote fetched earlier in this run");
            quote.clone()
        }
        None => {
            let quote = with_retry(|| source.fetch_spot(metal), retry.retries, retry.delay_ms)
                .await
                .map_err(|e| (Stage::Fetching, e))?;
            quotes.insert(metal, quote.clone());
            quote
        }
    };

    let rates = purity::derive(quote.price_per_troy_ounce, quote.fx_rate, metal)
        .map_err(|e| (Stage::Deriving, e))?;
    let rate_per_gram = rates
        .rate_for(purity)
        .filter(|_| metal.supports(purity))
        .ok_or_else(|| {
            (
                Stage::Deriving,
                RateError::invalid(format!("Unsupported purity {purity} for {metal}")),
            )
        })?;

    debug!(%metal, %purity, %rate_per_gram, as_of = %quote.as_of, "Derived rate");
    let record = RateRecord::new(metal, purity, rate_per_gram, RateSource::Api, Utc::now());
    store
        .upsert_active(record)
        .await
        .map_err(|e| (Stage::Persisting, e))
}
