pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::metal::{MetalType, Purity};
use crate::core::quote::QuoteSource;
use crate::core::service::{NewItem, RateService};
use crate::core::valuation::ValuationInput;
use crate::providers::currency_api::CurrencyApiProvider;
use crate::providers::goldprice::GoldPriceProvider;
use crate::providers::quote_source::CombinedQuoteSource;
use crate::store::Storage;
use anyhow::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    RateCurrent {
        metal: MetalType,
        purity: Purity,
    },
    RateRefresh {
        metal: MetalType,
        purity: Purity,
    },
    RateSet {
        metal: MetalType,
        purity: Purity,
        rate_per_gram: Decimal,
    },
    RateHistory {
        metal: MetalType,
        purity: Purity,
        days: u32,
    },
    Acquire,
    Schedule,
    Propagate {
        shop_id: String,
    },
    Value {
        metal: MetalType,
        purity: Purity,
        input: ValuationInput,
    },
    StockAdd(NewItem),
    StockReport {
        shop_id: String,
    },
}

impl AppCommand {
    /// Whether the command writes to the rate or inventory store.
    fn writes(&self) -> bool {
        !matches!(
            self,
            AppCommand::RateHistory { .. } | AppCommand::StockReport { .. }
        )
    }
}

/// Builds the quote source from the configured spot and FX feeds.
pub fn build_quote_source(config: &AppConfig) -> Arc<dyn QuoteSource> {
    let timeout = config.providers.timeout();
    let spot = GoldPriceProvider::new(
        config.providers.spot_base_url(),
        &config.currency.quote,
        timeout,
    );
    let fx = CurrencyApiProvider::new(config.providers.currency_base_url(), timeout);
    Arc::new(CombinedQuoteSource::new(
        Arc::new(spot),
        Arc::new(fx),
        &config.currency.quote,
        &config.currency.local,
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("bullion starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let storage = Storage::open(&config)?;
    let service = RateService::new(
        storage.rates.clone(),
        storage.inventory.clone(),
        build_quote_source(&config),
        &config,
    );
    let currency = config.currency.local.as_str();
    let writes = command.writes();

    let result = match command {
        AppCommand::RateCurrent { metal, purity } => {
            cli::rates::current(&service, metal, purity, currency).await
        }
        AppCommand::RateRefresh { metal, purity } => {
            cli::rates::refresh(&service, metal, purity, currency).await
        }
        AppCommand::RateSet {
            metal,
            purity,
            rate_per_gram,
        } => cli::rates::set(&service, metal, purity, rate_per_gram, currency).await,
        AppCommand::RateHistory {
            metal,
            purity,
            days,
        } => cli::rates::history(&service, metal, purity, days, currency).await,
        AppCommand::Acquire => cli::acquire::run(&service, currency).await,
        AppCommand::Schedule => {
            let at = config.acquisition.daily_time()?;
            cli::acquire::schedule(&service, at, currency).await
        }
        AppCommand::Propagate { shop_id } => cli::propagate::run(&service, &shop_id).await,
        AppCommand::Value {
            metal,
            purity,
            input,
        } => cli::value::run(&service, metal, purity, input, currency).await,
        AppCommand::StockAdd(new_item) => cli::stock::add(&service, new_item, currency).await,
        AppCommand::StockReport { shop_id } => {
            cli::stock::report(&service, &shop_id, currency).await
        }
    };

    if writes {
        return with_persisted(result, storage.persist());
    }
    result
}

/// Combines a command outcome with the flush that follows it. The command's
/// own error wins; a flush failure after it is only logged.
fn with_persisted(result: Result<()>, persisted: Result<()>) -> Result<()> {
    match (result, persisted) {
        (Ok(()), persisted) => persisted,
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(persist_err)) => {
            warn!(error = %persist_err, "Failed to persist storage after command error");
            Err(e)
        }
    }
}
