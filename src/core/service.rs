//! Facade over acquisition, the rate store, valuation and the inventory.

use crate::core::acquisition::{self, AcquisitionReport, RetryPolicy};
use crate::core::config::{AcquisitionConfig, AppConfig, RatesConfig};
use crate::core::error::{RateError, Result};
use crate::core::inventory::{InventoryRepository, PricedItem};
use crate::core::metal::{MetalType, Purity};
use crate::core::propagation::{self, PropagationReport};
use crate::core::quote::QuoteSource;
use crate::core::rate::{RateRecord, RateSource};
use crate::core::rate_store::RateStore;
use crate::core::valuation::{self, ValuationInput, ValuationResult, round_money};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Markup applied to new items without an explicit selling price.
pub const DEFAULT_MARKUP: Decimal = dec!(1.15);

/// An item to be priced and added to the inventory.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub shop_id: String,
    pub sku: String,
    pub metal_type: MetalType,
    pub purity: Purity,
    pub net_weight_grams: Decimal,
    pub gross_weight_grams: Decimal,
    pub making_charges: Decimal,
    pub wastage_percentage: Decimal,
    pub selling_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReport {
    pub total_items: usize,
    pub available_items: usize,
    pub sold_items: usize,
    pub total_cost_value: Decimal,
    pub cost_by_metal: BTreeMap<MetalType, Decimal>,
}

pub struct RateService {
    store: Arc<dyn RateStore>,
    inventory: Arc<dyn InventoryRepository>,
    quotes: Arc<dyn QuoteSource>,
    rates: RatesConfig,
    acquisition: AcquisitionConfig,
    tax_rate: Decimal,
    concurrency: usize,
}

impl RateService {
    pub fn new(
        store: Arc<dyn RateStore>,
        inventory: Arc<dyn InventoryRepository>,
        quotes: Arc<dyn QuoteSource>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            inventory,
            quotes,
            rates: config.rates.clone(),
            acquisition: config.acquisition.clone(),
            tax_rate: config.valuation.tax_rate,
            concurrency: config.propagation.concurrency,
        }
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// The active rate for the pair.
    ///
    /// A missing rate is acquired when `refresh_on_miss` is set. A rate older
    /// than `stale_after_hours` is refreshed; if that fails the stale record
    /// is returned.
    pub async fn get_current_rate(&self, metal: MetalType, purity: Purity) -> Result<RateRecord> {
        match self.store.get_current(metal, purity).await {
            Ok(record) if self.is_stale(&record) => {
                match self.fetch_and_refresh(metal, purity).await {
                    Ok(fresh) => Ok(fresh),
                    Err(e) => {
                        warn!(
                            %metal,
                            %purity,
                            error = %e,
                            effective_date = %record.effective_date,
                            "Refresh of stale rate failed, using stale rate"
                        );
                        Ok(record)
                    }
                }
            }
            Ok(record) => Ok(record),
            Err(RateError::RateNotFound { .. }) if self.rates.refresh_on_miss => {
                info!(%metal, %purity, "No active rate, acquiring");
                self.fetch_and_refresh(metal, purity).await
            }
            Err(e) => Err(e),
        }
    }

    fn is_stale(&self, record: &RateRecord) -> bool {
        self.rates
            .stale_after_hours
            .and_then(|hours| i64::try_from(hours).ok())
            .and_then(Duration::try_hours)
            .is_some_and(|max_age| record.age(Utc::now()) > max_age)
    }

    /// Acquires a fresh rate for the pair and makes it active.
    pub async fn fetch_and_refresh(&self, metal: MetalType, purity: Purity) -> Result<RateRecord> {
        acquisition::acquire_one(
            self.quotes.as_ref(),
            self.store.as_ref(),
            metal,
            purity,
            RetryPolicy::from(&self.acquisition),
        )
        .await
    }

    /// Records an operator-entered rate as the active rate.
    pub async fn update_rate_manually(
        &self,
        metal: MetalType,
        purity: Purity,
        rate_per_gram: Decimal,
    ) -> Result<RateRecord> {
        if rate_per_gram <= Decimal::ZERO {
            return Err(RateError::invalid(format!(
                "Rate per gram must be positive: {rate_per_gram}"
            )));
        }
        if !metal.supports(purity) {
            return Err(RateError::invalid(format!(
                "Unsupported purity {purity} for {metal}"
            )));
        }

        let record = RateRecord::new(metal, purity, rate_per_gram, RateSource::Manual, Utc::now());
        let record = self.store.upsert_active(record).await?;
        info!(%metal, %purity, %rate_per_gram, "Manual rate recorded");
        Ok(record)
    }

    pub async fn get_rate_history(
        &self,
        metal: MetalType,
        purity: Purity,
        days: u32,
    ) -> Result<Vec<RateRecord>> {
        self.store.get_history(metal, purity, days).await
    }

    pub async fn propagate_prices(&self, shop_id: &str) -> Result<PropagationReport> {
        self.propagate_prices_with_progress(shop_id, &|| ()).await
    }

    pub async fn propagate_prices_with_progress(
        &self,
        shop_id: &str,
        progress: &(dyn Fn() + Sync),
    ) -> Result<PropagationReport> {
        propagation::propagate(
            shop_id,
            self.store.as_ref(),
            self.inventory.as_ref(),
            self.tax_rate,
            self.concurrency,
            progress,
        )
        .await
    }

    /// Acquires every configured pair.
    pub async fn run_daily_acquisition(&self) -> AcquisitionReport {
        acquisition::run_acquisition(
            self.quotes.as_ref(),
            self.store.as_ref(),
            &self.acquisition.pairs,
            RetryPolicy::from(&self.acquisition),
        )
        .await
    }

    /// Values an item at the current rate for its metal and purity.
    pub async fn appraise(
        &self,
        metal: MetalType,
        purity: Purity,
        input: &ValuationInput,
    ) -> Result<ValuationResult> {
        let rate = self.get_current_rate(metal, purity).await?;
        valuation::value(&rate, input, self.tax_rate)
    }

    /// Prices a new item at the current rate and stores it.
    ///
    /// Cost is the tax-inclusive valuation. Selling price defaults to cost
    /// with the default markup.
    pub async fn add_item(&self, new_item: NewItem) -> Result<PricedItem> {
        let input = ValuationInput {
            net_weight_grams: new_item.net_weight_grams,
            making_charges: new_item.making_charges,
            wastage_percentage: new_item.wastage_percentage,
        };
        if new_item.gross_weight_grams < new_item.net_weight_grams {
            return Err(RateError::invalid(format!(
                "Gross weight {} is below net weight {}",
                new_item.gross_weight_grams, new_item.net_weight_grams
            )));
        }
        let valuation = self
            .appraise(new_item.metal_type, new_item.purity, &input)
            .await?;

        let cost_price = valuation.total_value;
        let selling_price = new_item
            .selling_price
            .unwrap_or_else(|| round_money(cost_price * DEFAULT_MARKUP));
        let item = PricedItem {
            id: Uuid::now_v7().to_string(),
            shop_id: new_item.shop_id,
            sku: new_item.sku,
            metal_type: new_item.metal_type,
            purity: new_item.purity,
            net_weight_grams: new_item.net_weight_grams,
            gross_weight_grams: new_item.gross_weight_grams,
            making_charges: new_item.making_charges,
            wastage_percentage: new_item.wastage_percentage,
            cost_price,
            selling_price,
            is_available: true,
        };
        let item = self.inventory.save_item(item).await?;
        info!(item_id = %item.id, sku = %item.sku, %cost_price, %selling_price, "Item added");
        Ok(item)
    }

    pub async fn list_items(&self, shop_id: &str) -> Result<Vec<PricedItem>> {
        self.inventory.list_items(shop_id).await
    }

    /// Item counts and cost value of a shop's inventory.
    pub async fn stock_report(&self, shop_id: &str) -> Result<StockReport> {
        let items = self.inventory.list_items(shop_id).await?;

        let mut cost_by_metal: BTreeMap<MetalType, Decimal> = BTreeMap::new();
        let mut total_cost_value = Decimal::ZERO;
        let mut available_items = 0;
        for item in &items {
            total_cost_value += item.cost_price;
            *cost_by_metal.entry(item.metal_type).or_default() += item.cost_price;
            if item.is_available {
                available_items += 1;
            }
        }

        Ok(StockReport {
            total_items: items.len(),
            available_items,
            sold_items: items.len() - available_items,
            total_cost_value,
            cost_by_metal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CurrencyConfig, RatePair};
    use crate::core::error::UpstreamFeed;
    use crate::core::quote::SpotQuote;
    use crate::store::memory::{MemoryInventory, MemoryRateStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// 24K gold at exactly 7000 per gram.
    struct FixedSource {
        fail: AtomicBool,
        fetches: AtomicUsize,
    }

    impl FixedSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(fail),
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QuoteSource for FixedSource {
        async fn fetch_spot(&self, _metal: MetalType) -> Result<SpotQuote> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(RateError::upstream(UpstreamFeed::Fx, "offline"));
            }
            Ok(SpotQuote {
                price_per_troy_ounce: crate::core::purity::TROY_OUNCE_GRAMS * dec!(7000),
                fx_rate: Decimal::ONE,
                as_of: Utc::now(),
            })
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            currency: CurrencyConfig {
                quote: "USD".to_string(),
                local: "INR".to_string(),
            },
            providers: Default::default(),
            valuation: Default::default(),
            rates: Default::default(),
            acquisition: AcquisitionConfig {
                retries: 0,
                retry_delay_ms: 1,
                pairs: vec![
                    RatePair {
                        metal: MetalType::Gold,
                        purity: Purity::karat(24),
                    },
                    RatePair {
                        metal: MetalType::Gold,
                        purity: Purity::karat(18),
                    },
                ],
                ..Default::default()
            },
            propagation: Default::default(),
            data_path: None,
        }
    }

    fn service_with(source: Arc<FixedSource>, config: &AppConfig) -> (RateService, MemoryRateStore) {
        let store = MemoryRateStore::new();
        let service = RateService::new(
            Arc::new(store.clone()),
            Arc::new(MemoryInventory::new()),
            source,
            config,
        );
        (service, store)
    }

    fn new_item(selling_price: Option<Decimal>) -> NewItem {
        NewItem {
            shop_id: "shop-1".to_string(),
            sku: "RING-001".to_string(),
            metal_type: MetalType::Gold,
            purity: Purity::karat(24),
            net_weight_grams: dec!(10),
            gross_weight_grams: dec!(10.2),
            making_charges: Decimal::ZERO,
            wastage_percentage: Decimal::ZERO,
            selling_price,
        }
    }

    #[tokio::test]
    async fn test_current_rate_acquired_on_miss() {
        let source = FixedSource::new(false);
        let (service, _) = service_with(Arc::clone(&source), &config());

        let rate = service
            .get_current_rate(MetalType::Gold, Purity::karat(24))
            .await
            .unwrap();
        assert_eq!(rate.rate_per_gram, dec!(7000));
        assert_eq!(rate.source, RateSource::Api);

        service
            .get_current_rate(MetalType::Gold, Purity::karat(24))
            .await
            .unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_miss_without_refresh_is_not_found() {
        let mut config = config();
        config.rates.refresh_on_miss = false;
        let source = FixedSource::new(false);
        let (service, _) = service_with(Arc::clone(&source), &config);

        let err = service
            .get_current_rate(MetalType::Gold, Purity::karat(22))
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::RateNotFound { .. }));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_rate_is_returned_when_refresh_fails() {
        let mut config = config();
        config.rates.stale_after_hours = Some(24);
        let source = FixedSource::new(true);
        let (service, store) = service_with(Arc::clone(&source), &config);
        let stale = RateRecord::new(
            MetalType::Gold,
            Purity::karat(22),
            dec!(6000),
            RateSource::Manual,
            Utc::now() - Duration::hours(48),
        );
        let stale = store.upsert_active(stale).await.unwrap();

        let rate = service
            .get_current_rate(MetalType::Gold, Purity::karat(22))
            .await
            .unwrap();
        assert_eq!(rate.id, stale.id);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_rate_is_refreshed() {
        let mut config = config();
        config.rates.stale_after_hours = Some(24);
        let source = FixedSource::new(false);
        let (service, store) = service_with(Arc::clone(&source), &config);
        store
            .upsert_active(RateRecord::new(
                MetalType::Gold,
                Purity::karat(24),
                dec!(6000),
                RateSource::Manual,
                Utc::now() - Duration::hours(48),
            ))
            .await
            .unwrap();

        let rate = service
            .get_current_rate(MetalType::Gold, Purity::karat(24))
            .await
            .unwrap();
        assert_eq!(rate.rate_per_gram, dec!(7000));
    }

    #[tokio::test]
    async fn test_manual_update_supersedes_previous_rate() {
        let (service, _) = service_with(FixedSource::new(true), &config());

        service
            .update_rate_manually(MetalType::Gold, Purity::karat(22), dec!(6000))
            .await
            .unwrap();
        let latest = service
            .update_rate_manually(MetalType::Gold, Purity::karat(22), dec!(6100))
            .await
            .unwrap();

        let current = service
            .get_current_rate(MetalType::Gold, Purity::karat(22))
            .await
            .unwrap();
        assert_eq!(current.id, latest.id);
        assert_eq!(current.source, RateSource::Manual);

        let history = service
            .get_rate_history(MetalType::Gold, Purity::karat(22), 30)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|r| r.is_active).count(), 1);
    }

    #[tokio::test]
    async fn test_manual_update_validates_input() {
        let (service, _) = service_with(FixedSource::new(true), &config());

        let zero = service
            .update_rate_manually(MetalType::Gold, Purity::karat(22), Decimal::ZERO)
            .await;
        assert!(matches!(zero, Err(RateError::InvalidValuationInput(_))));

        let odd_karat = service
            .update_rate_manually(MetalType::Gold, Purity::karat(23), dec!(6000))
            .await;
        assert!(matches!(odd_karat, Err(RateError::InvalidValuationInput(_))));
    }

    #[tokio::test]
    async fn test_daily_acquisition_covers_configured_pairs() {
        let (service, _) = service_with(FixedSource::new(false), &config());

        let report = service.run_daily_acquisition().await;

        assert!(report.failed.is_empty());
        let rates: Vec<_> = report.succeeded.iter().map(|r| r.rate_per_gram).collect();
        assert_eq!(rates, vec![dec!(7000), dec!(5250)]);
    }

    #[tokio::test]
    async fn test_appraise_uses_current_rate() {
        let (service, _) = service_with(FixedSource::new(true), &config());
        service
            .update_rate_manually(MetalType::Gold, Purity::karat(22), dec!(6000))
            .await
            .unwrap();

        let input = ValuationInput {
            net_weight_grams: dec!(10),
            making_charges: dec!(500),
            wastage_percentage: dec!(2),
        };
        let result = service
            .appraise(MetalType::Gold, Purity::karat(22), &input)
            .await
            .unwrap();
        assert_eq!(result.total_value, dec!(63551));
    }

    #[tokio::test]
    async fn test_add_item_defaults_markup() {
        let (service, _) = service_with(FixedSource::new(false), &config());

        let item = service.add_item(new_item(None)).await.unwrap();

        assert_eq!(item.cost_price, dec!(72100));
        assert_eq!(item.selling_price, dec!(82915));
        assert!(item.is_available);
    }

    #[tokio::test]
    async fn test_add_item_keeps_explicit_selling_price() {
        let (service, _) = service_with(FixedSource::new(false), &config());

        let item = service.add_item(new_item(Some(dec!(80000)))).await.unwrap();

        assert_eq!(item.selling_price, dec!(80000));
    }

    #[tokio::test]
    async fn test_add_item_rejects_gross_below_net() {
        let (service, _) = service_with(FixedSource::new(false), &config());
        let mut item = new_item(None);
        item.gross_weight_grams = dec!(9);

        let err = service.add_item(item).await.unwrap_err();
        assert!(matches!(err, RateError::InvalidValuationInput(_)));
    }

    #[tokio::test]
    async fn test_propagation_and_stock_report() {
        let (service, _) = service_with(FixedSource::new(false), &config());
        service.add_item(new_item(None)).await.unwrap();
        let mut chain = new_item(Some(dec!(90000)));
        chain.sku = "CHAIN-001".to_string();
        service.add_item(chain).await.unwrap();

        service
            .update_rate_manually(MetalType::Gold, Purity::karat(24), dec!(8000))
            .await
            .unwrap();
        let report = service.propagate_prices("shop-1").await.unwrap();
        assert_eq!(report.updated_count, 2);
        assert!(report.failures.is_empty());

        let stock = service.stock_report("shop-1").await.unwrap();
        assert_eq!(stock.total_items, 2);
        assert_eq!(stock.available_items, 2);
        assert_eq!(stock.sold_items, 0);
        // 10g at 8000 plus 3% tax, for each item.
        assert_eq!(stock.total_cost_value, dec!(164800));
        assert_eq!(stock.cost_by_metal[&MetalType::Gold], dec!(164800));
    }
}
