//! Reprices a shop's available inventory against the current rates.

use crate::core::error::{RateError, Result};
use crate::core::inventory::{InventoryRepository, PricedItem};
use crate::core::rate_store::RateStore;
use crate::core::valuation::{self, round_money};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub item_id: String,
    pub reason: String,
}

#[derive(Debug, Default, PartialEq)]
pub struct PropagationReport {
    pub updated_count: usize,
    /// Sorted by item id.
    pub failures: Vec<ItemFailure>,
}

/// New prices for one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repricing {
    pub cost_price: Decimal,
    pub selling_price: Decimal,
}

/// Prices an item at `total_value` while keeping its markup ratio.
///
/// The markup is `(selling - cost) / cost` and is undefined for a zero cost.
pub fn reprice(item: &PricedItem, total_value: Decimal) -> Result<Repricing> {
    if item.cost_price <= Decimal::ZERO {
        return Err(RateError::invalid(format!(
            "Cost price must be positive to keep the markup, got {}",
            item.cost_price
        )));
    }
    let markup_ratio = (item.selling_price - item.cost_price) / item.cost_price;
    Ok(Repricing {
        cost_price: total_value,
        selling_price: round_money(total_value * (Decimal::ONE + markup_ratio)),
    })
}

/// Reprices every available item of `shop_id`.
///
/// Items are processed on at most `concurrency` workers. A failing item is
/// recorded and never stops the batch. Only listing the shop's items can fail
/// the whole call.
pub async fn propagate(
    shop_id: &str,
    store: &dyn RateStore,
    inventory: &dyn InventoryRepository,
    tax_rate: Decimal,
    concurrency: usize,
    progress: &(dyn Fn() + Sync),
) -> Result<PropagationReport> {
    let items = inventory.list_available(shop_id).await?;
    debug!(shop_id, items = items.len(), "Repricing inventory");

    let outcomes: Vec<std::result::Result<String, ItemFailure>> = stream::iter(items)
        .map(|item| async move {
            let outcome = update_item(shop_id, &item, store, inventory, tax_rate)
                .await
                .map(|_| item.id.clone())
                .map_err(|e| {
                    warn!(item_id = %item.id, error = %e, "Item repricing failed");
                    ItemFailure {
                        item_id: item.id.clone(),
                        reason: e.to_string(),
                    }
                });
            progress();
            outcome
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = PropagationReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(_) => report.updated_count += 1,
            Err(failure) => report.failures.push(failure),
        }
    }
    report.failures.sort_by(|a, b| a.item_id.cmp(&b.item_id));

    info!(
        shop_id,
        updated = report.updated_count,
        failed = report.failures.len(),
        "Price propagation complete"
    );
    Ok(report)
}

async fn update_item(
    shop_id: &str,
    item: &PricedItem,
    store: &dyn RateStore,
    inventory: &dyn InventoryRepository,
    tax_rate: Decimal,
) -> Result<()> {
    let rate = store.get_current(item.metal_type, item.purity).await?;
    let valuation = valuation::value(&rate, &item.valuation_input(), tax_rate)?;
    let prices = reprice(item, valuation.total_value)?;

    inventory
        .update_prices(shop_id, &item.id, prices.cost_price, prices.selling_price)
        .await
        .map_err(|e| match e {
            RateError::ItemUpdateFailure { .. } => e,
            other => RateError::ItemUpdateFailure {
                item_id: item.id.clone(),
                reason: other.to_string(),
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metal::{MetalType, Purity};
    use crate::core::rate::{RateRecord, RateSource};
    use crate::store::memory::{MemoryInventory, MemoryRateStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn item(id: &str, cost: Decimal, selling: Decimal) -> PricedItem {
        PricedItem {
            id: id.to_string(),
            shop_id: "shop-1".to_string(),
            sku: format!("SKU-{id}"),
            metal_type: MetalType::Gold,
            purity: Purity::karat(22),
            net_weight_grams: dec!(10),
            gross_weight_grams: dec!(10.5),
            making_charges: Decimal::ZERO,
            wastage_percentage: Decimal::ZERO,
            cost_price: cost,
            selling_price: selling,
            is_available: true,
        }
    }

    async fn store_with_gold22(rate: Decimal) -> MemoryRateStore {
        let store = MemoryRateStore::new();
        store
            .upsert_active(RateRecord::new(
                MetalType::Gold,
                Purity::karat(22),
                rate,
                RateSource::Manual,
                Utc::now(),
            ))
            .await
            .unwrap();
        store
    }

    fn no_progress() {}

    #[test]
    fn test_reprice_keeps_markup() {
        let prices = reprice(&item("a", dec!(50000), dec!(57500)), dec!(60000)).unwrap();
        assert_eq!(prices.cost_price, dec!(60000));
        assert_eq!(prices.selling_price, dec!(69000));
    }

    #[test]
    fn test_reprice_rounds_selling_price() {
        let prices = reprice(&item("a", dec!(3), dec!(4)), dec!(100)).unwrap();
        assert_eq!(prices.selling_price, dec!(133.33));
    }

    #[test]
    fn test_reprice_rejects_zero_cost() {
        let err = reprice(&item("a", Decimal::ZERO, dec!(100)), dec!(60000)).unwrap_err();
        assert!(matches!(err, RateError::InvalidValuationInput(_)));
    }

    #[tokio::test]
    async fn test_propagation_preserves_markup() {
        let store = store_with_gold22(dec!(6000)).await;
        let inventory = MemoryInventory::new();
        inventory
            .save_item(item("item-1", dec!(50000), dec!(57500)))
            .await
            .unwrap();

        let report = propagate("shop-1", &store, &inventory, Decimal::ZERO, 4, &no_progress)
            .await
            .unwrap();

        assert_eq!(report.updated_count, 1);
        assert!(report.failures.is_empty());
        let updated = inventory.list_items("shop-1").await.unwrap();
        assert_eq!(updated[0].cost_price, dec!(60000));
        assert_eq!(updated[0].selling_price, dec!(69000));
    }

    #[tokio::test]
    async fn test_one_bad_item_does_not_abort_batch() {
        let store = store_with_gold22(dec!(6000)).await;
        let inventory = MemoryInventory::new();
        for i in 1..=5 {
            let cost = if i == 3 { Decimal::ZERO } else { dec!(50000) };
            inventory
                .save_item(item(&format!("item-{i}"), cost, dec!(57500)))
                .await
                .unwrap();
        }
        let ticks = AtomicUsize::new(0);
        let progress = || {
            ticks.fetch_add(1, Ordering::SeqCst);
        };

        let report = propagate("shop-1", &store, &inventory, dec!(0.03), 2, &progress)
            .await
            .unwrap();

        assert_eq!(report.updated_count, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item_id, "item-3");
        assert_eq!(ticks.load(Ordering::SeqCst), 5);

        let items = inventory.list_items("shop-1").await.unwrap();
        let untouched = items.iter().find(|i| i.id == "item-3").unwrap();
        assert_eq!(untouched.cost_price, Decimal::ZERO);
        assert_eq!(untouched.selling_price, dec!(57500));
    }

    #[tokio::test]
    async fn test_missing_rate_is_item_failure() {
        let store = MemoryRateStore::new();
        let inventory = MemoryInventory::new();
        inventory
            .save_item(item("b", dec!(100), dec!(120)))
            .await
            .unwrap();
        inventory
            .save_item(item("a", dec!(100), dec!(120)))
            .await
            .unwrap();

        let report = propagate("shop-1", &store, &inventory, dec!(0.03), 4, &no_progress)
            .await
            .unwrap();

        assert_eq!(report.updated_count, 0);
        let ids: Vec<_> = report.failures.iter().map(|f| f.item_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(report.failures[0].reason.contains("No active rate for GOLD 22"));
    }

    #[tokio::test]
    async fn test_unavailable_items_are_skipped() {
        let store = store_with_gold22(dec!(6000)).await;
        let inventory = MemoryInventory::new();
        let mut sold = item("sold", dec!(50000), dec!(57500));
        sold.is_available = false;
        inventory.save_item(sold).await.unwrap();

        let report = propagate("shop-1", &store, &inventory, dec!(0.03), 4, &no_progress)
            .await
            .unwrap();

        assert_eq!(report, PropagationReport::default());
    }

    struct ReadOnlyInventory(MemoryInventory);

    #[async_trait]
    impl InventoryRepository for ReadOnlyInventory {
        async fn list_items(&self, shop_id: &str) -> Result<Vec<PricedItem>> {
            self.0.list_items(shop_id).await
        }

        async fn save_item(&self, item: PricedItem) -> Result<PricedItem> {
            self.0.save_item(item).await
        }

        async fn update_prices(&self, _: &str, _: &str, _: Decimal, _: Decimal) -> Result<()> {
            Err(RateError::Storage("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_persistence_error_is_wrapped_as_item_failure() {
        let store = store_with_gold22(dec!(6000)).await;
        let inventory = ReadOnlyInventory(MemoryInventory::new());
        inventory
            .save_item(item("item-1", dec!(50000), dec!(57500)))
            .await
            .unwrap();

        let report = propagate("shop-1", &store, &inventory, dec!(0.03), 4, &no_progress)
            .await
            .unwrap();

        assert_eq!(report.updated_count, 0);
        assert_eq!(
            report.failures[0].reason,
            "Failed to update item item-1: Storage error: read-only"
        );
    }
}
