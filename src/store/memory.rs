use crate::core::error::{RateError, Result};
use crate::core::inventory::{InventoryRepository, PricedItem};
use crate::core::metal::{MetalType, Purity};
use crate::core::rate::{RateKey, RateRecord};
use crate::core::rate_store::{RateStore, history_window, select_current};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

type Series = Arc<RwLock<Vec<RateRecord>>>;

/// In-memory rate store. Each pair's series is kept in insertion order behind
/// its own lock, so writes to different pairs never contend.
#[derive(Clone, Default)]
pub struct MemoryRateStore {
    pairs: Arc<std::sync::Mutex<HashMap<RateKey, Series>>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn series(&self, key: RateKey) -> Result<Series> {
        let mut pairs = self
            .pairs
            .lock()
            .map_err(|_| RateError::Storage("pair table poisoned".to_string()))?;
        Ok(Arc::clone(pairs.entry(key).or_default()))
    }

    /// Appends a record without touching other rows, bypassing the
    /// single-active write path.
    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, record: RateRecord) {
        let series = self.series(record.key()).unwrap();
        series.write().await.push(record);
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn get_current(&self, metal: MetalType, purity: Purity) -> Result<RateRecord> {
        let series = self.series(RateKey::new(metal, purity))?;
        let records = series.read().await.clone();
        select_current(records).ok_or(RateError::RateNotFound { metal, purity })
    }

    async fn upsert_active(&self, mut record: RateRecord) -> Result<RateRecord> {
        let now = Utc::now();
        let series = self.series(record.key())?;
        let mut rows = series.write().await;

        for row in rows.iter_mut().filter(|r| r.is_active) {
            row.is_active = false;
            row.updated_at = now;
        }
        record.is_active = true;
        rows.push(record.clone());

        debug!(key = %record.key(), id = %record.id, "Memory store UPSERT");
        Ok(record)
    }

    async fn get_history(
        &self,
        metal: MetalType,
        purity: Purity,
        since_days: u32,
    ) -> Result<Vec<RateRecord>> {
        let series = self.series(RateKey::new(metal, purity))?;
        let records = series.read().await.clone();
        Ok(history_window(records, since_days, Utc::now()))
    }
}

/// In-memory inventory keyed by shop, then item id.
#[derive(Clone, Default)]
pub struct MemoryInventory {
    inner: Arc<Mutex<HashMap<String, BTreeMap<String, PricedItem>>>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryRepository for MemoryInventory {
    async fn list_items(&self, shop_id: &str) -> Result<Vec<PricedItem>> {
        let shops = self.inner.lock().await;
        Ok(shops
            .get(shop_id)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_item(&self, item: PricedItem) -> Result<PricedItem> {
        let mut shops = self.inner.lock().await;
        shops
            .entry(item.shop_id.clone())
            .or_default()
            .insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn update_prices(
        &self,
        shop_id: &str,
        item_id: &str,
        cost_price: Decimal,
        selling_price: Decimal,
    ) -> Result<()> {
        let mut shops = self.inner.lock().await;
        let item = shops
            .get_mut(shop_id)
            .and_then(|items| items.get_mut(item_id))
            .ok_or_else(|| RateError::ItemUpdateFailure {
                item_id: item_id.to_string(),
                reason: format!("item not found in shop {shop_id}"),
            })?;
        item.cost_price = cost_price;
        item.selling_price = selling_price;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::RateSource;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn gold22(rate: Decimal) -> RateRecord {
        RateRecord::new(
            MetalType::Gold,
            Purity::karat(22),
            rate,
            RateSource::Api,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_current_rate_not_found() {
        let store = MemoryRateStore::new();
        let result = store.get_current(MetalType::Gold, Purity::karat(22)).await;
        assert!(matches!(result, Err(RateError::RateNotFound { .. })));
    }

    #[tokio::test]
    async fn test_single_active_after_upserts() {
        let store = MemoryRateStore::new();
        let mut last = None;
        for rate in [dec!(6000), dec!(6010), dec!(6020), dec!(6030)] {
            last = Some(store.upsert_active(gold22(rate)).await.unwrap());
        }

        let history = store
            .get_history(MetalType::Gold, Purity::karat(22), 30)
            .await
            .unwrap();
        let active: Vec<_> = history.iter().filter(|r| r.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, last.unwrap().id);
        assert_eq!(active[0].rate_per_gram, dec!(6030));
    }

    #[tokio::test]
    async fn test_history_is_append_only_newest_first() {
        let store = MemoryRateStore::new();
        let first = store.upsert_active(gold22(dec!(1))).await.unwrap();
        let second = store.upsert_active(gold22(dec!(2))).await.unwrap();
        let third = store.upsert_active(gold22(dec!(3))).await.unwrap();

        let history = store
            .get_history(MetalType::Gold, Purity::karat(22), 30)
            .await
            .unwrap();
        assert_eq!(history.len(), 3);
        let ids: Vec<_> = history.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        let rates: Vec<_> = history.iter().map(|r| r.rate_per_gram).collect();
        assert_eq!(rates, vec![dec!(3), dec!(2), dec!(1)]);
    }

    #[tokio::test]
    async fn test_pairs_are_independent() {
        let store = MemoryRateStore::new();
        store.upsert_active(gold22(dec!(6000))).await.unwrap();
        let gold18 = RateRecord::new(
            MetalType::Gold,
            Purity::karat(18),
            dec!(4900),
            RateSource::Api,
            Utc::now(),
        );
        store.upsert_active(gold18).await.unwrap();

        let current22 = store
            .get_current(MetalType::Gold, Purity::karat(22))
            .await
            .unwrap();
        assert!(current22.is_active);
        assert_eq!(current22.rate_per_gram, dec!(6000));
    }

    #[tokio::test]
    async fn test_history_window_excludes_old_records() {
        let store = MemoryRateStore::new();
        let mut old = gold22(dec!(5000));
        old.effective_date = Utc::now() - Duration::days(45);
        store.upsert_active(old).await.unwrap();
        store.upsert_active(gold22(dec!(6000))).await.unwrap();

        let recent = store
            .get_history(MetalType::Gold, Purity::karat(22), 30)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        let all = store
            .get_history(MetalType::Gold, Purity::karat(22), 60)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_anomalous_duplicate_active_picks_latest() {
        let store = MemoryRateStore::new();
        let mut older = gold22(dec!(5000));
        older.effective_date = Utc::now() - Duration::hours(3);
        let newer = gold22(dec!(6000));
        store.insert_raw(newer.clone()).await;
        store.insert_raw(older).await;

        let current = store
            .get_current(MetalType::Gold, Purity::karat(22))
            .await
            .unwrap();
        assert_eq!(current.id, newer.id);
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_active() {
        let store = MemoryRateStore::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.upsert_active(gold22(Decimal::from(6000 + i))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = store
            .get_history(MetalType::Gold, Purity::karat(22), 30)
            .await
            .unwrap();
        assert_eq!(history.len(), 16);
        assert_eq!(history.iter().filter(|r| r.is_active).count(), 1);
    }

    #[tokio::test]
    async fn test_writes_to_other_pairs_do_not_wait() {
        let store = MemoryRateStore::new();
        let gold22_series = store
            .series(RateKey::new(MetalType::Gold, Purity::karat(22)))
            .unwrap();
        let _held = gold22_series.write().await;

        let gold18 = RateRecord::new(
            MetalType::Gold,
            Purity::karat(18),
            dec!(4900),
            RateSource::Api,
            Utc::now(),
        );
        let written = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            store.upsert_active(gold18),
        )
        .await
        .expect("write to an unrelated pair was blocked")
        .unwrap();
        assert!(written.is_active);

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.get_current(MetalType::Gold, Purity::karat(22)),
        )
        .await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn test_inventory_update_prices() {
        let inventory = MemoryInventory::new();
        let item = PricedItem {
            id: "ring-1".to_string(),
            shop_id: "shop-a".to_string(),
            sku: "R-001".to_string(),
            metal_type: MetalType::Gold,
            purity: Purity::karat(22),
            net_weight_grams: dec!(5),
            gross_weight_grams: dec!(5.2),
            making_charges: dec!(300),
            wastage_percentage: dec!(2),
            cost_price: dec!(100),
            selling_price: dec!(115),
            is_available: true,
        };
        inventory.save_item(item).await.unwrap();
        inventory
            .update_prices("shop-a", "ring-1", dec!(200), dec!(230))
            .await
            .unwrap();

        let items = inventory.list_available("shop-a").await.unwrap();
        assert_eq!(items[0].cost_price, dec!(200));
        assert_eq!(items[0].selling_price, dec!(230));
        assert_eq!(items[0].making_charges, dec!(300));

        let missing = inventory
            .update_prices("shop-a", "nope", dec!(1), dec!(1))
            .await;
        assert!(matches!(missing, Err(RateError::ItemUpdateFailure { .. })));
    }
}
