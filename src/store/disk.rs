use crate::core::error::{RateError, Result};
use crate::core::inventory::{InventoryRepository, PricedItem};
use crate::core::metal::{MetalType, Purity};
use crate::core::rate::{RateKey, RateRecord};
use crate::core::rate_store::{RateStore, history_window, select_current};
use async_trait::async_trait;
use chrono::Utc;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::debug;

const RATES_PARTITION: &str = "rates";
const ITEMS_PARTITION: &str = "items";

/// Rate history persisted in a fjall partition.
///
/// Keys are `{METAL}/{purity}/{seq}` with a zero-padded per-pair sequence, so
/// a prefix scan yields a pair's records in insertion order. Readers take the
/// pair's read lock, so they never see a half-applied upsert.
pub struct DiskRateStore {
    keyspace: Arc<Keyspace>,
    rates: PartitionHandle,
    pair_locks: Mutex<HashMap<RateKey, Arc<RwLock<()>>>>,
}

impl DiskRateStore {
    pub fn new(keyspace: Arc<Keyspace>) -> Result<Self> {
        let rates = keyspace.open_partition(RATES_PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            rates,
            pair_locks: Mutex::new(HashMap::new()),
        })
    }

    fn pair_lock(&self, key: RateKey) -> Result<Arc<RwLock<()>>> {
        let mut locks = self
            .pair_locks
            .lock()
            .map_err(|_| RateError::Storage("pair lock table poisoned".to_string()))?;
        Ok(Arc::clone(locks.entry(key).or_default()))
    }

    /// Raw rows of a pair in insertion order, with their storage keys.
    fn load_series(&self, key: RateKey) -> Result<Vec<(Vec<u8>, RateRecord)>> {
        self.rates
            .prefix(series_prefix(key))
            .map(|kv| -> Result<(Vec<u8>, RateRecord)> {
                let (k, v) = kv?;
                let record: RateRecord = serde_json::from_slice(&v)?;
                Ok((k.to_vec(), record))
            })
            .collect()
    }

    fn next_seq(&self, key: RateKey) -> Result<u64> {
        match self.rates.prefix(series_prefix(key)).next_back() {
            Some(kv) => {
                let (k, _) = kv?;
                let last = std::str::from_utf8(&k)
                    .ok()
                    .and_then(|s| s.rsplit('/').next())
                    .and_then(|seq| seq.parse::<u64>().ok())
                    .ok_or_else(|| RateError::Storage(format!("Malformed rate key for {key}")))?;
                Ok(last + 1)
            }
            None => Ok(0),
        }
    }
}

fn series_prefix(key: RateKey) -> String {
    format!("{}/{}/", key.metal_type, key.purity)
}

fn record_key(key: RateKey, seq: u64) -> String {
    format!("{}{seq:020}", series_prefix(key))
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn get_current(&self, metal: MetalType, purity: Purity) -> Result<RateRecord> {
        let key = RateKey::new(metal, purity);
        let lock = self.pair_lock(key)?;
        let _guard = lock.read().await;
        let series = self.load_series(key)?;
        select_current(series.into_iter().map(|(_, r)| r))
            .ok_or(RateError::RateNotFound { metal, purity })
    }

    async fn upsert_active(&self, mut record: RateRecord) -> Result<RateRecord> {
        let key = record.key();
        let lock = self.pair_lock(key)?;
        let _guard = lock.write().await;

        let now = Utc::now();
        let mut batch = self.keyspace.batch();
        for (k, mut previous) in self.load_series(key)? {
            if previous.is_active {
                previous.is_active = false;
                previous.updated_at = now;
                batch.insert(&self.rates, k, serde_json::to_vec(&previous)?);
            }
        }

        record.is_active = true;
        let storage_key = record_key(key, self.next_seq(key)?);
        batch.insert(&self.rates, storage_key.as_str(), serde_json::to_vec(&record)?);
        batch.commit()?;

        debug!(%key, id = %record.id, "Disk store UPSERT");
        Ok(record)
    }

    async fn get_history(
        &self,
        metal: MetalType,
        purity: Purity,
        since_days: u32,
    ) -> Result<Vec<RateRecord>> {
        let key = RateKey::new(metal, purity);
        let lock = self.pair_lock(key)?;
        let _guard = lock.read().await;
        let series = self.load_series(key)?;
        Ok(history_window(
            series.into_iter().map(|(_, r)| r),
            since_days,
            Utc::now(),
        ))
    }
}

/// Priced items persisted as JSON under `{len}:{shop}/{item}` keys.
///
/// The shop segment is length-prefixed so a `/` inside a shop or item id can
/// never make two keys collide or leak one shop's items into another's scan.
pub struct DiskInventory {
    items: PartitionHandle,
}

impl DiskInventory {
    pub fn new(keyspace: &Keyspace) -> Result<Self> {
        let items = keyspace.open_partition(ITEMS_PARTITION, PartitionCreateOptions::default())?;
        Ok(Self { items })
    }
}

fn shop_prefix(shop_id: &str) -> String {
    format!("{}:{shop_id}/", shop_id.len())
}

fn item_key(shop_id: &str, item_id: &str) -> String {
    format!("{}{item_id}", shop_prefix(shop_id))
}

#[async_trait]
impl InventoryRepository for DiskInventory {
    async fn list_items(&self, shop_id: &str) -> Result<Vec<PricedItem>> {
        self.items
            .prefix(shop_prefix(shop_id))
            .map(|kv| -> Result<PricedItem> {
                let (_, v) = kv?;
                Ok(serde_json::from_slice(&v)?)
            })
            .collect()
    }

    async fn save_item(&self, item: PricedItem) -> Result<PricedItem> {
        self.items.insert(
            item_key(&item.shop_id, &item.id),
            serde_json::to_vec(&item)?,
        )?;
        debug!(shop = %item.shop_id, item = %item.id, "Disk inventory PUT");
        Ok(item)
    }

    async fn update_prices(
        &self,
        shop_id: &str,
        item_id: &str,
        cost_price: Decimal,
        selling_price: Decimal,
    ) -> Result<()> {
        let key = item_key(shop_id, item_id);
        let raw = self
            .items
            .get(&key)?
            .ok_or_else(|| RateError::ItemUpdateFailure {
                item_id: item_id.to_string(),
                reason: format!("item not found in shop {shop_id}"),
            })?;
        let mut item: PricedItem = serde_json::from_slice(&raw)?;
        item.cost_price = cost_price;
        item.selling_price = selling_price;
        self.items.insert(key, serde_json::to_vec(&item)?)?;
        Ok(())
    }
}
