//! Rate store contract shared by the persistent and in-memory stores.

use crate::core::error::Result;
use crate::core::metal::{MetalType, Purity};
use crate::core::rate::RateRecord;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

#[async_trait]
pub trait RateStore: Send + Sync {
    /// The active record for the pair, or `RateError::RateNotFound`.
    async fn get_current(&self, metal: MetalType, purity: Purity) -> Result<RateRecord>;

    /// Deactivates the pair's active records and inserts `record` as active,
    /// as one atomic write. Returns the stored record.
    async fn upsert_active(&self, record: RateRecord) -> Result<RateRecord>;

    /// Records with `effective_date` within the last `since_days`, newest first.
    async fn get_history(
        &self,
        metal: MetalType,
        purity: Purity,
        since_days: u32,
    ) -> Result<Vec<RateRecord>>;
}

/// Picks the active record with the latest effective date.
///
/// `records` must be in insertion order, oldest first. Ties on the effective
/// date go to the later insertion.
pub(crate) fn select_current<I>(records: I) -> Option<RateRecord>
where
    I: IntoIterator<Item = RateRecord>,
{
    let active: Vec<RateRecord> = records.into_iter().filter(|r| r.is_active).collect();
    if active.len() > 1 {
        warn!(
            count = active.len(),
            key = %active[0].key(),
            "Rate store consistency anomaly: more than one active record"
        );
    }
    // max_by_key returns the last of equal maxima.
    active.into_iter().max_by_key(|r| r.effective_date)
}

/// Filters by the history window and orders newest first.
///
/// `records` must be in insertion order, oldest first.
pub(crate) fn history_window<I>(records: I, since_days: u32, now: DateTime<Utc>) -> Vec<RateRecord>
where
    I: IntoIterator<Item = RateRecord>,
{
    let cutoff = now - Duration::days(i64::from(since_days));
    let mut history: Vec<RateRecord> = records
        .into_iter()
        .filter(|r| r.effective_date >= cutoff)
        .collect();
    history.reverse();
    // Stable sort keeps newest insertion first among equal dates.
    history.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
    history
}
