//! Persisted rate records

use crate::core::metal::{MetalType, Purity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateSource {
    Api,
    Manual,
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateSource::Api => write!(f, "API"),
            RateSource::Manual => write!(f, "MANUAL"),
        }
    }
}

/// Identifies the time series a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct RateKey {
    pub metal_type: MetalType,
    pub purity: Purity,
}

impl RateKey {
    pub fn new(metal_type: MetalType, purity: Purity) -> Self {
        Self { metal_type, purity }
    }
}

impl Display for RateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.metal_type, self.purity)
    }
}

/// One quote for a metal/purity pair at a point in time.
///
/// Records are append-only. After insertion only `is_active` and
/// `updated_at` ever change, when a newer record supersedes this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    pub id: Uuid,
    pub metal_type: MetalType,
    #[serde(rename = "purityKarat")]
    pub purity: Purity,
    pub rate_per_gram: Decimal,
    pub source: RateSource,
    pub effective_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RateRecord {
    pub fn new(
        metal_type: MetalType,
        purity: Purity,
        rate_per_gram: Decimal,
        source: RateSource,
        effective_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            metal_type,
            purity,
            rate_per_gram,
            source,
            effective_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> RateKey {
        RateKey::new(self.metal_type, self.purity)
    }

    /// Age of the quote relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.effective_date
    }
}
