//! Error taxonomy for rate acquisition, storage and valuation.

use crate::core::metal::{MetalType, Purity};
use std::fmt::Display;
use thiserror::Error;

/// Upstream feed that produced an `UpstreamUnavailable` failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFeed {
    Spot,
    Fx,
}

impl Display for UpstreamFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamFeed::Spot => write!(f, "spot"),
            UpstreamFeed::Fx => write!(f, "fx"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RateError {
    #[error("Upstream {feed} feed unavailable: {reason}")]
    UpstreamUnavailable { feed: UpstreamFeed, reason: String },

    #[error("No active rate for {metal} {purity}")]
    RateNotFound { metal: MetalType, purity: Purity },

    #[error("Invalid valuation input: {0}")]
    InvalidValuationInput(String),

    #[error("Failed to update item {item_id}: {reason}")]
    ItemUpdateFailure { item_id: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl RateError {
    pub fn upstream(feed: UpstreamFeed, reason: impl Into<String>) -> Self {
        RateError::UpstreamUnavailable {
            feed,
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        RateError::InvalidValuationInput(reason.into())
    }
}

impl From<fjall::Error> for RateError {
    fn from(e: fjall::Error) -> Self {
        RateError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for RateError {
    fn from(e: serde_json::Error) -> Self {
        RateError::Storage(format!("Failed to (de)serialize record: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, RateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_names_feed() {
        let err = RateError::upstream(UpstreamFeed::Fx, "HTTP error: 503");
        assert_eq!(
            err.to_string(),
            "Upstream fx feed unavailable: HTTP error: 503"
        );
    }

    #[test]
    fn test_rate_not_found_message() {
        let err = RateError::RateNotFound {
            metal: MetalType::Gold,
            purity: Purity::karat(22),
        };
        assert_eq!(err.to_string(), "No active rate for GOLD 22");
    }
}
