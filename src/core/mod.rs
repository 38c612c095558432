//! Core business logic abstractions

pub mod acquisition;
pub mod config;
pub mod currency;
pub mod error;
pub mod inventory;
pub mod log;
pub mod metal;
pub mod propagation;
pub mod purity;
pub mod quote;
pub mod rate;
pub mod rate_store;
pub mod scheduler;
pub mod service;
pub mod valuation;

// Re-export main types for cleaner imports
pub use currency::CurrencyRateProvider;
pub use error::{RateError, Result};
pub use inventory::{InventoryRepository, PricedItem};
pub use metal::{MetalType, Purity};
pub use quote::{QuoteSource, SpotPriceProvider};
pub use rate::{RateRecord, RateSource};
pub use rate_store::RateStore;
pub use service::RateService;
