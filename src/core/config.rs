use crate::core::metal::{MetalType, Purity};
use anyhow::{Context, Result};
use chrono::NaiveTime;
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurrencyConfig {
    /// Currency the spot feed quotes in.
    pub quote: String,
    /// Currency rates are stored and items are priced in.
    pub local: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpotProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurrencyProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub spot: Option<SpotProviderConfig>,
    pub currency: Option<CurrencyProviderConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl ProvidersConfig {
    pub fn spot_base_url(&self) -> &str {
        self.spot
            .as_ref()
            .map_or("https://data-asg.goldprice.org", |p| &p.base_url)
    }

    pub fn currency_base_url(&self) -> &str {
        self.currency.as_ref().map_or(
            "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest",
            |p| &p.base_url,
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            spot: Some(SpotProviderConfig {
                base_url: "https://data-asg.goldprice.org".to_string(),
            }),
            currency: Some(CurrencyProviderConfig {
                base_url: "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest"
                    .to_string(),
            }),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ValuationConfig {
    pub tax_rate: Decimal,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        ValuationConfig {
            tax_rate: crate::core::valuation::DEFAULT_TAX_RATE,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatesConfig {
    /// Acquire a rate when a pair has no active record.
    #[serde(default = "default_true")]
    pub refresh_on_miss: bool,
    /// Refresh active records older than this. Unset means never stale.
    #[serde(default)]
    pub stale_after_hours: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            refresh_on_miss: true,
            stale_after_hours: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct RatePair {
    pub metal: MetalType,
    pub purity: Purity,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AcquisitionConfig {
    /// Daily run time, `HH:MM` in UTC.
    pub daily_at: String,
    pub retries: usize,
    pub retry_delay_ms: u64,
    pub pairs: Vec<RatePair>,
}

impl AcquisitionConfig {
    pub fn daily_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.daily_at, "%H:%M")
            .with_context(|| format!("Invalid acquisition.daily_at '{}', expected HH:MM", self.daily_at))
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        let pairs = MetalType::ALL
            .iter()
            .flat_map(|metal| {
                [24, 22, 18].map(|karat| RatePair {
                    metal: *metal,
                    purity: Purity::karat(karat),
                })
            })
            .collect();
        AcquisitionConfig {
            daily_at: "03:30".to_string(),
            retries: 2,
            retry_delay_ms: 1000,
            pairs,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PropagationConfig {
    pub concurrency: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        PropagationConfig { concurrency: 4 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub valuation: ValuationConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub propagation: PropagationConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "bullion")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "codito", "bullion")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
