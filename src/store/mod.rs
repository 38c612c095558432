pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use disk::{DiskInventory, DiskRateStore};
use fjall::{Keyspace, PersistMode};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Persistent rate history and inventory sharing one fjall keyspace.
pub struct Storage {
    keyspace: Arc<Keyspace>,
    pub rates: Arc<DiskRateStore>,
    pub inventory: Arc<DiskInventory>,
}

impl Storage {
    pub fn open(config: &AppConfig) -> Result<Self> {
        let data_path = config.default_data_path()?;
        Self::open_at(&data_path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path.join("db"))
            .open()
            .with_context(|| format!("Failed to open rate database at {}", path.display()))?;
        let keyspace = Arc::new(keyspace);
        debug!(path = %path.display(), "Opened rate database");

        let rates =
            DiskRateStore::new(Arc::clone(&keyspace)).context("Failed to open rate history")?;
        let inventory = DiskInventory::new(&keyspace).context("Failed to open inventory")?;
        Ok(Self {
            keyspace,
            rates: Arc::new(rates),
            inventory: Arc::new(inventory),
        })
    }

    /// Flushes committed writes to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist rate database")
    }
}
