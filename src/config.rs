//! Runtime configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

use crate::ble::connection::ConnectionManager;
use crate::ble::scanner::DiscoveryCache;
use crate::ble::uuids::PRICE_CHARACTERISTIC_UUID;
use crate::data::ProductSeed;

/// Settings for a [`LabelManager`](crate::LabelManager).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Labels to manage, with their product and seed price range.
    pub catalog: Vec<ProductSeed>,
    /// How long a discovery scan listens for advertisements.
    #[serde(with = "duration_secs")]
    pub scan_window: Duration,
    /// How long a discovery result is reused.
    #[serde(with = "duration_secs")]
    pub discovery_ttl: Duration,
    /// Upper bound for one connect + write + disconnect transaction.
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Characteristic price payloads are written to.
    pub characteristic: Uuid,
    /// Number of trailing days synthesized on first run.
    pub seed_days: u32,
    /// Largest price accepted from the operator.
    pub max_price: Decimal,
}

impl SyncConfig {
    /// Default scan window (5 seconds).
    pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(5);

    /// Default number of seeded days.
    pub const DEFAULT_SEED_DAYS: u32 = 90;

    /// The stock three-label catalog.
    pub fn default_catalog() -> Vec<ProductSeed> {
        vec![
            ProductSeed::new("LABEL-1", "Rice 5kg", Decimal::new(2498, 2), Decimal::new(2976, 2)),
            ProductSeed::new("LABEL-2", "Beans 1kg", Decimal::new(299, 2), Decimal::new(773, 2)),
            ProductSeed::new(
                "LABEL-3",
                "Soybean oil 900ml",
                Decimal::new(419, 2),
                Decimal::new(799, 2),
            ),
        ]
    }

    /// Replace the catalog.
    pub fn with_catalog(mut self, catalog: Vec<ProductSeed>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the scan window.
    pub fn with_scan_window(mut self, window: Duration) -> Self {
        self.scan_window = window;
        self
    }

    /// Set the discovery time-to-live.
    pub fn with_discovery_ttl(mut self, ttl: Duration) -> Self {
        self.discovery_ttl = ttl;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the number of seeded days.
    pub fn with_seed_days(mut self, days: u32) -> Self {
        self.seed_days = days;
        self
    }

    /// Label names in catalog order.
    pub fn label_names(&self) -> Vec<String> {
        self.catalog.iter().map(|seed| seed.label.clone()).collect()
    }

    /// Label names as a set, the discovery cache key.
    pub fn expected_labels(&self) -> BTreeSet<String> {
        self.catalog.iter().map(|seed| seed.label.clone()).collect()
    }

    /// Catalog entry for a label.
    pub fn seed_for(&self, label: &str) -> Option<&ProductSeed> {
        self.catalog.iter().find(|seed| seed.label == label)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            catalog: Self::default_catalog(),
            scan_window: Self::DEFAULT_SCAN_WINDOW,
            discovery_ttl: DiscoveryCache::DEFAULT_TTL,
            connect_timeout: ConnectionManager::DEFAULT_CONNECT_TIMEOUT,
            characteristic: PRICE_CHARACTERISTIC_UUID,
            seed_days: Self::DEFAULT_SEED_DAYS,
            max_price: Decimal::new(9_999_999, 2),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
