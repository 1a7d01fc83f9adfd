//! Label discovery.
//!
//! Scans for labels advertising one of the expected names and memoizes the
//! result for a fixed time-to-live so frequent UI refreshes do not keep the
//! radio busy.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ble::transport::{Advertisement, LabelTransport};

/// Extra time granted to the transport on top of the scan window before the
/// scan is abandoned.
const SCAN_GRACE: Duration = Duration::from_secs(2);

/// Mapping from label name to transport address for labels seen in a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    labels: HashMap<String, String>,
}

impl DiscoveryResult {
    /// A result with no labels online.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a result from advertisements, keeping only `expected` names.
    ///
    /// When a name is advertised more than once the strongest signal wins.
    pub fn from_advertisements(
        advertisements: impl IntoIterator<Item = Advertisement>,
        expected: &BTreeSet<String>,
    ) -> Self {
        let mut best: HashMap<String, Advertisement> = HashMap::new();

        for adv in advertisements {
            if !expected.contains(&adv.name) {
                continue;
            }
            let stronger = best
                .get(&adv.name)
                .map(|current| adv.rssi.unwrap_or(i16::MIN) > current.rssi.unwrap_or(i16::MIN))
                .unwrap_or(true);
            if stronger {
                best.insert(adv.name.clone(), adv);
            }
        }

        Self {
            labels: best
                .into_iter()
                .map(|(name, adv)| (name, adv.address))
                .collect(),
        }
    }

    /// Address of a label, if it is online.
    pub fn address(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Whether a label was seen in the scan.
    pub fn is_online(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    /// Number of labels online.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label is online.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Online label names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.labels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

struct CacheEntry {
    key: BTreeSet<String>,
    result: DiscoveryResult,
    expires_at: Instant,
}

/// Memoizing front end for label scans.
///
/// Only one scan runs at a time; callers arriving during a scan wait for it
/// and share its result.
pub struct DiscoveryCache {
    transport: Arc<dyn LabelTransport>,
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl DiscoveryCache {
    /// Default time-to-live for a scan result (30 seconds).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

    /// Create a cache over `transport`.
    pub fn new(transport: Arc<dyn LabelTransport>, ttl: Duration) -> Self {
        Self {
            transport,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the labels from `expected` that are online.
    ///
    /// A result for the same expected set younger than the TTL is returned
    /// without scanning. Otherwise a scan of `scan_window` runs. A scan that
    /// finds nothing or runs out of time yields an empty result; a transport
    /// failure also yields an empty result but is not memoized.
    pub async fn discover(
        &self,
        expected: &BTreeSet<String>,
        scan_window: Duration,
    ) -> DiscoveryResult {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.key == *expected && Instant::now() < cached.expires_at {
                debug!("Using cached discovery result ({} online)", cached.result.len());
                return cached.result.clone();
            }
        }

        info!("Scanning for {} labels", expected.len());

        let result = match tokio::time::timeout(
            scan_window + SCAN_GRACE,
            self.transport.scan(scan_window),
        )
        .await
        {
            Ok(Ok(advertisements)) => DiscoveryResult::from_advertisements(advertisements, expected),
            Ok(Err(e)) => {
                warn!("Label scan failed: {}", e);
                *entry = None;
                return DiscoveryResult::empty();
            }
            Err(_) => {
                warn!("Label scan did not finish within {:?}", scan_window + SCAN_GRACE);
                match tokio::time::timeout(SCAN_GRACE, self.transport.stop_scan()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Failed to stop abandoned scan: {}", e),
                    Err(_) => warn!("Stopping the abandoned scan did not finish"),
                }
                DiscoveryResult::empty()
            }
        };

        info!("Labels online: {:?}", result.names());

        *entry = Some(CacheEntry {
            key: expected.clone(),
            result: result.clone(),
            expires_at: Instant::now() + self.ttl,
        });

        result
    }

    /// Drop the memoized result so the next call scans.
    pub async fn invalidate(&self) {
        *self.entry.lock().await = None;
    }
}
