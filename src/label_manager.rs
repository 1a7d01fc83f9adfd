//! Label manager: the entry point for a UI binding.
//!
//! Wires discovery, connections, the ledger and the per-label panels
//! together. Each label panel is locked independently, so acting on one
//! label never blocks rendering or sending on another.

use chrono::Local;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ble::connection::ConnectionManager;
use crate::ble::scanner::{DiscoveryCache, DiscoveryResult};
use crate::ble::transport::{BtleplugTransport, LabelTransport};
use crate::config::SyncConfig;
use crate::data::{HistoryPoint, LabelDocument};
use crate::error::{Error, Result};
use crate::ledger::PriceLedger;
use crate::session::{LabelPanel, PanelView, SessionReconciler};
use crate::store::DocumentStore;

/// Central manager for a set of shelf labels.
pub struct LabelManager {
    config: SyncConfig,
    discovery: DiscoveryCache,
    reconciler: SessionReconciler,
    ledger: Arc<PriceLedger>,
    panels: RwLock<HashMap<String, Arc<Mutex<LabelPanel>>>>,
}

impl LabelManager {
    /// Create a manager over an arbitrary transport and store.
    ///
    /// Call [`start`](Self::start) before using the panels.
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn LabelTransport>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let connection = Arc::new(
            ConnectionManager::new(transport.clone())
                .with_characteristic(config.characteristic)
                .with_connect_timeout(config.connect_timeout),
        );
        let ledger = Arc::new(PriceLedger::new(store));
        let reconciler = SessionReconciler::new(connection, ledger.clone(), config.max_price);

        Self {
            discovery: DiscoveryCache::new(transport, config.discovery_ttl),
            reconciler,
            ledger,
            config,
            panels: RwLock::new(HashMap::new()),
        }
    }

    /// Create a manager using the system Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn with_bluetooth(config: SyncConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let transport = BtleplugTransport::new().await?;
        Ok(Self::new(config, Arc::new(transport), store))
    }

    /// Seed the ledger on first run and load one panel per catalog label.
    pub async fn start(&self) -> Result<()> {
        let catalog = &self.config.catalog;
        let today = Local::now().date_naive();

        if self
            .ledger
            .seed_if_empty(catalog, self.config.seed_days, today)
            .await?
        {
            info!("Seeded price history for {} labels", catalog.len());
        }
        self.ledger.ensure_labels(catalog).await?;

        let documents = self.ledger.documents(&self.config.label_names()).await?;
        let by_name: HashMap<&str, &LabelDocument> =
            documents.iter().map(|d| (d.name.as_str(), d)).collect();

        let mut panels = HashMap::new();
        for seed in catalog {
            let panel = match by_name.get(seed.label.as_str()) {
                Some(doc) => LabelPanel::from_document(doc),
                None => LabelPanel::new(&seed.label, &seed.product),
            };
            panels.insert(seed.label.clone(), Arc::new(Mutex::new(panel)));
        }

        *self.panels.write() = panels;
        info!("Loaded {} label panels", catalog.len());

        Ok(())
    }

    /// The active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The price ledger.
    pub fn ledger(&self) -> &Arc<PriceLedger> {
        &self.ledger
    }

    /// Label names in catalog order.
    pub fn label_names(&self) -> Vec<String> {
        self.config.label_names()
    }

    /// Labels currently online, scanning only when the cached result expired.
    pub async fn discover(&self) -> DiscoveryResult {
        self.discovery
            .discover(&self.config.expected_labels(), self.config.scan_window)
            .await
    }

    /// Drop the cached discovery result and scan again.
    pub async fn rescan(&self) -> DiscoveryResult {
        self.discovery.invalidate().await;
        self.discover().await
    }

    /// Render every panel in catalog order.
    pub async fn refresh(&self) -> Vec<PanelView> {
        let discovery = self.discover().await;
        let mut views = Vec::new();

        for name in self.label_names() {
            match self.render_with(&name, &discovery).await {
                Ok(view) => views.push(view),
                Err(e) => warn!("Skipping panel {}: {}", name, e),
            }
        }

        views
    }

    /// Render one panel, applying any deferred draft clear.
    pub async fn render(&self, name: &str) -> Result<PanelView> {
        let discovery = self.discover().await;
        self.render_with(name, &discovery).await
    }

    /// Forward a change of the price input.
    pub async fn on_draft_change(&self, name: &str, text: &str) -> Result<()> {
        let panel = self.panel(name)?;
        panel.lock().await.on_draft_change(text);
        Ok(())
    }

    /// Send the panel's draft to its label.
    ///
    /// The panel stays locked until the send finishes, so renders of this
    /// panel wait for it while other panels are unaffected. Send failures are
    /// reported through the returned view's message; only an unknown label is
    /// returned as an error.
    pub async fn on_send(&self, name: &str) -> Result<PanelView> {
        let panel = self.panel(name)?;
        let mut panel = panel.lock().await;

        let discovery = self.discover().await;
        let online = discovery.is_online(name);

        match self.reconciler.send(&mut panel, &discovery).await {
            Ok(ack) => debug!("{}: send acknowledged by {}", name, ack.address),
            Err(e) => warn!("{}: send did not complete cleanly: {}", name, e),
        }

        Ok(panel.view(online))
    }

    /// Flattened price history for the history report.
    pub async fn price_history(&self) -> Result<Vec<HistoryPoint>> {
        self.ledger.history_report(&self.label_names()).await
    }

    async fn render_with(&self, name: &str, discovery: &DiscoveryResult) -> Result<PanelView> {
        let panel = self.panel(name)?;
        let view = panel.lock().await.render(discovery.is_online(name));
        Ok(view)
    }

    fn panel(&self, name: &str) -> Result<Arc<Mutex<LabelPanel>>> {
        self.panels
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::LabelNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::transport::MockLabelTransport;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_unknown_label() {
        let manager = LabelManager::new(
            SyncConfig::default().with_seed_days(3),
            Arc::new(MockLabelTransport::new()),
            Arc::new(MemoryStore::new()),
        );
        manager.start().await.unwrap();

        assert!(matches!(
            manager.on_draft_change("LABEL-9", "1").await,
            Err(Error::LabelNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_seeds_and_loads_panels() {
        let store = Arc::new(MemoryStore::new());
        let manager = LabelManager::new(
            SyncConfig::default().with_seed_days(5),
            Arc::new(MockLabelTransport::new()),
            store.clone(),
        );
        manager.start().await.unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("LABEL-2").unwrap().history_list.len(), 5);
        assert_eq!(manager.panels.read().len(), 3);
    }
}
