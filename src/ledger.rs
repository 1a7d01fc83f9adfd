//! Durable per-label price history.
//!
//! The ledger is the only writer of price history. Writes for one label are
//! serialized so a same-day overwrite cannot race with itself; writes for
//! different labels proceed independently.

use chrono::{Local, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::data::{HistoryPoint, LabelDocument, PriceEntry, PriceHistory, ProductSeed};
use crate::error::{Error, Result};
use crate::store::DocumentStore;
use crate::utils::round_price;

/// Build synthetic history documents for a first run.
///
/// Each product gets one entry per day for the `days` days ending on `today`,
/// following a bounded random walk inside the product's price range.
pub fn seed_documents<R: Rng>(
    catalog: &[ProductSeed],
    days: u32,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<LabelDocument> {
    catalog
        .iter()
        .map(|seed| {
            let mut document = LabelDocument::new(&seed.label, &seed.product);
            let min = to_cents(seed.min_price);
            let max = to_cents(seed.max_price).max(min);
            let step = ((max - min) / 10).max(1);

            let mut cents = rng.gen_range(min..=max);
            for offset in (0..days).rev() {
                let day = today - chrono::Duration::days(i64::from(offset));
                document
                    .history_list
                    .upsert(PriceEntry::new(day, Decimal::new(cents, 2)));
                cents = (cents + rng.gen_range(-step..=step)).clamp(min, max);
            }
            document
        })
        .collect()
}

fn to_cents(price: Decimal) -> i64 {
    (round_price(price) * Decimal::ONE_HUNDRED)
        .to_i64()
        .unwrap_or(0)
        .max(0)
}

fn as_persistence(error: Error) -> Error {
    match error {
        Error::Persistence { .. } => error,
        other => Error::persistence(other),
    }
}

/// Day-keyed price history for all labels.
pub struct PriceLedger {
    store: Arc<dyn DocumentStore>,
    label_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PriceLedger {
    /// Create a ledger over `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            label_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Record `price` for `label` on `day`, stamping the last contact with now.
    ///
    /// Returns the label's resulting last-contact time.
    pub async fn record_price(
        &self,
        label: &str,
        day: NaiveDate,
        price: Decimal,
    ) -> Result<NaiveDateTime> {
        self.record_price_at(label, day, price, Local::now().naive_local())
            .await
    }

    /// Record `price` for `label` on `day`, contacted at `at`.
    ///
    /// An existing entry for the same day is replaced, never duplicated. The
    /// last-contact time only moves forward: an `at` older than the stored
    /// value leaves it untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedPrice`] for a negative price
    /// - [`Error::Persistence`] if the store fails
    pub async fn record_price_at(
        &self,
        label: &str,
        day: NaiveDate,
        price: Decimal,
        at: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(Error::malformed(price.to_string(), "price cannot be negative"));
        }
        let price = round_price(price);

        let lock = self.label_lock(label);
        let _guard = lock.lock().await;

        self.store
            .replace_day(label, PriceEntry::new(day, price))
            .await
            .map_err(as_persistence)?;

        let previous = self.document(label).await?.and_then(|doc| doc.last_contact);
        let last_contact = match previous {
            Some(prev) if prev > at => {
                warn!(
                    "Ignoring last contact {} for {}, already at {}",
                    at, label, prev
                );
                prev
            }
            _ => {
                self.store
                    .set_last_contact(label, at)
                    .await
                    .map_err(as_persistence)?;
                at
            }
        };

        debug!("Recorded {} for {} on {}", price, label, day);

        Ok(last_contact)
    }

    /// Price of the most recent entry, or zero if the history is empty.
    pub async fn current_price(&self, label: &str) -> Result<Decimal> {
        Ok(self.history(label).await?.current_price())
    }

    /// Full history of a label, oldest first.
    pub async fn history(&self, label: &str) -> Result<PriceHistory> {
        Ok(self
            .document(label)
            .await?
            .map(|doc| doc.history_list)
            .unwrap_or_default())
    }

    /// Last acknowledged contact with a label.
    pub async fn last_contact(&self, label: &str) -> Result<Option<NaiveDateTime>> {
        Ok(self.document(label).await?.and_then(|doc| doc.last_contact))
    }

    /// Documents for all of `labels` that exist in the store.
    pub async fn documents(&self, labels: &[String]) -> Result<Vec<LabelDocument>> {
        let mut documents = self
            .store
            .find_by_names(labels)
            .await
            .map_err(as_persistence)?;
        for doc in &mut documents {
            doc.history_list.normalize();
        }
        Ok(documents)
    }

    /// Flattened price points for all of `labels`, ordered by product then day.
    pub async fn history_report(&self, labels: &[String]) -> Result<Vec<HistoryPoint>> {
        let mut points: Vec<HistoryPoint> = self
            .documents(labels)
            .await?
            .into_iter()
            .flat_map(|doc| {
                let product = doc.display_product().to_string();
                doc.history_list
                    .entries()
                    .iter()
                    .map(|entry| HistoryPoint {
                        product: product.clone(),
                        day: entry.day,
                        price: entry.price,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        points.sort_by(|a, b| a.product.cmp(&b.product).then(a.day.cmp(&b.day)));
        Ok(points)
    }

    /// Seed synthetic history when the store holds no catalog label yet.
    ///
    /// Returns `true` if seeding ran.
    pub async fn seed_if_empty(
        &self,
        catalog: &[ProductSeed],
        days: u32,
        today: NaiveDate,
    ) -> Result<bool> {
        let mut rng = StdRng::from_entropy();
        self.seed_if_empty_with(catalog, days, today, &mut rng).await
    }

    /// [`seed_if_empty`](Self::seed_if_empty) with a caller-supplied RNG.
    pub async fn seed_if_empty_with<R: Rng>(
        &self,
        catalog: &[ProductSeed],
        days: u32,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<bool> {
        let names: Vec<String> = catalog.iter().map(|s| s.label.clone()).collect();
        let existing = self.store.count(&names).await.map_err(as_persistence)?;
        if existing > 0 {
            debug!("Store already holds {} labels, not seeding", existing);
            return Ok(false);
        }

        let documents = seed_documents(catalog, days, today, rng);

        info!(
            "Seeding {} days of history for {} labels",
            days,
            documents.len()
        );

        for document in documents {
            self.store
                .upsert_document(document)
                .await
                .map_err(as_persistence)?;
        }

        Ok(true)
    }

    /// Create empty documents for catalog labels missing from the store.
    ///
    /// Returns the number of documents created.
    pub async fn ensure_labels(&self, catalog: &[ProductSeed]) -> Result<usize> {
        let names: Vec<String> = catalog.iter().map(|s| s.label.clone()).collect();
        let present: Vec<String> = self
            .documents(&names)
            .await?
            .into_iter()
            .map(|doc| doc.name)
            .collect();

        let mut created = 0;
        for seed in catalog.iter().filter(|s| !present.contains(&s.label)) {
            info!("Creating empty history for {}", seed.label);
            self.store
                .upsert_document(LabelDocument::new(&seed.label, &seed.product))
                .await
                .map_err(as_persistence)?;
            created += 1;
        }

        Ok(created)
    }

    async fn document(&self, label: &str) -> Result<Option<LabelDocument>> {
        Ok(self
            .documents(&[label.to_string()])
            .await?
            .into_iter()
            .next())
    }

    fn label_lock(&self, label: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.label_locks
            .lock()
            .entry(label.to_string())
            .or_default()
            .clone()
    }
}
