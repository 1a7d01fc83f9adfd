//! Persistence seam for label documents.
//!
//! The ledger sees the store as one collection of [`LabelDocument`]s keyed by
//! label name. Each operation must be atomic for the document it touches;
//! the ledger composes them under its own per-label lock.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::data::{LabelDocument, PriceEntry};
use crate::error::Result;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// A key-scoped document store holding one document per label.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Number of documents whose name is in `names`.
    async fn count(&self, names: &[String]) -> Result<usize>;

    /// All documents whose name is in `names`, in store order.
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<LabelDocument>>;

    /// Insert `document`, replacing any document with the same name.
    async fn upsert_document(&self, document: LabelDocument) -> Result<()>;

    /// Remove the history entry for `day`, creating the document if missing.
    async fn pull_day(&self, name: &str, day: NaiveDate) -> Result<()>;

    /// Add `entry` to the history in day order, creating the document if missing.
    async fn push_entry(&self, name: &str, entry: PriceEntry) -> Result<()>;

    /// Replace whatever entry exists for `entry.day` with `entry` in one step,
    /// creating the document if missing.
    ///
    /// Either the old entry or the new one is stored afterwards, never neither.
    async fn replace_day(&self, name: &str, entry: PriceEntry) -> Result<()>;

    /// Set the last-contact time, creating the document if missing.
    async fn set_last_contact(&self, name: &str, at: NaiveDateTime) -> Result<()>;
}

/// Apply a pull to an in-memory collection.
pub(crate) fn apply_pull(document: &mut LabelDocument, day: NaiveDate) {
    document.history_list.remove_day(day);
}

/// Apply a push to an in-memory collection.
pub(crate) fn apply_push(document: &mut LabelDocument, entry: PriceEntry) {
    document.history_list.upsert(entry);
}

/// Apply a same-day replacement to an in-memory collection.
pub(crate) fn apply_replace(document: &mut LabelDocument, entry: PriceEntry) {
    apply_pull(document, entry.day);
    apply_push(document, entry);
}
