//! In-memory document store.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{apply_pull, apply_push, apply_replace, DocumentStore};
use crate::data::{LabelDocument, PriceEntry};
use crate::error::Result;

/// Document store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, LabelDocument>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `documents`.
    pub fn with_documents(documents: impl IntoIterator<Item = LabelDocument>) -> Self {
        Self {
            documents: RwLock::new(
                documents
                    .into_iter()
                    .map(|doc| (doc.name.clone(), doc))
                    .collect(),
            ),
        }
    }

    /// Snapshot of one document.
    pub fn get(&self, name: &str) -> Option<LabelDocument> {
        self.documents.read().get(name).cloned()
    }

    /// Total number of documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut LabelDocument)) {
        let mut documents = self.documents.write();
        let document = documents
            .entry(name.to_string())
            .or_insert_with(|| LabelDocument::new(name, ""));
        f(document);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, names: &[String]) -> Result<usize> {
        let documents = self.documents.read();
        Ok(names.iter().filter(|n| documents.contains_key(*n)).count())
    }

    async fn find_by_names(&self, names: &[String]) -> Result<Vec<LabelDocument>> {
        let documents = self.documents.read();
        Ok(documents
            .values()
            .filter(|doc| names.contains(&doc.name))
            .cloned()
            .collect())
    }

    async fn upsert_document(&self, document: LabelDocument) -> Result<()> {
        self.documents
            .write()
            .insert(document.name.clone(), document);
        Ok(())
    }

    async fn pull_day(&self, name: &str, day: NaiveDate) -> Result<()> {
        self.update(name, |doc| apply_pull(doc, day));
        Ok(())
    }

    async fn push_entry(&self, name: &str, entry: PriceEntry) -> Result<()> {
        self.update(name, |doc| apply_push(doc, entry));
        Ok(())
    }

    async fn replace_day(&self, name: &str, entry: PriceEntry) -> Result<()> {
        self.update(name, |doc| apply_replace(doc, entry));
        Ok(())
    }

    async fn set_last_contact(&self, name: &str, at: NaiveDateTime) -> Result<()> {
        self.update(name, |doc| doc.last_contact = Some(at));
        Ok(())
    }
}
