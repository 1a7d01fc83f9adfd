//! Document store persisted as a single JSON file.
//!
//! The whole collection is held in memory and written back after every
//! mutation through a temporary file that is renamed over the target.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{apply_pull, apply_push, apply_replace, DocumentStore};
use crate::data::{LabelDocument, PriceEntry};
use crate::error::Result;

/// JSON-file backed [`DocumentStore`].
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    documents: Mutex<Vec<LabelDocument>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let documents = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let mut documents: Vec<LabelDocument> = serde_json::from_slice(&bytes)?;
                for doc in &mut documents {
                    doc.history_list.normalize();
                }
                info!("Loaded {} label documents from {}", documents.len(), path.display());
                documents
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            documents: Mutex::new(documents),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, documents: &[LabelDocument]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(documents)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    async fn update(&self, name: &str, f: impl FnOnce(&mut LabelDocument) + Send) -> Result<()> {
        let mut documents = self.documents.lock().await;

        let mut updated = documents.clone();
        match updated.iter_mut().find(|doc| doc.name == name) {
            Some(doc) => f(doc),
            None => {
                let mut doc = LabelDocument::new(name, "");
                f(&mut doc);
                updated.push(doc);
            }
        }

        self.persist(&updated).await?;
        *documents = updated;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn count(&self, names: &[String]) -> Result<usize> {
        let documents = self.documents.lock().await;
        Ok(documents.iter().filter(|d| names.contains(&d.name)).count())
    }

    async fn find_by_names(&self, names: &[String]) -> Result<Vec<LabelDocument>> {
        let documents = self.documents.lock().await;
        Ok(documents
            .iter()
            .filter(|d| names.contains(&d.name))
            .cloned()
            .collect())
    }

    async fn upsert_document(&self, document: LabelDocument) -> Result<()> {
        let mut documents = self.documents.lock().await;

        let mut updated = documents.clone();
        match updated.iter_mut().find(|d| d.name == document.name) {
            Some(existing) => *existing = document,
            None => updated.push(document),
        }

        self.persist(&updated).await?;
        *documents = updated;
        Ok(())
    }

    async fn pull_day(&self, name: &str, day: NaiveDate) -> Result<()> {
        self.update(name, |doc| apply_pull(doc, day)).await
    }

    async fn push_entry(&self, name: &str, entry: PriceEntry) -> Result<()> {
        self.update(name, |doc| apply_push(doc, entry)).await
    }

    async fn replace_day(&self, name: &str, entry: PriceEntry) -> Result<()> {
        self.update(name, |doc| apply_replace(doc, entry)).await
    }

    async fn set_last_contact(&self, name: &str, at: NaiveDateTime) -> Result<()> {
        self.update(name, |doc| doc.last_contact = Some(at)).await
    }
}
