#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use esl_price_sync::{
    Advertisement, DocumentStore, Error, LabelDocument, LabelTransport, MemoryStore, PriceEntry,
    Result,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Labels that answer scans and record every acknowledged write.
#[derive(Default)]
pub struct FakeTransport {
    online: Mutex<Vec<Advertisement>>,
    writes: Mutex<Vec<(String, Vec<u8>)>>,
    fail_writes: AtomicBool,
    scans: AtomicUsize,
    scan_delay: Mutex<Option<Duration>>,
}

impl FakeTransport {
    pub fn with_online(names: &[&str]) -> Arc<Self> {
        let transport = Self::default();
        *transport.online.lock() = names
            .iter()
            .map(|name| Advertisement::new(*name, format!("addr-{}", name)))
            .collect();
        Arc::new(transport)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn hang_scans(&self, delay: Duration) {
        *self.scan_delay.lock() = Some(delay);
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl LabelTransport for FakeTransport {
    async fn scan(&self, _window: Duration) -> Result<Vec<Advertisement>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let delay = *self.scan_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.online.lock().clone())
    }

    async fn connect_and_write(
        &self,
        address: &str,
        _characteristic: Uuid,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::WriteRejected {
                address: address.to_string(),
                reason: "no acknowledgement".to_string(),
            });
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.writes.lock().push((address.to_string(), data.to_vec()));
        Ok(())
    }
}

/// Memory store that can be switched to fail every operation.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    down: AtomicBool,
}

impl FlakyStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(Error::Persistence {
                reason: "store unreachable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn count(&self, names: &[String]) -> Result<usize> {
        self.check()?;
        self.inner.count(names).await
    }

    async fn find_by_names(&self, names: &[String]) -> Result<Vec<LabelDocument>> {
        self.check()?;
        self.inner.find_by_names(names).await
    }

    async fn upsert_document(&self, document: LabelDocument) -> Result<()> {
        self.check()?;
        self.inner.upsert_document(document).await
    }

    async fn pull_day(&self, name: &str, day: NaiveDate) -> Result<()> {
        self.check()?;
        self.inner.pull_day(name, day).await
    }

    async fn push_entry(&self, name: &str, entry: PriceEntry) -> Result<()> {
        self.check()?;
        self.inner.push_entry(name, entry).await
    }

    async fn replace_day(&self, name: &str, entry: PriceEntry) -> Result<()> {
        self.check()?;
        self.inner.replace_day(name, entry).await
    }

    async fn set_last_contact(&self, name: &str, at: NaiveDateTime) -> Result<()> {
        self.check()?;
        self.inner.set_last_contact(name, at).await
    }
}
