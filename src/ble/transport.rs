//! BLE transport seam.
//!
//! [`LabelTransport`] is the only place the crate touches the radio. The
//! production implementation is [`BtleplugTransport`]; tests substitute their
//! own implementations.

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Upper bound for tearing down a link after a write.
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Advertised local name, e.g. `LABEL-1`.
    pub name: String,
    /// Transport address used to connect to the peripheral.
    pub address: String,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

impl Advertisement {
    /// Create an advertisement without signal strength.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            rssi: None,
        }
    }
}

/// Radio operations needed to discover and update labels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelTransport: Send + Sync {
    /// Listen for advertisements for `window` and return every named
    /// peripheral that advertised inside it.
    async fn scan(&self, window: Duration) -> Result<Vec<Advertisement>>;

    /// Stop a scan that was abandoned before it returned.
    async fn stop_scan(&self) -> Result<()> {
        Ok(())
    }

    /// Connect to `address`, write `data` to `characteristic` with response,
    /// then disconnect.
    ///
    /// Connecting and writing must finish within `timeout`. The link is torn
    /// down whether or not the write succeeded. Returns `Ok(())` only if the
    /// write was acknowledged.
    async fn connect_and_write(
        &self,
        address: &str,
        characteristic: Uuid,
        data: &[u8],
        timeout: Duration,
    ) -> Result<()>;
}

/// [`LabelTransport`] backed by the host Bluetooth adapter through `btleplug`.
pub struct BtleplugTransport {
    adapter: Adapter,
}

impl BtleplugTransport {
    /// Open the first Bluetooth adapter on the system.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter })
    }

    /// Use a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    async fn find_peripheral(&self, address: &str) -> Result<Peripheral> {
        let peripherals = self.adapter.peripherals().await.map_err(Error::Bluetooth)?;

        peripherals
            .into_iter()
            .find(|p| p.id().to_string() == address)
            .ok_or_else(|| Error::ConnectionFailed {
                address: address.to_string(),
                reason: "peripheral is no longer known to the adapter".to_string(),
            })
    }

    async fn write_connected(
        peripheral: &Peripheral,
        address: &str,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<()> {
        peripheral
            .discover_services()
            .await
            .map_err(|e| Error::ConnectionFailed {
                address: address.to_string(),
                reason: format!("service discovery failed: {}", e),
            })?;

        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: characteristic.to_string(),
            })?;

        peripheral
            .write(&target, data, WriteType::WithResponse)
            .await
            .map_err(|e| Error::WriteRejected {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        trace!("Wrote {} bytes to characteristic {}", data.len(), characteristic);

        Ok(())
    }
}

#[async_trait]
impl LabelTransport for BtleplugTransport {
    async fn scan(&self, window: Duration) -> Result<Vec<Advertisement>> {
        let mut events = self.adapter.events().await.map_err(Error::Bluetooth)?;

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        debug!("Scanning for labels for {:?}", window);

        let mut seen = HashSet::new();
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = events.next() => match event {
                    Some(CentralEvent::DeviceDiscovered(id)) | Some(CentralEvent::DeviceUpdated(id)) => {
                        trace!("Device advertised: {:?}", id);
                        seen.insert(id);
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        let mut found = Vec::new();
        for id in seen {
            let peripheral = match self.adapter.peripheral(&id).await {
                Ok(p) => p,
                Err(e) => {
                    trace!("Failed to get peripheral: {}", e);
                    continue;
                }
            };

            let properties = match peripheral.properties().await {
                Ok(Some(p)) => p,
                _ => continue,
            };

            if let Some(name) = properties.local_name {
                found.push(Advertisement {
                    name,
                    address: id.to_string(),
                    rssi: properties.rssi,
                });
            }
        }

        debug!("Scan finished, {} named peripherals", found.len());

        Ok(found)
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await.map_err(Error::Bluetooth)
    }

    async fn connect_and_write(
        &self,
        address: &str,
        characteristic: Uuid,
        data: &[u8],
        timeout: Duration,
    ) -> Result<()> {
        let peripheral = tokio::time::timeout(timeout, self.find_peripheral(address))
            .await
            .map_err(|_| Error::ConnectionFailed {
                address: address.to_string(),
                reason: format!("lookup timed out after {:?}", timeout),
            })??;

        let transaction = async {
            peripheral
                .connect()
                .await
                .map_err(|e| Error::ConnectionFailed {
                    address: address.to_string(),
                    reason: e.to_string(),
                })?;

            debug!("Connected to {}", address);

            Self::write_connected(&peripheral, address, characteristic, data).await
        };

        let result = tokio::time::timeout(timeout, transaction)
            .await
            .unwrap_or_else(|_| {
                Err(Error::ConnectionFailed {
                    address: address.to_string(),
                    reason: format!("timed out after {:?}", timeout),
                })
            });

        // A timed-out connect may still have completed on the adapter side.
        if peripheral.is_connected().await.unwrap_or(true) {
            match tokio::time::timeout(DISCONNECT_TIMEOUT, peripheral.disconnect()).await {
                Ok(Ok(())) => debug!("Disconnected from {}", address),
                Ok(Err(e)) => warn!("Failed to disconnect from {}: {}", address, e),
                Err(_) => warn!("Disconnect from {} did not finish", address),
            }
        }

        result
    }
}
