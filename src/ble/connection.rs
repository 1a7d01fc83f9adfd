//! Short-lived label connections.
//!
//! Every price update is one transaction: connect, write the payload with
//! response, disconnect. The caller only ever sees an [`Ack`] or an error.

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ble::payload::PricePayload;
use crate::ble::transport::{LabelTransport, DISCONNECT_TIMEOUT};
use crate::ble::uuids::PRICE_CHARACTERISTIC_UUID;
use crate::error::{Error, Result};

/// Extra time a transport gets past the connect timeout to tear the link down.
const CLEANUP_GRACE: Duration = Duration::from_secs(1);

/// Confirmation that a label acknowledged a price write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Address that was written.
    pub address: String,
    /// The payload the label accepted.
    pub payload: PricePayload,
    /// Local time the acknowledgement was received.
    pub acknowledged_at: NaiveDateTime,
}

/// Sends price payloads to labels.
///
/// Sends to the same address are serialized since a label services one
/// connection at a time. Sends to different addresses run independently.
pub struct ConnectionManager {
    transport: Arc<dyn LabelTransport>,
    characteristic: Uuid,
    connect_timeout: Duration,
    address_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConnectionManager {
    /// Default upper bound for connect + write + disconnect (10 seconds).
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a connection manager writing to the standard price characteristic.
    pub fn new(transport: Arc<dyn LabelTransport>) -> Self {
        Self {
            transport,
            characteristic: PRICE_CHARACTERISTIC_UUID,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            address_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Write to a different characteristic.
    pub fn with_characteristic(mut self, characteristic: Uuid) -> Self {
        self.characteristic = characteristic;
        self
    }

    /// Set the transaction timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The characteristic payloads are written to.
    pub fn characteristic(&self) -> Uuid {
        self.characteristic
    }

    /// Write `product` and `price` to the label at `address`.
    ///
    /// No retry is attempted.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedPrice`] if the payload cannot be built
    /// - [`Error::ConnectionFailed`] if the link could not be established or
    ///   the transaction timed out
    /// - [`Error::WriteRejected`] if the label did not acknowledge the write
    pub async fn send_price(&self, address: &str, product: &str, price: Decimal) -> Result<Ack> {
        let payload = PricePayload::new(product, price)?;
        let bytes = payload.encode();

        let lock = self.address_lock(address);
        let _guard = lock.lock().await;

        debug!("Sending {:?} to {}", payload.to_string(), address);

        // The transport enforces the timeout itself so it can disconnect; this
        // outer bound only catches transports that ignore it.
        let limit = self.connect_timeout + DISCONNECT_TIMEOUT + CLEANUP_GRACE;
        let outcome = tokio::time::timeout(
            limit,
            self.transport.connect_and_write(
                address,
                self.characteristic,
                &bytes,
                self.connect_timeout,
            ),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {
                info!("Label at {} acknowledged {}", address, payload);
                Ok(Ack {
                    address: address.to_string(),
                    payload,
                    acknowledged_at: Local::now().naive_local(),
                })
            }
            Ok(Err(e)) => {
                warn!("Send to {} failed: {}", address, e);
                Err(Self::classify(address, e))
            }
            Err(_) => {
                warn!("Send to {} did not return within {:?}", address, limit);
                Err(Error::ConnectionFailed {
                    address: address.to_string(),
                    reason: format!("timed out after {:?}", limit),
                })
            }
        }
    }

    fn address_lock(&self, address: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.address_locks
            .lock()
            .entry(address.to_string())
            .or_default()
            .clone()
    }

    fn classify(address: &str, error: Error) -> Error {
        match error {
            Error::Bluetooth(e) => Error::ConnectionFailed {
                address: address.to_string(),
                reason: e.to_string(),
            },
            other => other,
        }
    }
}
