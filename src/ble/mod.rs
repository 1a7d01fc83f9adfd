//! BLE communication module.
//!
//! This module provides the Bluetooth Low Energy functionality for
//! discovering shelf labels and writing prices to them.

pub mod connection;
pub mod payload;
pub mod scanner;
pub mod transport;
pub mod uuids;

pub use connection::{Ack, ConnectionManager};
pub use payload::PricePayload;
pub use scanner::{DiscoveryCache, DiscoveryResult};
pub use transport::{Advertisement, BtleplugTransport, LabelTransport};
pub use uuids::*;
