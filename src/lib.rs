//! # esl-price-sync
//!
//! Price synchronization for Bluetooth Low Energy electronic shelf labels,
//! with a durable day-granular price history per label.
//!
//! ## Features
//!
//! - **Label Discovery**: Find nearby labels by advertised name, with a
//!   time-to-live cache so UI refreshes do not keep the radio busy
//! - **Price Writes**: Push a price to one label in a single
//!   connect/write/disconnect transaction
//! - **Price Ledger**: One entry per label per day; a same-day resend
//!   replaces the earlier price
//! - **Panel State**: Per-label draft/send state machine for UI bindings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use esl_price_sync::{LabelManager, MemoryStore, Result, SyncConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let manager = LabelManager::with_bluetooth(SyncConfig::default(), store).await?;
//!     manager.start().await?;
//!
//!     manager.on_draft_change("LABEL-1", "12.50").await?;
//!     let view = manager.on_send("LABEL-1").await?;
//!     println!("{}: {}", view.name, view.current_price_display);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### macOS
//! Requires Bluetooth permission. Peripheral addresses are opaque
//! identifiers rather than MAC addresses.

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod label_manager;
pub mod ledger;
pub mod session;
pub mod store;
pub mod utils;

// Re-exports for convenience
pub use config::SyncConfig;
pub use error::{Error, FailureKind, Result};
pub use label_manager::LabelManager;
pub use ledger::PriceLedger;
pub use session::{LabelPanel, LabelStatus, MessageKind, PanelState, PanelView, SessionReconciler};
pub use store::{DocumentStore, JsonFileStore, MemoryStore};
pub use utils::{format_price, format_price_text, parse_price};

pub use ble::{
    Ack, Advertisement, BtleplugTransport, ConnectionManager, DiscoveryCache, DiscoveryResult,
    LabelTransport, PricePayload,
};
pub use data::{HistoryPoint, LabelDocument, PriceEntry, PriceHistory, ProductSeed};
