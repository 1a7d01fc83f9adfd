//! Data structures for labels and their price history.

pub mod history;
pub mod label;

pub use history::{HistoryPoint, PriceEntry, PriceHistory};
pub use label::{format_last_contact, LabelDocument, ProductSeed, NEVER_CONTACTED};
