//! Label records as persisted in the document store.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::history::PriceHistory;

/// Text stored and shown for a label that was never written.
pub const NEVER_CONTACTED: &str = "Never";

/// Format of a stored last-contact timestamp.
pub const LAST_CONTACT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One label document: product binding, price history and last contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDocument {
    /// Logical label name, e.g. `LABEL-1`.
    pub name: String,
    /// Product the label is bound to.
    #[serde(default)]
    pub product: String,
    /// Day-ordered price history.
    #[serde(default)]
    pub history_list: PriceHistory,
    /// Time of the last acknowledged write, `None` if never written.
    #[serde(default, with = "last_contact_format")]
    pub last_contact: Option<NaiveDateTime>,
}

impl LabelDocument {
    /// Create a document with an empty history.
    pub fn new(name: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product: product.into(),
            history_list: PriceHistory::new(),
            last_contact: None,
        }
    }

    /// Price of the latest history entry, or zero.
    pub fn current_price(&self) -> Decimal {
        self.history_list.current_price()
    }

    /// Product name, or the label name when no product is bound.
    pub fn display_product(&self) -> &str {
        if self.product.is_empty() {
            &self.name
        } else {
            &self.product
        }
    }
}

/// Format a last-contact time for display.
pub fn format_last_contact(last_contact: Option<NaiveDateTime>) -> String {
    match last_contact {
        Some(at) => at.format("%d/%m/%Y %H:%M:%S").to_string(),
        None => NEVER_CONTACTED.to_string(),
    }
}

/// A product bound to a label together with its plausible price range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSeed {
    /// Label name.
    pub label: String,
    /// Product name.
    pub product: String,
    /// Lowest plausible price.
    pub min_price: Decimal,
    /// Highest plausible price.
    pub max_price: Decimal,
}

impl ProductSeed {
    /// Create a seed; the bounds are swapped if given in the wrong order.
    pub fn new(
        label: impl Into<String>,
        product: impl Into<String>,
        min_price: Decimal,
        max_price: Decimal,
    ) -> Self {
        let (min_price, max_price) = if min_price <= max_price {
            (min_price, max_price)
        } else {
            (max_price, min_price)
        };
        Self {
            label: label.into(),
            product: product.into(),
            min_price,
            max_price,
        }
    }
}

mod last_contact_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{LAST_CONTACT_FORMAT, NEVER_CONTACTED};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_str(&at.format(LAST_CONTACT_FORMAT).to_string()),
            None => serializer.serialize_str(NEVER_CONTACTED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.is_empty() || text == NEVER_CONTACTED {
            return Ok(None);
        }
        NaiveDateTime::parse_from_str(&text, LAST_CONTACT_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
