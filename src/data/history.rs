//! Day-granular price history.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::round_price;

/// Price of a product on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// Price, serialized as a decimal string such as `"12.50"`.
    pub price: Decimal,
    /// Calendar day, stored as `YYYY-MM-DD`.
    pub day: NaiveDate,
}

impl PriceEntry {
    /// Create a new entry, rounding the price to two decimals.
    pub fn new(day: NaiveDate, price: Decimal) -> Self {
        Self {
            price: round_price(price),
            day,
        }
    }
}

/// Price history of one label, ordered by day with at most one entry per day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory {
    entries: Vec<PriceEntry>,
}

impl PriceHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `entry.day`.
    ///
    /// Returns the price that was replaced, if any.
    pub fn upsert(&mut self, entry: PriceEntry) -> Option<Decimal> {
        match self.entries.binary_search_by_key(&entry.day, |e| e.day) {
            Ok(pos) => Some(std::mem::replace(&mut self.entries[pos], entry).price),
            Err(pos) => {
                self.entries.insert(pos, entry);
                None
            }
        }
    }

    /// Remove the entry for `day`, returning it.
    pub fn remove_day(&mut self, day: NaiveDate) -> Option<PriceEntry> {
        self.entries
            .binary_search_by_key(&day, |e| e.day)
            .ok()
            .map(|pos| self.entries.remove(pos))
    }

    /// Get the entry for `day`.
    pub fn get(&self, day: NaiveDate) -> Option<&PriceEntry> {
        self.entries
            .binary_search_by_key(&day, |e| e.day)
            .ok()
            .map(|pos| &self.entries[pos])
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&PriceEntry> {
        self.entries.last()
    }

    /// Price of the most recent entry, or zero for an empty history.
    pub fn current_price(&self) -> Decimal {
        self.latest().map(|e| e.price).unwrap_or(Decimal::ZERO)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[PriceEntry] {
        &self.entries
    }

    /// Iterate over entries, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, PriceEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restore ordering and uniqueness on data read from an external store.
    ///
    /// When a day appears more than once the later occurrence wins, matching
    /// append-order semantics.
    pub fn normalize(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            self.upsert(entry);
        }
    }
}

impl FromIterator<PriceEntry> for PriceHistory {
    fn from_iter<I: IntoIterator<Item = PriceEntry>>(iter: I) -> Self {
        let mut history = Self::new();
        for entry in iter {
            history.upsert(entry);
        }
        history
    }
}

impl<'a> IntoIterator for &'a PriceHistory {
    type Item = &'a PriceEntry;
    type IntoIter = std::slice::Iter<'a, PriceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One point of the cross-product price report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Product name (falls back to the label name).
    pub product: String,
    /// Calendar day.
    pub day: NaiveDate,
    /// Price on that day.
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn price(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_upsert_same_day_replaces() {
        let mut history = PriceHistory::new();
        assert_eq!(history.upsert(PriceEntry::new(day(5), price("10.00"))), None);
        assert_eq!(
            history.upsert(PriceEntry::new(day(5), price("12.50"))),
            Some(price("10.00"))
        );
        assert_eq!(history.len(), 1);
        assert_eq!(history.current_price(), price("12.50"));
    }

    #[test]
    fn test_upsert_keeps_chronological_order() {
        let mut history = PriceHistory::new();
        history.upsert(PriceEntry::new(day(7), price("3")));
        history.upsert(PriceEntry::new(day(3), price("1")));
        history.upsert(PriceEntry::new(day(5), price("2")));

        let days: Vec<_> = history.iter().map(|e| e.day).collect();
        assert_eq!(days, vec![day(3), day(5), day(7)]);
        assert_eq!(history.latest().unwrap().day, day(7));
    }

    #[test]
    fn test_empty_history_current_price_is_zero() {
        let history = PriceHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.current_price(), Decimal::ZERO);
    }

    #[test]
    fn test_remove_and_get() {
        let mut history: PriceHistory = vec![
            PriceEntry::new(day(1), price("1")),
            PriceEntry::new(day(2), price("2")),
        ]
        .into_iter()
        .collect();

        assert_eq!(history.get(day(2)).unwrap().price, price("2"));
        assert_eq!(history.remove_day(day(2)).unwrap().price, price("2"));
        assert!(history.get(day(2)).is_none());
        assert!(history.remove_day(day(9)).is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let history: PriceHistory = vec![PriceEntry::new(day(18), price("27.45"))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(json, r#"[{"price":"27.45","day":"2026-10-18"}]"#);
    }

    #[test]
    fn test_short_price_serializes_with_two_decimals() {
        let entry = PriceEntry::new(day(18), price("12.5"));
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"price":"12.50","day":"2026-10-18"}"#);
    }

    #[test]
    fn test_normalize_last_duplicate_wins() {
        let json = r#"[
            {"price":"3.00","day":"2026-10-03"},
            {"price":"1.00","day":"2026-10-01"},
            {"price":"4.00","day":"2026-10-03"}
        ]"#;
        let mut history: PriceHistory = serde_json::from_str(json).unwrap();
        history.normalize();
        assert_eq!(history.len(), 2);
        assert_eq!(history.current_price(), price("4.00"));
    }
}
