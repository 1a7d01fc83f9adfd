//! Price payload written to a label.
//!
//! The label firmware expects plain ASCII of the form
//! `<product>xxxR$<price>` where the price always has two decimals and
//! uses `.` as the separator, e.g. `Rice 5kgxxxR$27.45`.

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::utils::round_price;

/// Delimiter between the product and the price.
pub const PAYLOAD_DELIMITER: &str = "xxx";

/// Currency marker in front of the price.
pub const PAYLOAD_CURRENCY: &str = "R$";

/// A decoded price payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePayload {
    /// Product text shown on the label.
    pub product: String,
    /// Price, rounded to two decimals.
    pub price: Decimal,
}

impl PricePayload {
    /// Create a payload, rounding the price to two decimals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPrice`] if the price is negative or the product
    /// contains the delimiter, which the firmware could not split.
    pub fn new(product: impl Into<String>, price: Decimal) -> Result<Self> {
        let product = product.into();
        if product.contains(PAYLOAD_DELIMITER) {
            return Err(Error::malformed(
                product,
                "product name contains the payload delimiter",
            ));
        }
        if price.is_sign_negative() && !price.is_zero() {
            return Err(Error::malformed(price.to_string(), "price cannot be negative"));
        }
        Ok(Self {
            product,
            price: round_price(price),
        })
    }

    /// Encode the payload as the ASCII bytes the firmware reads.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Decode bytes previously produced by [`PricePayload::encode`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::malformed(format!("{:?}", data), "payload is not UTF-8"))?;

        let (product, price) = text
            .rsplit_once(PAYLOAD_DELIMITER)
            .ok_or_else(|| Error::malformed(text, "missing delimiter"))?;

        let price = price
            .strip_prefix(PAYLOAD_CURRENCY)
            .ok_or_else(|| Error::malformed(text, "missing currency marker"))?;

        let price: Decimal = price
            .parse()
            .map_err(|_| Error::malformed(text, "price is not a number"))?;

        Self::new(product, price)
    }
}

impl std::fmt::Display for PricePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{:.2}",
            self.product, PAYLOAD_DELIMITER, PAYLOAD_CURRENCY, self.price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_encode() {
        let payload = PricePayload::new("Rice 5kg", Decimal::from_str("27.45").unwrap()).unwrap();
        assert_eq!(payload.encode(), b"Rice 5kgxxxR$27.45".to_vec());

        let payload = PricePayload::new("Beans 1kg", Decimal::from_str("12.5").unwrap()).unwrap();
        assert_eq!(payload.to_string(), "Beans 1kgxxxR$12.50");

        let payload = PricePayload::new("Oil", Decimal::from(4)).unwrap();
        assert_eq!(payload.to_string(), "OilxxxR$4.00");
    }

    #[test]
    fn test_parse() {
        let payload = PricePayload::parse(b"Soybean oil 900mlxxxR$7.99").unwrap();
        assert_eq!(payload.product, "Soybean oil 900ml");
        assert_eq!(payload.price, Decimal::from_str("7.99").unwrap());
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert!(PricePayload::new("boxxxes", Decimal::ONE).is_err());
        assert!(PricePayload::new("Rice", Decimal::from(-1)).is_err());
        assert!(PricePayload::parse(b"Rice 27.45").is_err());
        assert!(PricePayload::parse(b"Ricexxx27.45").is_err());
        assert!(PricePayload::parse(b"RicexxxR$abc").is_err());
        assert!(PricePayload::parse(&[0xff, 0xfe]).is_err());
    }
}
