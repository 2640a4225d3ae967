use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO 4217 currency code used by a merchant ledger and by FX lookups.
///
/// Codes are three ASCII uppercase letters. Lowercase input is accepted and
/// normalized.
///
/// ## Minor units
///
/// The engine stores monetary values as an `i64` number of **minor units**
/// (see `Money`). `minor_units()` returns how many decimal digits are used
/// when converting between:
/// - major units (human input/output, e.g. `10.50 EUR`)
/// - minor units (stored integers, e.g. `1050`)
///
/// Example: EUR has 2 minor units, so `10.50 EUR` ⇄ `1050`; JPY has none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub const EUR: Currency = Currency(*b"EUR");
    pub const USD: Currency = Currency(*b"USD");

    /// Canonical currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        // Constructors only accept ASCII uppercase letters.
        std::str::from_utf8(&self.0).unwrap_or("XXX")
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub fn minor_units(&self) -> u32 {
        match &self.0 {
            b"JPY" | b"KRW" | b"VND" | b"CLP" | b"ISK" | b"UGX" | b"XAF" | b"XOF" => 0,
            b"BHD" | b"KWD" | b"OMR" | b"JOD" | b"TND" | b"LYD" | b"IQD" => 3,
            _ => 2,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::USD
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let upper = value.trim().to_ascii_uppercase();
        let bytes = upper.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(EngineError::CurrencyMismatch(format!(
                "unsupported currency: {value}"
            )));
        }
        Ok(Currency([bytes[0], bytes[1], bytes[2]]))
    }
}

impl TryFrom<String> for Currency {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::try_from(value.as_str())
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.code().to_string()
    }
}

impl std::str::FromStr for Currency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_codes() {
        assert_eq!(Currency::try_from("usd").unwrap(), Currency::USD);
        assert_eq!(Currency::try_from(" EUR ").unwrap().code(), "EUR");
        assert!(Currency::try_from("EURO").is_err());
        assert!(Currency::try_from("E1R").is_err());
        assert!(Currency::try_from("").is_err());
    }

    #[test]
    fn minor_units_follow_iso_table() {
        assert_eq!(Currency::EUR.minor_units(), 2);
        assert_eq!(Currency::try_from("JPY").unwrap().minor_units(), 0);
        assert_eq!(Currency::try_from("KWD").unwrap().minor_units(), 3);
    }

    #[test]
    fn serializes_as_plain_code() {
        let json = serde_json::to_string(&Currency::EUR).unwrap();
        assert_eq!(json, "\"EUR\"");
        let back: Currency = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(back.code(), "GBP");
        assert!(serde_json::from_str::<Currency>("\"pounds\"").is_err());
    }
}
