use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::error::TradeError;

/// Human-readable trade number in the form `TR-YYYY-NNNNN`.
///
/// The sequence restarts at 1 each calendar year and is rendered with a
/// five-digit minimum width, widening naturally past 99999.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradeNumber {
    year: i32,
    sequence: u32,
}

impl TradeNumber {
    pub fn from_parts(year: i32, sequence: u32) -> Self {
        TradeNumber { year, sequence }
    }

    /// Parses the canonical `TR-YYYY-NNNNN` shape back into parts.
    pub fn parse(value: &str) -> Result<Self, TradeError> {
        let malformed = || TradeError::MalformedNumber { value: value.to_string() };
        let rest = value.strip_prefix("TR-").ok_or_else(malformed)?;
        let (year_part, seq_part) = rest.split_once('-').ok_or_else(malformed)?;
        if year_part.len() != 4 || seq_part.len() < 5 {
            return Err(malformed());
        }
        if !year_part.bytes().all(|b| b.is_ascii_digit())
            || !seq_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let year: i32 = year_part.parse().map_err(|_| malformed())?;
        let sequence: u32 = seq_part.parse().map_err(|_| malformed())?;
        Ok(TradeNumber { year, sequence })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for TradeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TR-{:04}-{:05}", self.year, self.sequence)
    }
}

impl Serialize for TradeNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TradeNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TradeNumber::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padding() {
        let number = TradeNumber::from_parts(2026, 1);
        assert_eq!(number.to_string(), "TR-2026-00001");
        assert_eq!(TradeNumber::from_parts(2026, 12345).to_string(), "TR-2026-12345");
    }

    #[test]
    fn widens_past_five_digits() {
        assert_eq!(TradeNumber::from_parts(2026, 123456).to_string(), "TR-2026-123456");
    }

    #[test]
    fn parse_round_trips() {
        let number = TradeNumber::parse("TR-2026-00042").unwrap();
        assert_eq!(number.year(), 2026);
        assert_eq!(number.sequence(), 42);
        assert_eq!(number.to_string(), "TR-2026-00042");
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in ["TR-26-00001", "TX-2026-00001", "TR-2026-1", "TR-2026-0001a", "TR-2026"] {
            assert!(TradeNumber::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn serde_uses_the_display_form() {
        let number = TradeNumber::from_parts(2026, 7);
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"TR-2026-00007\"");
        let back: TradeNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number);
        assert!(serde_json::from_str::<TradeNumber>("\"TR-26-7\"").is_err());
    }
}
