//! Human-readable byte sizes for configuration values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid size format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Size overflows u64: {0}")]
    Overflow(String),
}

const KIB: u64 = 1024;

/// Binary units, largest first
const UNITS: [(&str, u64); 4] = [
    ("TB", KIB * KIB * KIB * KIB),
    ("GB", KIB * KIB * KIB),
    ("MB", KIB * KIB),
    ("KB", KIB),
];

/// Byte count that reads and prints as `500MB`, `2GB`, `1536` ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn mib(n: u64) -> Self {
        ByteSize(n * KIB * KIB)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        if digits.is_empty() {
            return Err(ParseError::InvalidFormat(s.to_string()));
        }
        let n: u64 = digits.parse()?;

        let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "K" | "KB" | "KIB" => KIB,
            "M" | "MB" | "MIB" => KIB * KIB,
            "G" | "GB" | "GIB" => KIB * KIB * KIB,
            "T" | "TB" | "TIB" => KIB * KIB * KIB * KIB,
            other => return Err(ParseError::InvalidUnit(other.to_string())),
        };

        n.checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ByteSize {
    /// Largest unit that divides the value exactly, plain bytes otherwise
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (unit, size) in UNITS {
            if self.0 >= size && self.0 % size == 0 {
                return write!(f, "{}{unit}", self.0 / size);
            }
        }
        write!(f, "{}", self.0)
    }
}

impl From<ByteSize> for String {
    fn from(size: ByteSize) -> Self {
        size.to_string()
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = ByteSize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a byte count or a size string such as \"500MB\"")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ByteSize, E> {
                Ok(ByteSize(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<ByteSize, E> {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom(format!("negative byte size: {v}")))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ByteSize, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!("1536".parse::<ByteSize>().unwrap(), ByteSize(1536));
        assert_eq!("4k".parse::<ByteSize>().unwrap(), ByteSize(4096));
        assert_eq!("500MB".parse::<ByteSize>().unwrap(), ByteSize::mib(500));
        assert_eq!("500 MiB".parse::<ByteSize>().unwrap(), ByteSize::mib(500));
        assert_eq!("2G".parse::<ByteSize>().unwrap().as_u64(), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("MB".parse::<ByteSize>(), Err(ParseError::InvalidFormat(_))));
        assert!(matches!("5XB".parse::<ByteSize>(), Err(ParseError::InvalidUnit(_))));
        assert!(matches!(
            "99999999999TB".parse::<ByteSize>(),
            Err(ParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(ByteSize::mib(500).to_string(), "500MB");
        assert_eq!(ByteSize(3 * 1024).to_string(), "3KB");
        assert_eq!(ByteSize(1500).to_string(), "1500");
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct Limits {
            max: ByteSize,
        }

        let parsed: Limits = serde_json::from_str(r#"{"max": "10MB"}"#).unwrap();
        assert_eq!(parsed.max, ByteSize::mib(10));

        let parsed: Limits = serde_json::from_str(r#"{"max": 2048}"#).unwrap();
        assert_eq!(parsed.max, ByteSize(2048));

        assert!(serde_json::from_str::<Limits>(r#"{"max": -1}"#).is_err());
    }
}
