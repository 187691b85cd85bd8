//! Human-readable byte sizes for configuration values such as `"5MB"`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ByteSizeError {
    #[error("empty size value")]
    Empty,

    #[error("invalid number in size '{0}'")]
    InvalidNumber(String),

    #[error("unknown size unit '{0}'")]
    InvalidUnit(String),

    #[error("size '{0}' overflows u64")]
    Overflow(String),
}

/// Byte count that deserializes from either an integer or a string like `"5MB"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn mib(n: u64) -> Self {
        Self(n * MIB)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Lossy conversion for APIs that take `usize` limits
    pub fn as_usize(&self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl FromStr for ByteSize {
    type Err = ByteSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(ByteSizeError::Empty);
        }

        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        let (digits, unit) = raw.split_at(split);

        let value: u64 = digits
            .parse()
            .map_err(|_| ByteSizeError::InvalidNumber(raw.to_string()))?;

        let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "K" | "KB" | "KIB" => KIB,
            "M" | "MB" | "MIB" => MIB,
            "G" | "GB" | "GIB" => GIB,
            other => return Err(ByteSizeError::InvalidUnit(other.to_string())),
        };

        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ByteSizeError::Overflow(raw.to_string()))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        match n {
            n if n >= GIB && n % GIB == 0 => write!(f, "{}GB", n / GIB),
            n if n >= MIB && n % MIB == 0 => write!(f, "{}MB", n / MIB),
            n if n >= KIB && n % KIB == 0 => write!(f, "{}KB", n / KIB),
            n => write!(f, "{}B", n),
        }
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
                formatter.write_str("a byte count or a size string such as \"5MB\"")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ByteSize(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom("byte size must not be negative"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<ByteSize>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_suffixed_values() {
        assert_eq!("2048".parse::<ByteSize>().unwrap(), ByteSize(2048));
        assert_eq!("5MB".parse::<ByteSize>().unwrap(), ByteSize::mib(5));
        assert_eq!("5mb".parse::<ByteSize>().unwrap(), ByteSize::mib(5));
        assert_eq!("64 KiB".parse::<ByteSize>().unwrap(), ByteSize(64 * 1024));
        assert_eq!("1G".parse::<ByteSize>().unwrap().as_u64(), 1024 * 1024 * 1024);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<ByteSize>(), Err(ByteSizeError::Empty));
        assert!(matches!(
            "5XB".parse::<ByteSize>(),
            Err(ByteSizeError::InvalidUnit(_))
        ));
        assert!(matches!(
            "MB".parse::<ByteSize>(),
            Err(ByteSizeError::InvalidNumber(_))
        ));
    }

    #[test]
    fn displays_largest_exact_unit() {
        assert_eq!(ByteSize::mib(5).to_string(), "5MB");
        assert_eq!(ByteSize(1536).to_string(), "1536B");
        assert_eq!(ByteSize(2048).to_string(), "2KB");
    }

    #[test]
    fn deserializes_from_toml_string_or_integer() {
        #[derive(Deserialize)]
        struct Limits {
            a: ByteSize,
            b: ByteSize,
        }

        let limits: Limits = toml::from_str("a = \"10MB\"\nb = 512").unwrap();
        assert_eq!(limits.a, ByteSize::mib(10));
        assert_eq!(limits.b, ByteSize(512));
    }
}
