//! Fixed-point price with two fraction digits.

use core::fmt;
use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use stockroom_core::{DomainError, ValueObject};

/// Non-negative price stored in minor units (cents).
///
/// Serialized as a decimal string (`"19.99"`); deserialized from a decimal
/// string or a JSON number. Every input path accepts the same values: at most
/// two fraction digits and no more than [`Price::MAX`] minor units, which is
/// what a signed 64-bit column can hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl ValueObject for Price {}

impl Price {
    pub const ZERO: Price = Price(0);
    pub const MAX: Price = Price(i64::MAX as u64);

    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Like [`Price::from_minor`] but rejects amounts above [`Price::MAX`].
    pub fn try_from_minor(minor: u64) -> Result<Self, DomainError> {
        if minor > Self::MAX.0 {
            return Err(DomainError::validation(format!(
                "price exceeds the maximum of {}",
                Self::MAX
            )));
        }
        Ok(Self(minor))
    }

    pub fn minor(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Price {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DomainError::validation(format!("invalid price '{s}'"));

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        let minor = whole
            .checked_mul(100)
            .and_then(|m| m.checked_add(cents))
            .ok_or_else(invalid)?;
        Price::try_from_minor(minor)
    }
}

impl TryFrom<f64> for Price {
    type Error = DomainError;

    /// Goes through the shortest decimal form of `value`, so `19.99` is
    /// accepted and `19.999` is rejected just as their string forms are.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(DomainError::validation(format!("invalid price {value}")));
        }
        value.to_string().parse()
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PriceVisitor;

        impl Visitor<'_> for PriceVisitor {
            type Value = Price;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative price with at most two fraction digits")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
                let minor = v
                    .checked_mul(100)
                    .ok_or_else(|| E::custom("price out of range"))?;
                Price::try_from_minor(minor).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
                let v = u64::try_from(v).map_err(|_| E::custom("price cannot be negative"))?;
                self.visit_u64(v)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
                Price::try_from(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PriceVisitor)
    }
}
