//! Strongly-typed identifiers used across the catalog.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Behaviour shared by every record identifier.
///
/// The nil identifier marks a record that has not been stored yet; stores
/// replace it with a fresh identifier on insert.
pub trait Identifier:
    Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync + 'static
{
    fn fresh() -> Self;
    fn nil() -> Self;
    fn is_nil(&self) -> bool;
    fn as_uuid(&self) -> &Uuid;
}

/// Identifier of a product record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

/// Identifier of a category record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered), so identifier order follows creation
            /// order. Prefer passing IDs explicitly in tests for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Identifier for $t {
            fn fresh() -> Self {
                Self::new()
            }

            fn nil() -> Self {
                Self(Uuid::nil())
            }

            fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(ProductId, "ProductId");
impl_uuid_newtype!(CategoryId, "CategoryId");

impl CategoryId {
    /// Interpret a wire-level category reference, where the nil UUID means
    /// "uncategorized".
    pub fn from_reference(uuid: Uuid) -> Option<Self> {
        if uuid.is_nil() { None } else { Some(Self(uuid)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_garbage_with_type_name() {
        let err = "not-a-uuid".parse::<ProductId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.starts_with("ProductId")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let id = CategoryId::new();
        let parsed: CategoryId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn fresh_ids_are_time_ordered() {
        let first = ProductId::new();
        let second = ProductId::new();
        assert!(first < second);
        assert!(!first.is_nil());
        assert!(ProductId::nil().is_nil());
    }

    #[test]
    fn nil_category_reference_means_uncategorized() {
        assert_eq!(CategoryId::from_reference(Uuid::nil()), None);
        let id = CategoryId::new();
        assert_eq!(CategoryId::from_reference(*id.as_uuid()), Some(id));
    }
}
