//! Entity trait: identity + continuity across state changes.

use crate::id::Identifier;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Identifier;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
