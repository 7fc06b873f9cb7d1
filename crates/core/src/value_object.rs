//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values
/// (e.g. a price), as opposed to entities which are compared by identifier.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
