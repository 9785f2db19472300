//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** - they represent
/// concepts where identity does not matter, only the values do. To "modify" a
/// value object, create a new one with the new values.
///
/// `Money { amount: 100, currency: "USD" }` is a value object; an item with
/// an id is an entity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
