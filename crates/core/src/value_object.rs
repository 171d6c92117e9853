//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their
//! attribute values (`Money`, `Category`, sale lines). Two value objects with the
//! same values are interchangeable.

/// Marker trait for value objects.
///
/// Value objects are immutable: to "modify" one, build a new one. The bounds
/// keep them cheap to copy around, comparable, and printable in logs/tests.
///
/// ```ignore
/// let a = Money::from_minor(100);
/// let b = Money::from_minor(100);
/// assert_eq!(a, b); // equal by value
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
