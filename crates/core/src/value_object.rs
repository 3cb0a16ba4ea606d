//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined
//! entirely by their attribute values. Two value objects with the same values are
//! considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// construct a new instance through its validating constructor. This keeps
/// validated invariants (a pin range, a non-empty card number) attached to the
/// type rather than re-checked at every use site.
///
/// The trait requires:
/// - **Clone**: value objects are cheap to copy (they're values, not references)
/// - **PartialEq**: compared by their attribute values
/// - **Debug**: debuggable for logging and testing
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
