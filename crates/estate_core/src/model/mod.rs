//! Listing domain model: locations, properties and their read-time views.
//!
//! # Responsibility
//! - Define canonical records shared by stores, services and the HTTP layer.
//! - Define create/update inputs with explicit, closed field sets.
//! - Validate field-level rules before anything reaches storage.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - A location's `property_refs` and a property's `location_ref` are only
//!   written by the relationship maintainer.

pub mod fields;
pub mod location;
pub mod property;
pub mod validation;
