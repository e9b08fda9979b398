//! Ontology Domain Types for Trellis
//!
//! Trellis schemas are NOT compile-time structs. They are **runtime
//! definitions** — tenants declare entity types, properties and
//! relationships while the system is live, and every instance payload
//! is checked against those definitions at the door.
//!
//! # Key Concepts
//!
//! - **EntityType**: A tenant-scoped schema mapping property keys to
//!   typed definitions, with an optional title key for labeling.
//! - **PropertyDef**: A typed property declaration. String properties
//!   with a single-select picklist are state-capable: their options
//!   become nodes in derived process graphs.
//! - **Relationship**: A cardinality-typed link between two entity
//!   types, backed by a reference property or a junction type.
//! - **ObjectInstance**: A dynamic property bag conforming to its
//!   entity type, carrying an immutable human-facing semantic id.
//!
//! # Design Principles
//!
//! 1. Schemas are data. Everything here serializes losslessly so
//!    definitions can live wherever the storage layer puts them.
//! 2. Deterministic iteration. Property maps are ordered so derived
//!    artifacts (graphs, layouts) come out the same every time.
//! 3. Integrity is checked at mutation sites, not assumed. Title keys,
//!    self-relationships and junction shapes are validated up front.

#![deny(unsafe_code)]

mod entity_type;
mod errors;
mod instance;
mod property;
mod relationship;
mod tenant;

pub use entity_type::*;
pub use errors::*;
pub use instance::*;
pub use property::*;
pub use relationship::*;
pub use tenant::*;
