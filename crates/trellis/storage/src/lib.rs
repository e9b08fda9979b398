//! Trellis unified storage abstractions.
//!
//! This crate defines a storage contract for Trellis components:
//! - entity type definitions (system of record for the ontology)
//! - relationships, including synthesized junction entity types
//! - action type definitions
//! - saved canvas layouts for process graphs
//!
//! Design stance:
//! - A transactional backend remains the source of truth.
//! - The in-memory adapter exists for tests and single-node use.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::{
    ActionTypeStore, EntityTypeStore, LayoutStore, RelationshipStore, TrellisStorage,
};
