//! Trellis orchestration services.
//!
//! The one layer that talks to both persistence and the action
//! runtime. Schema edits pass their integrity checks here before
//! anything is stored and are pushed to the runtime afterwards; canvas
//! reads derive the process graph fresh on every call; action
//! submission gates on guards before executing rules.
//!
//! Design stance:
//! - Services are thin over `Arc<dyn TrellisStorage>` and
//!   `Arc<dyn ActionRuntime>`; swapping backends never touches them.
//! - Expected user outcomes (a failing guard, an inadmissible
//!   transition) are returned as data, not errors.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod actions;
mod canvas;
mod error;
mod objects;
mod schema;

pub use actions::{ActionService, SubmissionOutcome};
pub use canvas::{Canvas, CanvasService, ConnectOutcome};
pub use error::{ServiceError, ServiceResult};
pub use objects::ObjectService;
pub use schema::SchemaService;
