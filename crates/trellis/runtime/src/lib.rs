//! Trellis action runtime boundary.
//!
//! This crate defines the two contracts the engine core delegates
//! outward, plus the instance lifecycle they rest on:
//! - guard evaluation: one expression against bound instances
//! - rule execution: a mutation list applied in declared order
//! - instance administration behind the instance validator gate
//!
//! Design stance:
//! - The core never evaluates guards or applies rules itself; it hands
//!   them across this boundary and treats each call as independently
//!   cancelable.
//! - The in-memory adapter exists for tests and single-node use.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod bindings;
mod error;
pub mod memory;
mod traits;

pub use bindings::{ExecutionReport, ParameterBindings};
pub use error::{RuntimeError, RuntimeResult};
pub use traits::{ActionRuntime, GuardEvaluator, InstanceAdmin, RuleExecutor};
