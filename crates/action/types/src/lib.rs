//! Action Domain Types for Trellis
//!
//! Actions in Trellis are NOT imperative scripts. They are
//! **declarative automations** — typed parameters, guard expressions
//! that gate eligibility, and ordered mutation rules whose effects are
//! data, not code.
//!
//! # Key Concepts
//!
//! - **ActionType**: A named automation with parameters, conjunctive
//!   submission criteria, and ordered rules.
//! - **GuardExpression**: A comparison between a property path and a
//!   literal. All of an action's guards must hold for eligibility.
//! - **PropertyPath**: A traversal from an object-reference parameter
//!   across relationship hops to a terminal property. Multi-valued
//!   hops carry an ANY/ALL quantifier, preserved exactly as authored.
//! - **ActionRule**: create, modify or delete, with property writes
//!   resolved from tagged value sources at execution time.
//!
//! # Design Principles
//!
//! 1. Actions are data. A guard or rule can be classified, rendered
//!    and diffed without executing anything.
//! 2. Structural validity is checked at authoring time; runtime only
//!    sees actions whose parameters, paths and operators line up.
//! 3. Nothing here evaluates. Guard evaluation and rule execution live
//!    behind the runtime boundary.

#![deny(unsafe_code)]

mod action;
mod errors;
mod guard;
mod parameter;
mod path;
mod rule;

pub use action::*;
pub use errors::*;
pub use guard::*;
pub use parameter::*;
pub use path::*;
pub use rule::*;
