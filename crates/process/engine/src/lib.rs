//! Process Graph Derivation for Trellis
//!
//! There is no stored state machine anywhere in Trellis. The process
//! graph is **derived** — recomputed on every read from the raw
//! entity types and actions, so it always reflects the current schema.
//! Removing a picklist option instantly reclassifies the actions that
//! depended on it; nothing can desync.
//!
//! # Key Concepts
//!
//! - **Classification**: whether an action is a state transition, an
//!   orphaned reference to a removed option, or a regular action.
//! - **Transition synthesis**: turning two selected state nodes into
//!   the declarative action that realizes the transition between them.
//! - **Graph building**: state nodes from tracked picklists, action
//!   nodes from classification, edges joining them by composite key.
//! - **Layout**: deterministic layered placement, with an incremental
//!   mode that never moves a node a human has already placed.
//!
//! # Design Principles
//!
//! 1. Everything here is a pure function of its inputs. Callers may
//!    cache results; the engine never does.
//! 2. Determinism end to end. Identical schema and actions produce an
//!    identical graph and identical positions.
//! 3. Expected user outcomes (a rejected transition, an orphaned
//!    action) are data, not errors.

#![deny(unsafe_code)]

mod classifier;
mod graph;
mod layout;
mod synthesizer;

pub use classifier::*;
pub use graph::*;
pub use layout::*;
pub use synthesizer::*;
