//! This is a library for publishing view state from a single-threaded app core to a UI layer.
//! It was created for the Matty event feed, so it only includes what that core needed.
//!
//! Model:
//! 1. The core keeps each piece of view-facing state in a [`Published`] cell.
//! 2. Writing through a cell marks it dirty. Writes can be attributed to a listener (the "modifier"), which will not be told about its own change.
//! 3. After an operation finishes, the core drains due notifications and invokes them with no borrows held, so listeners can call straight back into the core.
//! 4. Async loads are tagged with a [`RequestId`] from a per-field [`RequestSequencer`]. A completion is applied only if it is the latest request issued for that field.
//!
//! Point 4 is what keeps a slow, superseded request from overwriting newer state.

pub mod data_model;

pub use data_model::*;
