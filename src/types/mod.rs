//! Core types for the temporal memory.
//!
//! Index aliases, permanence bounds and the graph statistics record shared by
//! the connections graph and the controller.

mod primitives;

pub use primitives::*;
