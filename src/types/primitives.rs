//! Primitive type definitions for the temporal memory.
//!
//! Index and value types are kept narrow so that per-segment storage stays
//! compact during the activity scan.

/// 16-bit unsigned integer.
pub type UInt16 = u16;

/// 32-bit unsigned integer.
pub type UInt32 = u32;

/// 32-bit floating point number.
pub type Real32 = f32;

/// Default floating point type for scores and ratios.
pub type Real = Real32;

/// Global cell index, `column * cells_per_column + offset`.
pub type CellIdx = UInt32;

/// Per-segment synapse counts (active, matching, total).
pub type SynapseIdx = UInt16;

/// Unique identifier for a segment in the connections arena.
pub type Segment = UInt32;

/// Synapse permanence value (0.0 to 1.0).
pub type Permanence = Real32;

/// Minimum permanence value.
pub const MIN_PERMANENCE: Permanence = 0.0;

/// Maximum permanence value.
pub const MAX_PERMANENCE: Permanence = 1.0;

/// Epsilon for floating point comparisons.
///
/// Also the viability floor: a synapse whose permanence drops below it is
/// removed on the next cleanup.
pub const EPSILON: Permanence = 1e-6;

/// Aggregate size of a connections graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryStats {
    /// Number of live segments.
    pub segments: usize,
    /// Number of live synapses.
    pub synapses: usize,
}
