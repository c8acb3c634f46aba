//! The interface every sequence memory exposes to its caller.

use crate::error::Result;
use crate::types::{CellIdx, MemoryStats, Real};

/// A sequence memory driven one timestep at a time.
///
/// Implementations are synchronous: `compute` runs to completion before it
/// returns, and the accessors only ever observe state between calls.
pub trait SequenceMemory {
    /// Runs one timestep on a dense active-column vector.
    ///
    /// # Errors
    ///
    /// Fails without mutating any state if the input has the wrong length.
    fn compute(&mut self, active_columns: &[bool], learn: bool) -> Result<()>;

    /// Forgets the current sequence context without touching learned state.
    fn reset(&mut self);

    /// Ascending indices of the currently active cells.
    fn active_cells(&self) -> Vec<CellIdx>;

    /// Anomaly of the last timestep, or `None` if nothing was computed since
    /// construction or the last reset.
    fn anomaly_score(&self) -> Option<Real>;

    /// Columns that were predicted for the last timestep.
    fn prediction(&self) -> &[bool];

    /// Graph size recorded during the last timestep.
    fn stats(&self) -> MemoryStats;
}
