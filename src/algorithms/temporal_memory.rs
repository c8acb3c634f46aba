//! Temporal Memory implementation.
//!
//! The Temporal Memory learns temporal sequences by forming connections
//! between cells. Each timestep it reads the segment activity computed at the
//! end of the previous timestep to decide how every column is handled:
//!
//! - an active column with an active segment is **predicted**: only the
//!   predicted cells fire, and their segments are reinforced;
//! - an active column without one **bursts**: every cell fires, and one cell
//!   is chosen to learn the transition;
//! - an inactive column with matching segments is **punished**: those
//!   segments weaken their synapses onto the previously active cells.
//!
//! It then prunes dead structure and rescans segment activity against the new
//! active cells, which becomes the prediction for the next timestep.

use crate::algorithms::{Anomaly, Connections, ConnectionsParams, SequenceMemory};
use crate::error::{Result, VelesError};
use crate::types::{CellIdx, MemoryStats, Permanence, Real, Segment, SynapseIdx};
use crate::utils::bits;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for creating a Temporal Memory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TemporalMemoryParams {
    /// Number of columns in the input space.
    pub num_columns: usize,

    /// Number of cells per column.
    pub cells_per_column: usize,

    /// Maximum number of segments per cell.
    pub max_segments_per_cell: usize,

    /// Maximum number of synapses per segment.
    pub max_synapses_per_segment: usize,

    /// Initial permanence for new synapses.
    pub initial_permanence: Permanence,

    /// Permanence threshold for connected synapses.
    pub connected_permanence: Permanence,

    /// Amount to increment permanence for active synapses, and to decrement
    /// it for inactive synapses, on a learning segment.
    pub permanence_increment: Permanence,

    /// Amount to decrement permanence for predicted-inactive segments.
    pub predicted_segment_decrement: Permanence,

    /// Maximum number of new synapses added per learning segment per timestep.
    pub max_new_synapse_count: usize,

    /// Active connected synapses needed for a segment to be active.
    pub activation_threshold: usize,

    /// Active potential synapses needed for a segment to be matching.
    pub min_threshold: usize,
}

impl Default for TemporalMemoryParams {
    fn default() -> Self {
        Self {
            num_columns: 2048,
            cells_per_column: 32,
            max_segments_per_cell: 16,
            max_synapses_per_segment: 16,
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            permanence_increment: 0.05,
            predicted_segment_decrement: 0.01,
            max_new_synapse_count: 20,
            activation_threshold: 12,
            min_threshold: 10,
        }
    }
}

impl TemporalMemoryParams {
    /// Checks the parameters for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`VelesError::InvalidParameter`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, message: impl Into<String>) -> VelesError {
            VelesError::InvalidParameter {
                name,
                message: message.into(),
            }
        }

        let sizes = [
            ("num_columns", self.num_columns),
            ("cells_per_column", self.cells_per_column),
            ("max_segments_per_cell", self.max_segments_per_cell),
            ("max_synapses_per_segment", self.max_synapses_per_segment),
            ("max_new_synapse_count", self.max_new_synapse_count),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(invalid(name, "Must be > 0"));
            }
        }

        if self.max_synapses_per_segment > SynapseIdx::MAX as usize {
            return Err(invalid(
                "max_synapses_per_segment",
                format!("Must be <= {}", SynapseIdx::MAX),
            ));
        }

        let fits = self
            .num_columns
            .checked_mul(self.cells_per_column)
            .is_some_and(|n| n <= CellIdx::MAX as usize);
        if !fits {
            return Err(invalid(
                "cells_per_column",
                "num_columns * cells_per_column exceeds the cell index range",
            ));
        }

        let thresholds = [
            ("activation_threshold", self.activation_threshold),
            ("min_threshold", self.min_threshold),
        ];
        for (name, value) in thresholds {
            if value == 0 || value > self.max_synapses_per_segment {
                return Err(invalid(
                    name,
                    format!(
                        "Must be in 1..={} (max_synapses_per_segment), got {}",
                        self.max_synapses_per_segment, value
                    ),
                ));
            }
        }

        if !(self.initial_permanence > 0.0 && self.initial_permanence <= 1.0) {
            return Err(invalid(
                "initial_permanence",
                format!("Must be in (0, 1], got {}", self.initial_permanence),
            ));
        }

        let unit = [
            ("connected_permanence", self.connected_permanence),
            ("permanence_increment", self.permanence_increment),
            ("predicted_segment_decrement", self.predicted_segment_decrement),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, format!("Must be in [0, 1], got {value}")));
            }
        }

        Ok(())
    }
}

/// The Temporal Memory algorithm.
///
/// # Example
///
/// ```rust
/// use veles::algorithms::{TemporalMemory, TemporalMemoryParams};
///
/// let mut tm = TemporalMemory::new(TemporalMemoryParams {
///     num_columns: 100,
///     cells_per_column: 4,
///     ..Default::default()
/// })
/// .unwrap();
///
/// let mut active_columns = vec![false; 100];
/// for column in [1, 5, 10, 20] {
///     active_columns[column] = true;
/// }
///
/// tm.compute(&active_columns, true).unwrap();
///
/// // Nothing was predicted, so every active column burst.
/// assert_eq!(tm.active_cells().len(), 16);
/// assert_eq!(tm.anomaly_score(), Some(1.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalMemory {
    params: TemporalMemoryParams,
    num_cells: usize,

    connections: Connections,

    // State from the previous timestep
    prev_active_cells: Vec<bool>,
    prev_winner_cells: Vec<bool>,

    // Current state
    active_cells: Vec<bool>,
    winner_cells: Vec<bool>,
    prediction: Vec<bool>,

    anomaly: Option<Real>,
    stats: MemoryStats,

    /// Learning timesteps completed.
    iteration: u64,
}

impl TemporalMemory {
    /// Creates a new Temporal Memory with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns [`VelesError::InvalidParameter`] if the parameters fail
    /// [`TemporalMemoryParams::validate`].
    pub fn new(params: TemporalMemoryParams) -> Result<Self> {
        params.validate()?;

        let num_cells = params.num_columns * params.cells_per_column;
        let connections = Connections::new(ConnectionsParams {
            num_columns: params.num_columns,
            cells_per_column: params.cells_per_column,
            max_segments_per_cell: params.max_segments_per_cell,
            max_synapses_per_segment: params.max_synapses_per_segment,
        });

        log::debug!(
            "[TM] created: {} columns x {} cells, {} segments/cell, {} synapses/segment",
            params.num_columns,
            params.cells_per_column,
            params.max_segments_per_cell,
            params.max_synapses_per_segment
        );

        Ok(Self {
            num_cells,
            connections,
            prev_active_cells: vec![false; num_cells],
            prev_winner_cells: vec![false; num_cells],
            active_cells: vec![false; num_cells],
            winner_cells: vec![false; num_cells],
            prediction: vec![false; params.num_columns],
            anomaly: None,
            stats: MemoryStats::default(),
            iteration: 0,
            params,
        })
    }

    /// Runs one timestep.
    ///
    /// `active_columns` must hold one entry per column. When `learn` is false
    /// the permanence graph is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`VelesError::DimensionMismatch`] for a wrong-length input,
    /// before any state is modified.
    pub fn compute(&mut self, active_columns: &[bool], learn: bool) -> Result<()> {
        if active_columns.len() != self.params.num_columns {
            return Err(VelesError::DimensionMismatch {
                expected: self.params.num_columns,
                actual: active_columns.len(),
            });
        }

        // Prediction made at the end of the previous timestep
        self.prediction = self.connections.compute_predicted_columns();
        let anomaly = Anomaly::compute(active_columns, &self.prediction);
        self.anomaly = Some(anomaly);
        self.stats = self.connections.compute_stats();

        let bursting = self.activate_cells(active_columns, learn)?;

        if learn {
            self.connections.cleanup();
        }

        self.connections.clear();
        self.connections.compute_activity(
            &self.active_cells,
            self.params.connected_permanence,
            self.params.activation_threshold,
            self.params.min_threshold,
        )?;

        if learn {
            self.iteration += 1;
            self.connections.start_new_iteration();
        }

        log::trace!(
            "[TM] step {}: {} active columns, {} bursting, anomaly {:.3}",
            self.iteration,
            bits::count_active(active_columns),
            bursting,
            anomaly
        );

        Ok(())
    }

    /// Computes active and winner cells, learning along the way.
    ///
    /// Returns the number of columns that burst.
    fn activate_cells(&mut self, active_columns: &[bool], learn: bool) -> Result<usize> {
        self.prev_active_cells =
            std::mem::replace(&mut self.active_cells, vec![false; self.num_cells]);
        self.prev_winner_cells =
            std::mem::replace(&mut self.winner_cells, vec![false; self.num_cells]);

        let prev_winner_cells = bits::sparse_indices(&self.prev_winner_cells);
        let mut bursting = 0;

        for (column, &is_active) in active_columns.iter().enumerate() {
            if is_active {
                if self.connections.active_segments_for_column(column) > 0 {
                    self.activate_predicted_column(column, &prev_winner_cells, learn);
                } else {
                    self.burst_column(column, &prev_winner_cells, learn)?;
                    bursting += 1;
                }
            } else if learn && self.connections.matching_segments_for_column(column) > 0 {
                self.punish_predicted_column(column);
            }
        }

        Ok(bursting)
    }

    /// Activates the predicted cells of a column.
    ///
    /// Every cell with an active segment becomes active. The winner is the one
    /// whose strongest active segment has the most active connected synapses,
    /// ties going to the lowest cell index.
    fn activate_predicted_column(
        &mut self,
        column: usize,
        prev_winner_cells: &[CellIdx],
        learn: bool,
    ) {
        let mut winner: Option<(CellIdx, SynapseIdx)> = None;

        for cell in self.connections.cells_for_column(column) {
            let segments = self.connections.active_segments_for_cell(cell);
            if segments.is_empty() {
                continue;
            }

            self.active_cells[cell as usize] = true;

            let strength = segments
                .iter()
                .map(|&s| self.connections.data_for_segment(s).num_active_connected)
                .max()
                .unwrap_or(0);
            if winner.map_or(true, |(_, best)| strength > best) {
                winner = Some((cell, strength));
            }

            if learn {
                for segment in segments {
                    self.reinforce_segment(segment, prev_winner_cells);
                }
            }
        }

        if let Some((cell, _)) = winner {
            self.winner_cells[cell as usize] = true;
        }
    }

    /// Bursts a column (activates all cells when unpredicted).
    fn burst_column(
        &mut self,
        column: usize,
        prev_winner_cells: &[CellIdx],
        learn: bool,
    ) -> Result<()> {
        for cell in self.connections.cells_for_column(column) {
            self.active_cells[cell as usize] = true;
        }

        let winner_cell =
            if let Some((cell, segment)) = self.connections.best_matching_segment_for_column(column)
            {
                if learn {
                    self.reinforce_segment(segment, prev_winner_cells);
                }
                cell
            } else {
                // No matching segment - pick least used cell and grow new segment
                let cell = self.connections.least_used_cell(column);

                if learn && !prev_winner_cells.is_empty() {
                    let segment = self.create_segment(cell)?;
                    self.connections.grow_synapses(
                        segment,
                        prev_winner_cells,
                        self.params.initial_permanence,
                        self.params.max_new_synapse_count,
                    );
                }

                cell
            };

        self.winner_cells[winner_cell as usize] = true;
        Ok(())
    }

    /// Weakens matching segments of a column that did not become active.
    fn punish_predicted_column(&mut self, column: usize) {
        let decrement = self.params.predicted_segment_decrement;
        if decrement <= 0.0 {
            return;
        }

        for cell in self.connections.cells_for_column(column) {
            for segment in self.connections.matching_segments_for_cell(cell) {
                self.connections
                    .adapt_segment(segment, &self.prev_active_cells, -decrement, 0.0);
            }
        }
    }

    /// Reinforces a segment and grows it towards the previous winner cells.
    fn reinforce_segment(&mut self, segment: Segment, prev_winner_cells: &[CellIdx]) {
        let step = self.params.permanence_increment;
        self.connections
            .adapt_segment(segment, &self.prev_active_cells, step, step);
        self.connections.grow_synapses(
            segment,
            prev_winner_cells,
            self.params.initial_permanence,
            self.params.max_new_synapse_count,
        );
    }

    /// Creates a segment, evicting the least recently used one on a full cell.
    fn create_segment(&mut self, cell: CellIdx) -> Result<Segment> {
        if self.connections.segments_for_cell(cell).len() >= self.params.max_segments_per_cell {
            self.connections.evict_segment(cell);
        }
        self.connections.create_segment(cell)
    }

    /// Resets the temporal memory state.
    ///
    /// Clears all cell vectors, the prediction, the anomaly score and the
    /// segment activity. Learned permanences are kept.
    pub fn reset(&mut self) {
        self.prev_active_cells.fill(false);
        self.prev_winner_cells.fill(false);
        self.active_cells.fill(false);
        self.winner_cells.fill(false);
        self.prediction.fill(false);
        self.anomaly = None;
        self.connections.clear();
        log::debug!("[TM] reset after {} learning steps", self.iteration);
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Returns the parameters.
    pub fn params(&self) -> &TemporalMemoryParams {
        &self.params
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.params.num_columns
    }

    /// Returns the number of cells per column.
    pub fn cells_per_column(&self) -> usize {
        self.params.cells_per_column
    }

    /// Returns the total number of cells.
    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Returns the currently active cells in ascending order.
    pub fn active_cells(&self) -> Vec<CellIdx> {
        bits::sparse_indices(&self.active_cells)
    }

    /// Returns the active cells as a dense vector.
    pub fn active_cells_dense(&self) -> &[bool] {
        &self.active_cells
    }

    /// Returns the winner cells from the last compute in ascending order.
    pub fn winner_cells(&self) -> Vec<CellIdx> {
        bits::sparse_indices(&self.winner_cells)
    }

    /// Returns the winner cells as a dense vector.
    pub fn winner_cells_dense(&self) -> &[bool] {
        &self.winner_cells
    }

    /// Returns the columns predicted for the last timestep.
    pub fn prediction(&self) -> &[bool] {
        &self.prediction
    }

    /// Returns the anomaly score of the last timestep.
    pub fn anomaly_score(&self) -> Option<Real> {
        self.anomaly
    }

    /// Returns the graph size recorded at the start of the last timestep.
    pub fn stats(&self) -> MemoryStats {
        self.stats
    }

    /// Returns the number of learning timesteps completed.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Returns a reference to the connections.
    pub fn connections(&self) -> &Connections {
        &self.connections
    }
}

impl SequenceMemory for TemporalMemory {
    fn compute(&mut self, active_columns: &[bool], learn: bool) -> Result<()> {
        TemporalMemory::compute(self, active_columns, learn)
    }

    fn reset(&mut self) {
        TemporalMemory::reset(self);
    }

    fn active_cells(&self) -> Vec<CellIdx> {
        TemporalMemory::active_cells(self)
    }

    fn anomaly_score(&self) -> Option<Real> {
        self.anomaly
    }

    fn prediction(&self) -> &[bool] {
        &self.prediction
    }

    fn stats(&self) -> MemoryStats {
        self.stats
    }
}
