//! Connections - the cell/segment/synapse graph of the temporal memory.
//!
//! Columns and cells are fixed index ranges: column `c` owns cells
//! `c * cells_per_column .. (c + 1) * cells_per_column`. Segments live in a
//! flat arena addressed by [`Segment`] ids, with destroyed slots recycled
//! through a free list. Each segment stores its synapses inline so the
//! per-timestep activity scan reads them contiguously.

use crate::error::{Result, VelesError};
use crate::types::{
    CellIdx, MemoryStats, Permanence, Segment, SynapseIdx, EPSILON, MAX_PERMANENCE,
    MIN_PERMANENCE,
};

use ahash::AHashSet;
use smallvec::SmallVec;
use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A synapse from a segment to a presynaptic cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynapseData {
    /// The presynaptic cell this synapse connects to.
    pub presynaptic_cell: CellIdx,

    /// The permanence strength of this synapse.
    pub permanence: Permanence,
}

/// Data associated with a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentData {
    /// The synapses on this segment, at most one per presynaptic cell.
    pub synapses: SmallVec<[SynapseData; 16]>,

    /// The cell this segment belongs to.
    pub cell: CellIdx,

    /// Connected synapses onto active cells, as of the last activity scan.
    pub num_active_connected: SynapseIdx,

    /// Potential synapses onto active cells, as of the last activity scan.
    pub num_active_potential: SynapseIdx,

    /// Iteration in which the segment was last created or grown.
    pub last_used_iteration: u64,

    active: bool,
    matching: bool,
}

impl SegmentData {
    fn new(cell: CellIdx, iteration: u64) -> Self {
        Self {
            synapses: SmallVec::new(),
            cell,
            num_active_connected: 0,
            num_active_potential: 0,
            last_used_iteration: iteration,
            active: false,
            matching: false,
        }
    }

    /// Whether the segment reached the activation threshold in the last scan.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the segment reached the matching threshold in the last scan.
    #[inline]
    pub fn is_matching(&self) -> bool {
        self.matching
    }

    fn clear_activity(&mut self) {
        self.num_active_connected = 0;
        self.num_active_potential = 0;
        self.active = false;
        self.matching = false;
    }

    fn compute_activity(
        &mut self,
        active_cells: &[bool],
        connected_permanence: Permanence,
        activation_threshold: usize,
        min_threshold: usize,
    ) {
        let mut connected: SynapseIdx = 0;
        let mut potential: SynapseIdx = 0;

        for synapse in &self.synapses {
            if active_cells[synapse.presynaptic_cell as usize] {
                potential += 1;
                if synapse.permanence >= connected_permanence {
                    connected += 1;
                }
            }
        }

        // A segment with no active synapses never counts, whatever the threshold.
        self.num_active_connected = connected;
        self.num_active_potential = potential;
        self.active = connected > 0 && connected as usize >= activation_threshold;
        self.matching = potential > 0 && potential as usize >= min_threshold;
    }
}

/// Data associated with a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellData {
    /// The segments on this cell, in creation order.
    pub segments: SmallVec<[Segment; 8]>,
}

/// Parameters for creating a Connections instance.
#[derive(Debug, Clone)]
pub struct ConnectionsParams {
    /// Number of columns.
    pub num_columns: usize,

    /// Number of cells in each column.
    pub cells_per_column: usize,

    /// Maximum number of segments a cell may own.
    pub max_segments_per_cell: usize,

    /// Maximum number of synapses a segment may own.
    pub max_synapses_per_segment: usize,
}

impl Default for ConnectionsParams {
    fn default() -> Self {
        Self {
            num_columns: 0,
            cells_per_column: 1,
            max_segments_per_cell: 255,
            max_synapses_per_segment: 255,
        }
    }
}

/// The connectivity graph owned by a temporal memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Connections {
    /// All cells, `num_columns * cells_per_column` of them.
    cells: Vec<CellData>,

    /// All segments (indexed by Segment).
    segments: Vec<SegmentData>,

    /// Destroyed segment indices (available for reuse).
    destroyed_segments: Vec<Segment>,

    num_columns: usize,
    cells_per_column: usize,
    max_segments_per_cell: usize,
    max_synapses_per_segment: usize,

    /// Live synapse count across all segments.
    num_synapses: usize,

    /// Learning iteration counter, used to age segments.
    iteration: u64,

    /// Statistics: number of pruned synapses.
    pruned_synapses: usize,

    /// Statistics: number of pruned segments.
    pruned_segments: usize,
}

impl Connections {
    /// Creates a new Connections instance with the given parameters.
    ///
    /// Every cell starts with zero segments.
    pub fn new(params: ConnectionsParams) -> Self {
        let num_cells = params.num_columns * params.cells_per_column;

        Self {
            cells: vec![CellData::default(); num_cells],
            segments: Vec::new(),
            destroyed_segments: Vec::new(),
            num_columns: params.num_columns,
            cells_per_column: params.cells_per_column,
            max_segments_per_cell: params.max_segments_per_cell,
            max_synapses_per_segment: params.max_synapses_per_segment,
            num_synapses: 0,
            iteration: 0,
            pruned_synapses: 0,
            pruned_segments: 0,
        }
    }

    /// Creates a Connections instance with default capacity limits.
    pub fn with_columns(num_columns: usize, cells_per_column: usize) -> Self {
        Self::new(ConnectionsParams {
            num_columns,
            cells_per_column,
            ..Default::default()
        })
    }

    /// Returns the number of cells.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Returns the number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Returns the number of cells per column.
    #[inline]
    pub fn cells_per_column(&self) -> usize {
        self.cells_per_column
    }

    /// Returns the per-cell segment limit.
    #[inline]
    pub fn max_segments_per_cell(&self) -> usize {
        self.max_segments_per_cell
    }

    /// Returns the per-segment synapse limit.
    #[inline]
    pub fn max_synapses_per_segment(&self) -> usize {
        self.max_synapses_per_segment
    }

    /// Returns the current iteration count.
    #[inline]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Returns the number of segments (excluding destroyed).
    pub fn num_segments(&self) -> usize {
        self.segments.len() - self.destroyed_segments.len()
    }

    /// Returns the number of synapses across all live segments.
    pub fn num_synapses(&self) -> usize {
        self.num_synapses
    }

    /// Returns the number of synapses removed so far.
    pub fn pruned_synapses(&self) -> usize {
        self.pruned_synapses
    }

    /// Returns the number of segments removed so far.
    pub fn pruned_segments(&self) -> usize {
        self.pruned_segments
    }

    // ========================================================================
    // Structure queries
    // ========================================================================

    /// Returns the cells of a column in ascending order.
    #[inline]
    pub fn cells_for_column(&self, column: usize) -> Range<CellIdx> {
        let start = (column * self.cells_per_column) as CellIdx;
        start..start + self.cells_per_column as CellIdx
    }

    /// Returns the column that owns a cell.
    #[inline]
    pub fn column_for_cell(&self, cell: CellIdx) -> usize {
        cell as usize / self.cells_per_column
    }

    /// Gets the segments for a cell.
    #[inline]
    pub fn segments_for_cell(&self, cell: CellIdx) -> &[Segment] {
        &self.cells[cell as usize].segments
    }

    /// Gets the cell that owns a segment.
    #[inline]
    pub fn cell_for_segment(&self, segment: Segment) -> CellIdx {
        self.segments[segment as usize].cell
    }

    /// Gets the segment data.
    #[inline]
    pub fn data_for_segment(&self, segment: Segment) -> &SegmentData {
        &self.segments[segment as usize]
    }

    /// Returns the cell with the fewest segments in a column.
    ///
    /// Ties go to the lowest cell index.
    pub fn least_used_cell(&self, column: usize) -> CellIdx {
        let cells = self.cells_for_column(column);
        let first = cells.start;
        cells
            .min_by_key(|&cell| self.cells[cell as usize].segments.len())
            .unwrap_or(first)
    }

    // ========================================================================
    // Activity queries (as of the last compute_activity)
    // ========================================================================

    /// Number of active segments on the cells of a column.
    pub fn active_segments_for_column(&self, column: usize) -> usize {
        self.cells_for_column(column)
            .map(|cell| self.count_segments(cell, SegmentData::is_active))
            .sum()
    }

    /// Number of matching segments on the cells of a column.
    pub fn matching_segments_for_column(&self, column: usize) -> usize {
        self.cells_for_column(column)
            .map(|cell| self.count_segments(cell, SegmentData::is_matching))
            .sum()
    }

    /// Active segments of a cell, in the cell's segment order.
    pub fn active_segments_for_cell(&self, cell: CellIdx) -> Vec<Segment> {
        self.filter_segments(cell, SegmentData::is_active)
    }

    /// Matching segments of a cell, in the cell's segment order.
    pub fn matching_segments_for_cell(&self, cell: CellIdx) -> Vec<Segment> {
        self.filter_segments(cell, SegmentData::is_matching)
    }

    /// Finds the matching segment with the most active potential synapses.
    ///
    /// Ties go to the lowest cell index, then to the earliest segment on that
    /// cell. Returns `None` if the column has no matching segment.
    pub fn best_matching_segment_for_column(&self, column: usize) -> Option<(CellIdx, Segment)> {
        let mut best: Option<(CellIdx, Segment, SynapseIdx)> = None;

        for cell in self.cells_for_column(column) {
            for &segment in self.segments_for_cell(cell) {
                let data = &self.segments[segment as usize];
                if !data.matching {
                    continue;
                }
                if best.map_or(true, |(_, _, score)| data.num_active_potential > score) {
                    best = Some((cell, segment, data.num_active_potential));
                }
            }
        }

        best.map(|(cell, segment, _)| (cell, segment))
    }

    /// Marks every column that has at least one active segment.
    pub fn compute_predicted_columns(&self) -> Vec<bool> {
        (0..self.num_columns)
            .map(|column| self.active_segments_for_column(column) > 0)
            .collect()
    }

    /// Returns the live segment and synapse totals.
    pub fn compute_stats(&self) -> MemoryStats {
        MemoryStats {
            segments: self.num_segments(),
            synapses: self.num_synapses,
        }
    }

    fn count_segments(&self, cell: CellIdx, pred: fn(&SegmentData) -> bool) -> usize {
        self.segments_for_cell(cell)
            .iter()
            .filter(|&&s| pred(&self.segments[s as usize]))
            .count()
    }

    fn filter_segments(&self, cell: CellIdx, pred: fn(&SegmentData) -> bool) -> Vec<Segment> {
        self.segments_for_cell(cell)
            .iter()
            .copied()
            .filter(|&s| pred(&self.segments[s as usize]))
            .collect()
    }

    // ========================================================================
    // Segment lifecycle
    // ========================================================================

    /// Creates a new segment on the specified cell.
    ///
    /// # Errors
    ///
    /// Returns [`VelesError::CapacityExceeded`] if the cell already owns
    /// `max_segments_per_cell` segments, and [`VelesError::IndexOutOfBounds`]
    /// for an unknown cell. The graph is unchanged in both cases.
    pub fn create_segment(&mut self, cell: CellIdx) -> Result<Segment> {
        let num_cells = self.cells.len();
        let cell_data = self
            .cells
            .get(cell as usize)
            .ok_or(VelesError::IndexOutOfBounds {
                index: cell as usize,
                size: num_cells,
            })?;

        if cell_data.segments.len() >= self.max_segments_per_cell {
            return Err(VelesError::CapacityExceeded {
                cell,
                limit: self.max_segments_per_cell,
            });
        }

        let data = SegmentData::new(cell, self.iteration);
        let segment = if let Some(reuse) = self.destroyed_segments.pop() {
            // Reuse destroyed segment slot
            self.segments[reuse as usize] = data;
            reuse
        } else {
            let segment = self.segments.len() as Segment;
            self.segments.push(data);
            segment
        };

        self.cells[cell as usize].segments.push(segment);
        Ok(segment)
    }

    /// Destroys a segment and all its synapses.
    ///
    /// The order of the cell's remaining segments is preserved. Destroying a
    /// segment twice is a no-op.
    pub fn destroy_segment(&mut self, segment: Segment) {
        let cell = self.segments[segment as usize].cell;
        let cell_segments = &mut self.cells[cell as usize].segments;
        let Some(pos) = cell_segments.iter().position(|&s| s == segment) else {
            return;
        };
        cell_segments.remove(pos);

        let data = &mut self.segments[segment as usize];
        let removed = data.synapses.len();
        data.synapses.clear();
        data.clear_activity();

        self.num_synapses -= removed;
        self.pruned_synapses += removed;
        self.pruned_segments += 1;
        self.destroyed_segments.push(segment);
    }

    /// Destroys the least recently used segment of a cell.
    ///
    /// The victim has the oldest `last_used_iteration`; ties go to the segment
    /// with fewer synapses, then to the earliest one. Returns the destroyed
    /// id, or `None` if the cell has no segments.
    pub fn evict_segment(&mut self, cell: CellIdx) -> Option<Segment> {
        let victim = self
            .cells
            .get(cell as usize)?
            .segments
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|&(pos, segment)| {
                let data = &self.segments[segment as usize];
                (data.last_used_iteration, data.synapses.len(), pos)
            })
            .map(|(_, segment)| segment)?;

        log::debug!(
            "[EVICT] cell {}: destroyed segment {} (last used at iteration {})",
            cell,
            victim,
            self.segments[victim as usize].last_used_iteration
        );
        self.destroy_segment(victim);
        Some(victim)
    }

    // ========================================================================
    // Learning operations
    // ========================================================================

    /// Adapts a segment's permanences against the previous active cells.
    ///
    /// Synapses onto active cells move by `+increment`, all others by
    /// `-decrement`; results are clamped to `[0, 1]`. Punishment passes a
    /// negative `increment` and a zero `decrement`.
    pub fn adapt_segment(
        &mut self,
        segment: Segment,
        prev_active_cells: &[bool],
        increment: Permanence,
        decrement: Permanence,
    ) {
        for synapse in &mut self.segments[segment as usize].synapses {
            let active = prev_active_cells
                .get(synapse.presynaptic_cell as usize)
                .copied()
                .unwrap_or(false);
            let delta = if active { increment } else { -decrement };
            synapse.permanence = (synapse.permanence + delta).clamp(MIN_PERMANENCE, MAX_PERMANENCE);
        }
    }

    /// Grows new synapses from a segment to growth candidates.
    ///
    /// Candidates are taken in the order given; those already wired to the
    /// segment (or out of range) are skipped. At most `max_new` synapses are
    /// added and growth stops once the segment holds
    /// `max_synapses_per_segment`. Returns the number of synapses grown.
    pub fn grow_synapses(
        &mut self,
        segment: Segment,
        candidates: &[CellIdx],
        initial_permanence: Permanence,
        max_new: usize,
    ) -> usize {
        let num_cells = self.cells.len();
        let max_synapses = self.max_synapses_per_segment;
        let permanence = initial_permanence.clamp(MIN_PERMANENCE, MAX_PERMANENCE);

        let data = &mut self.segments[segment as usize];
        data.last_used_iteration = self.iteration;

        let mut existing: AHashSet<CellIdx> =
            data.synapses.iter().map(|s| s.presynaptic_cell).collect();

        let mut grown = 0;
        for &candidate in candidates {
            if grown >= max_new {
                break;
            }
            if data.synapses.len() >= max_synapses {
                log::trace!(
                    "[GROW] segment {}: full at {} synapses",
                    segment,
                    max_synapses
                );
                break;
            }
            if candidate as usize >= num_cells || !existing.insert(candidate) {
                continue;
            }
            data.synapses.push(SynapseData {
                presynaptic_cell: candidate,
                permanence,
            });
            grown += 1;
        }

        self.num_synapses += grown;
        grown
    }

    // ========================================================================
    // Activity computation
    // ========================================================================

    /// Resets every segment's transient activity. Permanences are untouched.
    pub fn clear(&mut self) {
        for segment in &mut self.segments {
            segment.clear_activity();
        }
    }

    /// Recomputes segment activity against a set of active cells.
    ///
    /// A segment is active when its connected synapses onto active cells reach
    /// `activation_threshold`, and matching when all of its synapses onto
    /// active cells reach `min_threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`VelesError::DimensionMismatch`] if `active_cells` is not one
    /// entry per cell; segment activity is left as it was.
    pub fn compute_activity(
        &mut self,
        active_cells: &[bool],
        connected_permanence: Permanence,
        activation_threshold: usize,
        min_threshold: usize,
    ) -> Result<()> {
        if active_cells.len() != self.cells.len() {
            return Err(VelesError::DimensionMismatch {
                expected: self.cells.len(),
                actual: active_cells.len(),
            });
        }

        #[cfg(feature = "rayon")]
        self.segments.par_iter_mut().for_each(|segment| {
            segment.compute_activity(
                active_cells,
                connected_permanence,
                activation_threshold,
                min_threshold,
            );
        });

        #[cfg(not(feature = "rayon"))]
        for segment in &mut self.segments {
            segment.compute_activity(
                active_cells,
                connected_permanence,
                activation_threshold,
                min_threshold,
            );
        }

        Ok(())
    }

    /// Advances the iteration counter.
    pub fn start_new_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Removes dead synapses and the segments left without any.
    ///
    /// A synapse is dead once its permanence falls below [`EPSILON`].
    /// Returns `(segments_removed, synapses_removed)`.
    pub fn cleanup(&mut self) -> (usize, usize) {
        let mut dead_synapses = 0;
        let mut empty_segments = Vec::new();

        for cell in &self.cells {
            for &segment in &cell.segments {
                let synapses = &mut self.segments[segment as usize].synapses;
                let before = synapses.len();
                synapses.retain(|s| s.permanence >= EPSILON);
                dead_synapses += before - synapses.len();
                if synapses.is_empty() {
                    empty_segments.push(segment);
                }
            }
        }

        self.num_synapses -= dead_synapses;
        self.pruned_synapses += dead_synapses;

        for &segment in &empty_segments {
            self.destroy_segment(segment);
        }

        if dead_synapses > 0 || !empty_segments.is_empty() {
            log::trace!(
                "[CLEANUP] removed {} segments and {} synapses",
                empty_segments.len(),
                dead_synapses
            );
        }

        (empty_segments.len(), dead_synapses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_connections() -> Connections {
        Connections::new(ConnectionsParams {
            num_columns: 4,
            cells_per_column: 2,
            max_segments_per_cell: 2,
            max_synapses_per_segment: 3,
        })
    }

    fn active(num_cells: usize, cells: &[CellIdx]) -> Vec<bool> {
        crate::utils::bits::from_sparse(num_cells, cells)
    }

    #[test]
    fn test_create_connections() {
        let conn = Connections::with_columns(10, 4);
        assert_eq!(conn.num_cells(), 40);
        assert_eq!(conn.num_segments(), 0);
        assert_eq!(conn.num_synapses(), 0);
    }

    #[test]
    fn test_cells_for_column() {
        let conn = Connections::with_columns(10, 4);
        assert_eq!(conn.cells_for_column(0).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(conn.cells_for_column(2).collect::<Vec<_>>(), vec![8, 9, 10, 11]);
        assert_eq!(conn.column_for_cell(11), 2);
    }

    #[test]
    fn test_create_segment() {
        let mut conn = small_connections();
        let seg = conn.create_segment(5).unwrap();

        assert_eq!(conn.num_segments(), 1);
        assert_eq!(conn.cell_for_segment(seg), 5);
        assert_eq!(conn.segments_for_cell(5), &[seg]);
    }

    #[test]
    fn test_create_segment_capacity() {
        let mut conn = small_connections();
        conn.create_segment(1).unwrap();
        conn.create_segment(1).unwrap();

        let err = conn.create_segment(1).unwrap_err();
        assert_eq!(err, VelesError::CapacityExceeded { cell: 1, limit: 2 });
        assert_eq!(conn.segments_for_cell(1).len(), 2);
    }

    #[test]
    fn test_create_segment_unknown_cell() {
        let mut conn = small_connections();
        let err = conn.create_segment(8).unwrap_err();
        assert_eq!(err, VelesError::IndexOutOfBounds { index: 8, size: 8 });
    }

    #[test]
    fn test_grow_synapses_skips_existing() {
        let mut conn = Connections::with_columns(25, 4);
        let seg = conn.create_segment(10).unwrap();
        conn.grow_synapses(seg, &[50], 0.5, 10);

        let grown = conn.grow_synapses(seg, &[50, 51, 52, 53], 0.21, 2);

        // 50 is excluded because it already has a synapse
        assert_eq!(grown, 2);
        let presynaptic: Vec<_> = conn
            .data_for_segment(seg)
            .synapses
            .iter()
            .map(|s| s.presynaptic_cell)
            .collect();
        assert_eq!(presynaptic, vec![50, 51, 52]);
        assert_eq!(conn.num_synapses(), 3);
    }

    #[test]
    fn test_grow_synapses_stops_at_capacity() {
        let mut conn = small_connections();
        let seg = conn.create_segment(0).unwrap();

        let grown = conn.grow_synapses(seg, &[1, 2, 3, 4, 5], 0.3, 10);
        assert_eq!(grown, 3);
        assert_eq!(conn.data_for_segment(seg).synapses.len(), 3);

        assert_eq!(conn.grow_synapses(seg, &[6, 7], 0.3, 10), 0);
        assert_eq!(conn.num_synapses(), 3);
    }

    #[test]
    fn test_adapt_segment() {
        let mut conn = Connections::with_columns(25, 4);
        let seg = conn.create_segment(10).unwrap();
        conn.grow_synapses(seg, &[50, 51], 0.5, 2);

        conn.adapt_segment(seg, &active(100, &[50]), 0.1, 0.1);

        let synapses = &conn.data_for_segment(seg).synapses;
        assert!((synapses[0].permanence - 0.6).abs() < 1e-6);
        assert!((synapses[1].permanence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_punish_only_weakens_active() {
        let mut conn = Connections::with_columns(25, 4);
        let seg = conn.create_segment(10).unwrap();
        conn.grow_synapses(seg, &[50, 51], 0.5, 2);

        conn.adapt_segment(seg, &active(100, &[50]), -0.2, 0.0);

        let synapses = &conn.data_for_segment(seg).synapses;
        assert!((synapses[0].permanence - 0.3).abs() < 1e-6);
        assert!((synapses[1].permanence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_permanence_stays_bounded() {
        let mut conn = Connections::with_columns(25, 4);
        let seg = conn.create_segment(10).unwrap();
        conn.grow_synapses(seg, &[50, 51], 0.95, 2);
        let input = active(100, &[50]);

        for _ in 0..20 {
            conn.adapt_segment(seg, &input, 0.1, 0.1);
        }

        let synapses = &conn.data_for_segment(seg).synapses;
        assert_eq!(synapses[0].permanence, MAX_PERMANENCE);
        assert_eq!(synapses[1].permanence, MIN_PERMANENCE);
    }

    #[test]
    fn test_compute_activity() {
        let mut conn = Connections::with_columns(25, 4);

        let seg1 = conn.create_segment(10).unwrap();
        conn.grow_synapses(seg1, &[50, 51], 0.6, 2);
        conn.grow_synapses(seg1, &[52], 0.4, 1); // Not connected

        let seg2 = conn.create_segment(20).unwrap();
        conn.grow_synapses(seg2, &[50], 0.6, 1);

        conn.compute_activity(&active(100, &[50, 51, 52, 53]), 0.5, 2, 3)
            .unwrap();

        let data1 = conn.data_for_segment(seg1);
        assert_eq!(data1.num_active_connected, 2);
        assert_eq!(data1.num_active_potential, 3);
        assert!(data1.is_active());
        assert!(data1.is_matching());

        let data2 = conn.data_for_segment(seg2);
        assert_eq!(data2.num_active_connected, 1);
        assert!(!data2.is_active());
        assert!(!data2.is_matching());

        assert_eq!(conn.active_segments_for_column(2), 1);
        assert_eq!(conn.active_segments_for_cell(10), vec![seg1]);
        assert!(conn.active_segments_for_cell(20).is_empty());
    }

    #[test]
    fn test_compute_activity_rejects_wrong_length() {
        let mut conn = small_connections();
        let err = conn.compute_activity(&[true; 3], 0.5, 1, 1).unwrap_err();
        assert_eq!(
            err,
            VelesError::DimensionMismatch {
                expected: 8,
                actual: 3
            }
        );
    }

    #[test]
    fn test_clear_resets_activity() {
        let mut conn = small_connections();
        let seg = conn.create_segment(2).unwrap();
        conn.grow_synapses(seg, &[0], 0.6, 1);
        conn.compute_activity(&active(8, &[0]), 0.5, 1, 1).unwrap();
        assert!(conn.data_for_segment(seg).is_active());

        conn.clear();
        let data = conn.data_for_segment(seg);
        assert!(!data.is_active());
        assert!(!data.is_matching());
        assert_eq!(data.num_active_potential, 0);
        assert!((data.synapses[0].permanence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_best_matching_tie_break() {
        let mut conn = Connections::new(ConnectionsParams {
            num_columns: 4,
            cells_per_column: 4,
            max_segments_per_cell: 4,
            max_synapses_per_segment: 8,
        });

        // Column 1 holds cells 4..8; two equally good segments on cells 5 and 6.
        let a = conn.create_segment(6).unwrap();
        conn.grow_synapses(a, &[0, 1], 0.3, 2);
        let b = conn.create_segment(5).unwrap();
        conn.grow_synapses(b, &[0, 1], 0.3, 2);
        let c = conn.create_segment(5).unwrap();
        conn.grow_synapses(c, &[0, 1], 0.3, 2);

        conn.compute_activity(&active(16, &[0, 1]), 0.5, 2, 1).unwrap();
        assert_eq!(conn.matching_segments_for_column(1), 3);
        assert_eq!(conn.best_matching_segment_for_column(1), Some((5, b)));

        // A stronger match wins regardless of position.
        conn.grow_synapses(a, &[2], 0.3, 1);
        conn.compute_activity(&active(16, &[0, 1, 2]), 0.5, 2, 1).unwrap();
        assert_eq!(conn.best_matching_segment_for_column(1), Some((6, a)));

        assert_eq!(conn.best_matching_segment_for_column(0), None);
    }

    #[test]
    fn test_least_used_cell() {
        let mut conn = small_connections();
        assert_eq!(conn.least_used_cell(1), 2);

        conn.create_segment(2).unwrap();
        assert_eq!(conn.least_used_cell(1), 3);

        conn.create_segment(3).unwrap();
        assert_eq!(conn.least_used_cell(1), 2);
    }

    #[test]
    fn test_predicted_columns() {
        let mut conn = small_connections();
        let seg = conn.create_segment(5).unwrap();
        conn.grow_synapses(seg, &[0], 0.6, 1);

        assert_eq!(conn.compute_predicted_columns(), vec![false; 4]);

        conn.compute_activity(&active(8, &[0]), 0.5, 1, 1).unwrap();
        assert_eq!(
            conn.compute_predicted_columns(),
            vec![false, false, true, false]
        );
    }

    #[test]
    fn test_stats() {
        let mut conn = small_connections();
        let s1 = conn.create_segment(0).unwrap();
        let s2 = conn.create_segment(4).unwrap();
        conn.grow_synapses(s1, &[2, 3], 0.3, 2);
        conn.grow_synapses(s2, &[1], 0.3, 1);

        assert_eq!(
            conn.compute_stats(),
            MemoryStats {
                segments: 2,
                synapses: 3
            }
        );
    }

    #[test]
    fn test_cleanup_removes_dead_structures() {
        let mut conn = small_connections();
        let s1 = conn.create_segment(0).unwrap();
        let s2 = conn.create_segment(4).unwrap();
        conn.grow_synapses(s1, &[2, 3], 0.3, 2);
        conn.grow_synapses(s2, &[1], 0.1, 1);

        // Cell 2 active: s1 keeps its synapse to 2, loses the one to 3.
        conn.adapt_segment(s1, &active(8, &[2]), 0.0, 0.5);
        conn.adapt_segment(s2, &active(8, &[]), 0.0, 0.5);

        assert_eq!(conn.cleanup(), (1, 2));
        assert_eq!(conn.num_segments(), 1);
        assert_eq!(conn.num_synapses(), 1);
        assert!(conn.segments_for_cell(4).is_empty());
        assert_eq!(conn.data_for_segment(s1).synapses[0].presynaptic_cell, 2);
        assert_eq!(conn.pruned_segments(), 1);
        assert_eq!(conn.pruned_synapses(), 2);
    }

    #[test]
    fn test_destroyed_slot_is_reused() {
        let mut conn = small_connections();
        let s1 = conn.create_segment(0).unwrap();
        conn.grow_synapses(s1, &[2], 0.3, 1);
        conn.destroy_segment(s1);
        conn.destroy_segment(s1);

        assert_eq!(conn.num_segments(), 0);
        assert_eq!(conn.num_synapses(), 0);

        let s2 = conn.create_segment(3).unwrap();
        assert_eq!(s2, s1);
        assert_eq!(conn.cell_for_segment(s2), 3);
        assert!(conn.data_for_segment(s2).synapses.is_empty());
    }

    #[test]
    fn test_evict_least_recently_used() {
        let mut conn = small_connections();
        let old = conn.create_segment(0).unwrap();
        conn.grow_synapses(old, &[2, 3], 0.3, 2);

        conn.start_new_iteration();
        let recent = conn.create_segment(0).unwrap();
        conn.grow_synapses(recent, &[4], 0.3, 1);

        assert_eq!(conn.evict_segment(0), Some(old));
        assert_eq!(conn.segments_for_cell(0), &[recent]);
        assert_eq!(conn.evict_segment(1), None);
    }
}
