//! # Veles - online sequence learning with temporal memory
//!
//! Veles implements a cortical-learning-style temporal memory. Each timestep
//! it receives a sparse boolean vector of active columns, decides which cells
//! inside those columns become active, learns by adjusting synapse
//! permanences, predicts which columns will be active next, and reports how
//! surprising the current input was.
//!
//! ## Overview
//!
//! - **Connections**: the column → cell → segment → synapse graph, stored in
//!   flat arenas. Owns every permanence and the per-timestep segment activity.
//! - **Temporal Memory**: the controller that runs the per-timestep pipeline
//!   (predicted activation, bursting, punishment, cleanup, activity scan).
//! - **Anomaly**: the raw fraction of active columns that were not predicted.
//!
//! Encoding raw values into columns and spatial pooling happen upstream and
//! are not part of this crate.
//!
//! ## Quick Start
//!
//! ```rust
//! use veles::prelude::*;
//!
//! let mut tm = TemporalMemory::new(TemporalMemoryParams {
//!     num_columns: 64,
//!     cells_per_column: 4,
//!     activation_threshold: 2,
//!     min_threshold: 1,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let a = veles::utils::bits::from_sparse(64, &[1, 2, 3]);
//! let b = veles::utils::bits::from_sparse(64, &[10, 11, 12]);
//!
//! for _ in 0..20 {
//!     tm.compute(&a, true).unwrap();
//!     tm.compute(&b, true).unwrap();
//! }
//!
//! let anomaly = tm.anomaly_score().unwrap();
//! assert!((0.0..=1.0).contains(&anomaly));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: derive `Serialize`/`Deserialize` for parameters and statistics
//! - `rayon`: parallel segment activity scan

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod algorithms;
pub mod types;
pub mod utils;

/// Re-export of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::algorithms::{
        Anomaly, Connections, ConnectionsParams, SegmentData, SequenceMemory, SynapseData,
        TemporalMemory, TemporalMemoryParams,
    };
    pub use crate::types::{CellIdx, MemoryStats, Permanence, Real, Segment, SynapseIdx};
    pub use crate::utils::Random;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library.
pub mod error {
    use thiserror::Error;

    /// Main error type for veles operations.
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum VelesError {
        /// Invalid parameter value.
        #[error("Invalid parameter '{name}': {message}")]
        InvalidParameter {
            /// Name of the invalid parameter.
            name: &'static str,
            /// Description of the error.
            message: String,
        },

        /// Index out of bounds.
        #[error("Index {index} out of bounds (size: {size})")]
        IndexOutOfBounds {
            /// The invalid index.
            index: usize,
            /// The valid size.
            size: usize,
        },

        /// Input vector has the wrong length.
        #[error("Dimension mismatch: expected {expected}, got {actual}")]
        DimensionMismatch {
            /// Expected length.
            expected: usize,
            /// Actual length.
            actual: usize,
        },

        /// A cell already owns the maximum number of segments.
        #[error("Cell {cell} already has {limit} segments")]
        CapacityExceeded {
            /// The full cell.
            cell: u32,
            /// The per-cell segment limit.
            limit: usize,
        },
    }

    /// Result type alias using `VelesError`.
    pub type Result<T> = std::result::Result<T, VelesError>;
}

pub use error::{Result, VelesError};
