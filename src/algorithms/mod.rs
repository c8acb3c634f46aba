//! Temporal memory algorithms.
//!
//! - **Connections**: The cell/segment/synapse connectivity graph
//! - **Temporal Memory**: Learns temporal sequences on top of the graph
//! - **Sequence Memory**: The trait the temporal memory implements
//! - **Anomaly**: Raw anomaly scoring

mod anomaly;
mod connections;
mod sequence_memory;
mod temporal_memory;

pub use anomaly::Anomaly;
pub use connections::{CellData, Connections, ConnectionsParams, SegmentData, SynapseData};
pub use sequence_memory::SequenceMemory;
pub use temporal_memory::{TemporalMemory, TemporalMemoryParams};
