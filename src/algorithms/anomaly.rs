//! Raw anomaly score.
//!
//! The anomaly score is the fraction of active columns that were not
//! predicted by the previous timestep.

use crate::types::Real;
use crate::utils::bits;

/// Computes raw anomaly scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anomaly;

impl Anomaly {
    /// Computes the anomaly score.
    ///
    /// # Arguments
    ///
    /// * `active` - The active columns
    /// * `predicted` - The columns predicted for this timestep
    ///
    /// # Returns
    ///
    /// Anomaly score between 0.0 (fully predicted) and 1.0 (fully anomalous).
    /// An empty active set scores 0.0: nothing arrived, so nothing was missed.
    pub fn compute(active: &[bool], predicted: &[bool]) -> Real {
        debug_assert_eq!(active.len(), predicted.len());

        let num_active = bits::count_active(active);
        if num_active == 0 {
            return 0.0;
        }

        let num_predicted_active = bits::overlap(active, predicted);
        1.0 - (num_predicted_active as Real / num_active as Real)
    }
}
