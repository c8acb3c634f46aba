//! Helpers for dense boolean vectors.
//!
//! Columns and cells are exchanged as `&[bool]` of fixed length. These
//! functions convert between that dense form and ascending index lists and
//! compute the counts the controller needs.

use crate::types::{CellIdx, Real};

/// Number of `true` entries.
#[inline]
pub fn count_active(bits: &[bool]) -> usize {
    bits.iter().filter(|&&b| b).count()
}

/// Ascending indices of the `true` entries.
pub fn sparse_indices(bits: &[bool]) -> Vec<CellIdx> {
    bits.iter()
        .enumerate()
        .filter_map(|(i, &b)| b.then_some(i as CellIdx))
        .collect()
}

/// Builds a dense vector of length `size` with the given indices set.
///
/// Indices outside `0..size` are ignored.
pub fn from_sparse(size: usize, indices: &[CellIdx]) -> Vec<bool> {
    let mut bits = vec![false; size];
    for &i in indices {
        if let Some(slot) = bits.get_mut(i as usize) {
            *slot = true;
        }
    }
    bits
}

/// Number of positions set in both vectors.
///
/// Only the common prefix is compared when lengths differ.
#[inline]
pub fn overlap(a: &[bool], b: &[bool]) -> usize {
    a.iter().zip(b).filter(|(&x, &y)| x && y).count()
}

/// Fraction of entries that are set; 0.0 for an empty vector.
pub fn sparsity(bits: &[bool]) -> Real {
    if bits.is_empty() {
        return 0.0;
    }
    count_active(bits) as Real / bits.len() as Real
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_and_sparse() {
        let bits = [true, false, false, true, true];
        assert_eq!(count_active(&bits), 3);
        assert_eq!(sparse_indices(&bits), vec![0, 3, 4]);
    }

    #[test]
    fn test_from_sparse_ignores_out_of_range() {
        let bits = from_sparse(4, &[1, 3, 9]);
        assert_eq!(bits, vec![false, true, false, true]);
    }

    #[test]
    fn test_overlap() {
        let a = from_sparse(8, &[0, 2, 4, 6]);
        let b = from_sparse(8, &[2, 3, 4]);
        assert_eq!(overlap(&a, &b), 2);
        assert_eq!(overlap(&a, &[]), 0);
    }

    #[test]
    fn test_sparsity() {
        assert_eq!(sparsity(&[]), 0.0);
        assert!((sparsity(&from_sparse(10, &[1, 2])) - 0.2).abs() < 1e-6);
    }
}
