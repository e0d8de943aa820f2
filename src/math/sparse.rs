//! Sparse structure utilities: sorted adjacency, compressed patterns and
//! bandwidth/profile reducing orderings.
//!
//! Stiffness adjacency graphs of FE meshes are typically 95-99% sparse. The
//! symbolic factorization walks each row's columns in ascending order, so the
//! compressed structure built here always keeps its column lists sorted.

use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;

use crate::error::{FEAError, FEAResult};

/// Insert `value` into an ascending list, keeping it sorted and free of duplicates.
///
/// Returns `false` when the value was already present.
pub fn insert_sorted(list: &mut Vec<usize>, value: usize) -> bool {
    let mut j = list.len();
    while j > 0 && list[j - 1] > value {
        j -= 1;
    }
    if j > 0 && list[j - 1] == value {
        return false;
    }
    list.insert(j, value);
    true
}

/// Build the compressed `(row_start, col)` structure from per-row adjacency.
///
/// Each row's columns are placed by an insertion pass, so unsorted input
/// adjacency produces ascending, duplicate-free lanes. Diagonal entries are
/// excluded.
pub fn compress_adjacency(adjacency: &[Vec<usize>]) -> FEAResult<SparsityPattern> {
    let n = adjacency.len();
    let mut row_start = Vec::with_capacity(n + 1);
    let mut col = Vec::new();
    row_start.push(0);

    let mut lane: Vec<usize> = Vec::new();
    for (row, neighbours) in adjacency.iter().enumerate() {
        lane.clear();
        for &c in neighbours {
            if c == row {
                continue;
            }
            if c >= n {
                return Err(FEAError::InvalidInput(format!(
                    "adjacency of row {} references column {} outside size {}",
                    row, c, n
                )));
            }
            insert_sorted(&mut lane, c);
        }
        col.extend_from_slice(&lane);
        row_start.push(col.len());
    }

    SparsityPattern::try_from_offsets_and_indices(n, n, row_start, col)
        .map_err(|e| FEAError::InvalidInput(format!("invalid sparsity pattern: {}", e)))
}

/// Bandwidth reduction using Reverse Cuthill-McKee algorithm
///
/// Returns a permutation vector `perm` with `perm[new] = old`.
pub fn reverse_cuthill_mckee(pattern: &SparsityPattern) -> Vec<usize> {
    let n = pattern.major_dim();
    if n == 0 {
        return vec![];
    }

    let degrees: Vec<usize> = (0..n).map(|i| pattern.lane(i).len()).collect();

    // Neighbours sorted by degree for tie-breaking
    let adj: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            let mut neighbours = pattern.lane(i).to_vec();
            neighbours.sort_by_key(|&j| (degrees[j], j));
            neighbours
        })
        .collect();

    let mut visited = vec![false; n];
    let mut result = Vec::with_capacity(n);
    let mut queue = std::collections::VecDeque::new();

    while result.len() < n {
        // Start each component from its lowest degree node
        let start = (0..n)
            .filter(|&i| !visited[i])
            .min_by_key(|&i| (degrees[i], i))
            .unwrap_or(0);

        queue.push_back(start);
        visited[start] = true;

        while let Some(node) = queue.pop_front() {
            result.push(node);

            for &neighbour in &adj[node] {
                if !visited[neighbour] {
                    visited[neighbour] = true;
                    queue.push_back(neighbour);
                }
            }
        }
    }

    // Cuthill-McKee -> Reverse Cuthill-McKee
    result.reverse();
    result
}

/// Identity ordering
pub fn natural_ordering(n: usize) -> Vec<usize> {
    (0..n).collect()
}

/// Apply permutation to reorder entries, `out[new] = vec[perm[new]]`
pub fn apply_permutation<T: Clone>(vec: &[T], perm: &[usize]) -> Vec<T> {
    perm.iter().map(|&i| vec[i].clone()).collect()
}

/// Create inverse permutation, `inv[old] = new`
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (new_idx, &old_idx) in perm.iter().enumerate() {
        inv[old_idx] = new_idx;
    }
    inv
}

/// Sparse matrix-vector multiplication
#[inline]
pub fn sparse_matvec(csr: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let n = csr.nrows();
    let mut y = DVector::zeros(n);

    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    for row in 0..n {
        let start = row_offsets[row];
        let end = row_offsets[row + 1];

        let mut sum = 0.0;
        for idx in start..end {
            sum += values[idx] * x[col_indices[idx]];
        }
        y[row] = sum;
    }

    y
}

/// Profile (envelope) size of a pattern under an ordering `perm[new] = old`
pub fn profile_size(pattern: &SparsityPattern, perm: &[usize]) -> usize {
    let invp = inverse_permutation(perm);
    let mut total = 0;
    for new_row in 0..perm.len() {
        let first = pattern
            .lane(perm[new_row])
            .iter()
            .map(|&c| invp[c])
            .filter(|&c| c < new_row)
            .min()
            .unwrap_or(new_row);
        total += new_row - first;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    #[test]
    fn test_insert_sorted() {
        let mut list = vec![];
        for v in [5, 1, 3, 3, 9, 0] {
            insert_sorted(&mut list, v);
        }
        assert_eq!(list, vec![0, 1, 3, 5, 9]);
        assert!(!insert_sorted(&mut list, 5));
    }

    #[test]
    fn test_compress_adjacency_sorts_rows() {
        let adjacency = vec![vec![2, 1, 0], vec![0], vec![1, 0, 1]];
        let pattern = compress_adjacency(&adjacency).unwrap();
        assert_eq!(pattern.major_offsets(), &[0, 2, 3, 5]);
        assert_eq!(pattern.lane(0), &[1, 2]);
        assert_eq!(pattern.lane(2), &[0, 1]);
        assert_eq!(pattern.nnz(), 5);
    }

    #[test]
    fn test_rcm_reduces_profile_of_arrow() {
        // Arrow matrix: node 0 connected to everything
        let n = 6;
        let mut adjacency = vec![Vec::new(); n];
        for i in 1..n {
            adjacency[0].push(i);
            adjacency[i].push(0);
        }
        let pattern = compress_adjacency(&adjacency).unwrap();
        let perm = reverse_cuthill_mckee(&pattern);

        let mut sorted = perm.clone();
        sorted.sort();
        assert_eq!(sorted, natural_ordering(n));
        assert!(profile_size(&pattern, &perm) <= profile_size(&pattern, &natural_ordering(n)));
    }

    #[test]
    fn test_permutation_roundtrip() {
        let perm = vec![2, 0, 1];
        let inv = inverse_permutation(&perm);
        assert_eq!(inv, vec![1, 2, 0]);
        let data = vec!['a', 'b', 'c'];
        assert_eq!(apply_permutation(&data, &perm), vec!['c', 'a', 'b']);
    }

    #[test]
    fn test_sparse_matvec() {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 2.0);
        coo.push(0, 1, 1.0);
        coo.push(1, 1, 3.0);
        coo.push(1, 1, 1.0);
        let csr = CsrMatrix::from(&coo);
        let y = sparse_matvec(&csr, &DVector::from_vec(vec![1.0, 2.0]));
        assert_eq!(y[0], 4.0);
        assert_eq!(y[1], 8.0);
    }
}
