//! Equation connectivity graph

use nalgebra_sparse::pattern::SparsityPattern;

use crate::error::FEAResult;
use crate::math::sparse::{compress_adjacency, insert_sorted};

/// One vertex per equation, an edge for every pair of equations coupled by
/// an FE element or DOF group. Adjacency lists are kept ascending.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    adjacency: Vec<Vec<usize>>,
}

impl Graph {
    pub fn new(num_vertex: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); num_vertex],
        }
    }

    pub fn num_vertex(&self) -> usize {
        self.adjacency.len()
    }

    /// Undirected edges
    pub fn num_edge(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Add the edge `a - b`; self loops are ignored
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        insert_sorted(&mut self.adjacency[a], b);
        insert_sorted(&mut self.adjacency[b], a);
    }

    /// Connect every pair of the given equations
    pub fn add_clique(&mut self, vertices: &[usize]) {
        for (i, &a) in vertices.iter().enumerate() {
            for &b in &vertices[i + 1..] {
                self.add_edge(a, b);
            }
        }
    }

    pub fn adjacency(&self, vertex: usize) -> &[usize] {
        &self.adjacency[vertex]
    }

    /// Compressed `(row_start, col)` structure
    pub fn to_pattern(&self) -> FEAResult<SparsityPattern> {
        compress_adjacency(&self.adjacency)
    }
}
