//! Single-point and multi-point constraints

use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};
use crate::math::Mat;

/// Prescribed value of one DOF of one node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpConstraint {
    pub node: usize,
    pub dof: usize,
    pub value: f64,
}

impl SpConstraint {
    pub fn new(node: usize, dof: usize, value: f64) -> Self {
        Self { node, dof, value }
    }

    /// Homogeneous restraint
    pub fn fixed(node: usize, dof: usize) -> Self {
        Self::new(node, dof, 0.0)
    }

    /// Restrain every listed DOF of a node
    pub fn fix_all(node: usize, dofs: &[usize]) -> Vec<Self> {
        dofs.iter().map(|&dof| Self::fixed(node, dof)).collect()
    }

    pub fn is_homogeneous(&self) -> bool {
        self.value == 0.0
    }
}

/// `u_c[constrained_dofs] = C * u_r[retained_dofs]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpConstraint {
    retained: usize,
    constrained: usize,
    matrix: Mat,
    retained_dofs: Vec<usize>,
    constrained_dofs: Vec<usize>,
}

impl MpConstraint {
    pub fn new(
        retained: usize,
        constrained: usize,
        matrix: Mat,
        retained_dofs: Vec<usize>,
        constrained_dofs: Vec<usize>,
    ) -> FEAResult<Self> {
        if retained == constrained {
            return Err(FEAError::Configuration(format!(
                "node {} cannot be constrained to itself",
                retained
            )));
        }
        if matrix.nrows() != constrained_dofs.len() || matrix.ncols() != retained_dofs.len() {
            return Err(FEAError::DofMismatch {
                what: format!("constraint matrix between nodes {} and {}", retained, constrained),
                expected: constrained_dofs.len() * retained_dofs.len(),
                found: matrix.nrows() * matrix.ncols(),
            });
        }
        Ok(Self {
            retained,
            constrained,
            matrix,
            retained_dofs,
            constrained_dofs,
        })
    }

    /// Tie the listed DOFs of `constrained` to the same DOFs of `retained`
    pub fn equal_dof(retained: usize, constrained: usize, dofs: &[usize]) -> FEAResult<Self> {
        Self::new(
            retained,
            constrained,
            Mat::identity(dofs.len(), dofs.len()),
            dofs.to_vec(),
            dofs.to_vec(),
        )
    }

    pub fn retained_node(&self) -> usize {
        self.retained
    }

    pub fn constrained_node(&self) -> usize {
        self.constrained
    }

    pub fn matrix(&self) -> &Mat {
        &self.matrix
    }

    pub fn retained_dofs(&self) -> &[usize] {
        &self.retained_dofs
    }

    pub fn constrained_dofs(&self) -> &[usize] {
        &self.constrained_dofs
    }
}
