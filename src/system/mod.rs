//! Sparse symmetric generalized eigenvalue system `K x = lambda M x`
//!
//! The stiffness is shifted and stored as `A = K - sigma M` in a blocked
//! profile. [`SymArpackSolver`] factors `A` and runs a shift-invert Lanczos
//! iteration through the reverse-communication driver [`SymmetricLanczos`].

pub mod graph;
pub mod lanczos;
pub mod profile;
mod soe;
mod solver;

pub use graph::Graph;
pub use lanczos::{Ido, LanczosOptions, SymmetricLanczos};
pub use profile::ProfileFactor;
pub use soe::{SoeState, SymArpackSoe};
pub use solver::{default_ncv, SymArpackSolver};

use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};
use crate::math::sparse::sparse_matvec;
use crate::math::Vec as FEVec;

/// Equation ordering applied before the profile factorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ordering {
    /// Keep the numberer's order
    Natural,
    /// Reverse Cuthill-McKee, reduces the profile of banded meshes
    #[default]
    ReverseCuthillMcKee,
}

/// `y = M x` in equation numbering
pub trait MassOperator {
    fn mass_product(&self, x: &FEVec, y: &mut FEVec) -> FEAResult<()>;
}

impl MassOperator for CsrMatrix<f64> {
    fn mass_product(&self, x: &FEVec, y: &mut FEVec) -> FEAResult<()> {
        if x.len() != self.ncols() || y.len() != self.nrows() {
            return Err(FEAError::DofMismatch {
                what: "mass product".to_string(),
                expected: self.ncols(),
                found: x.len(),
            });
        }
        y.copy_from(&sparse_matvec(self, x));
        Ok(())
    }
}
