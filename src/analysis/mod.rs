//! Analysis layer: DOF groups, FE elements, constraint handling, numbering
//! and the eigen analysis driver

pub mod dof_group;
pub mod eigen;
pub mod fe_element;
pub mod handler;
pub mod integrator;
pub mod model;
pub mod numberer;
pub mod transformation;

pub use dof_group::{Column, DofGroup, Equation};
pub use eigen::EigenAnalysis;
pub use fe_element::FeElement;
pub use handler::{ConstraintHandler, HandlerKind, PlainHandler, TransformationHandler};
pub use integrator::{EigenIntegrator, Integrator, LinearCombination};
pub use model::{AnalysisModel, Tagged, TaggedStore};
pub use numberer::PlainNumberer;
pub use transformation::{expand_vector, transform_residual, transform_tangent, Transform};

use serde::{Deserialize, Serialize};

use crate::system::{LanczosOptions, Ordering};

/// Options for eigen analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenOptions {
    /// Number of modes to calculate
    pub num_modes: usize,
    /// Eigenvalues nearest to the shift are found first
    pub shift: f64,
    /// Maximum Lanczos restart cycles
    pub max_iterations: usize,
    /// Ritz residual tolerance, 0.0 selects machine precision
    pub tolerance: f64,
    /// Lanczos basis size (None = min(max(2 nev, nev + 8), n))
    pub ncv: Option<usize>,
    /// Equation ordering of the profile factorization
    pub ordering: Ordering,
    /// Rows per block of the profile factorization
    pub block_size: usize,
    /// How constraints are imposed
    pub handler: HandlerKind,
    /// Enable logging/progress output
    pub log: bool,
}

impl Default for EigenOptions {
    fn default() -> Self {
        Self {
            num_modes: 12,
            shift: 0.0,
            max_iterations: 1000,
            tolerance: 0.0,
            ncv: None,
            ordering: Ordering::default(),
            block_size: 32,
            handler: HandlerKind::default(),
            log: false,
        }
    }
}

impl EigenOptions {
    /// Options for the lowest `num_modes` modes
    pub fn new(num_modes: usize) -> Self {
        Self {
            num_modes,
            ..Self::default()
        }
    }

    /// Set the shift
    pub fn with_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_ncv(mut self, ncv: usize) -> Self {
        self.ncv = Some(ncv);
        self
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_handler(mut self, handler: HandlerKind) -> Self {
        self.handler = handler;
        self
    }

    /// Enable logging
    pub fn with_logging(mut self) -> Self {
        self.log = true;
        self
    }

    /// Iteration controls of the eigen solver
    pub fn lanczos(&self) -> LanczosOptions {
        LanczosOptions {
            ncv: self.ncv,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }
}
