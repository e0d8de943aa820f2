//! FEA Eigen - finite element assembly and sparse eigen-solve core
//!
//! This library provides the analysis-side machinery of a structural FE
//! program, supporting:
//! - DOF groups and FE elements between the domain and the system of equations
//! - Constraint transformations (restraints and multi-point constraints)
//! - Shared working buffers for element and nodal tangents
//! - Beam integration rules (Gauss families, Chebyshev, hinge schemes)
//! - A blocked profile Cholesky factorization of `K - sigma M`
//! - Shift-invert Lanczos for the generalized problem `K x = lambda M x`
//!
//! ## Example
//! ```rust
//! use fea_eigen::prelude::*;
//!
//! let mut domain = Domain::new();
//! domain.add_node(Node::new(1, 1, &[0.0])).unwrap();
//! domain.add_node(Node::new(2, 1, &[1.0]).with_mass(&[1.0]).unwrap()).unwrap();
//! domain.add_node(Node::new(3, 1, &[2.0]).with_mass(&[1.0]).unwrap()).unwrap();
//! domain.add_element(Spring::new(1, [1, 2], 1, 0, 1000.0)).unwrap();
//! domain.add_element(Spring::new(2, [2, 3], 1, 0, 1000.0)).unwrap();
//! domain.add_sp_constraint(SpConstraint::fixed(1, 0)).unwrap();
//!
//! let (_model, results) = EigenAnalysis::new(EigenOptions::new(2)).analyze(domain).unwrap();
//! assert!((results.eigenvalues()[0] - 381.966).abs() < 1e-2);
//! ```

pub mod analysis;
pub mod domain;
pub mod elements;
pub mod error;
pub mod integration;
pub mod math;
pub mod results;
pub mod storage;
pub mod system;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{
        AnalysisModel, DofGroup, EigenAnalysis, EigenIntegrator, EigenOptions, Equation, FeElement,
        HandlerKind, Integrator, PlainNumberer, Transform,
    };
    pub use crate::domain::{Domain, LoadPattern, MpConstraint, NodalLoad, Node, SpConstraint, TimeSeries};
    pub use crate::elements::{ElasticBeamColumn2d, Element, Spring, Truss};
    pub use crate::error::{FEAError, FEAResult};
    pub use crate::integration::{BeamIntegration, HingeScheme};
    pub use crate::results::{EigenMode, EigenResults};
    pub use crate::storage::UnbalAndTangentStorage;
    pub use crate::system::{Graph, Ordering, SymArpackSoe, SymArpackSolver};
}
