//! Eigen analysis driver
//!
//! Runs the phases in their required order: constraint handling, numbering,
//! structure, assembly of `K` and `M`, factorization and the Lanczos solve.
//! The mass product inside the iteration is formed element by element
//! through the analysis model.

use log::{debug, info};

use super::handler::ConstraintHandler;
use super::integrator::{EigenIntegrator, Integrator};
use super::model::AnalysisModel;
use super::numberer::PlainNumberer;
use super::EigenOptions;
use crate::domain::Domain;
use crate::error::FEAResult;
use crate::results::EigenResults;
use crate::system::{SymArpackSoe, SymArpackSolver};

#[derive(Debug, Clone, Default)]
pub struct EigenAnalysis {
    options: EigenOptions,
}

impl EigenAnalysis {
    pub fn new(options: EigenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EigenOptions {
        &self.options
    }

    /// Solve the domain's eigenproblem. The mode shapes are stored on the
    /// nodes of the returned model's domain.
    pub fn analyze(&self, domain: Domain) -> FEAResult<(AnalysisModel, EigenResults)> {
        let mut model = AnalysisModel::new(domain);
        let soe = self.solve_model(&mut model)?;
        let results = EigenResults::from_domain(
            model.domain(),
            soe.eigenvalues(),
            model.num_eqn(),
            soe.shift(),
        );
        if self.options.log {
            for mode in &results.modes {
                info!(
                    "mode {}: lambda = {:.6e}, f = {:.6} Hz",
                    mode.mode, mode.eigenvalue, mode.frequency
                );
            }
        }
        Ok((model, results))
    }

    /// Populate an empty model, assemble and solve. Returns the solved system.
    pub fn solve_model(&self, model: &mut AnalysisModel) -> FEAResult<SymArpackSoe> {
        let constrained = self.options.handler.handle(model)?;
        let num_eqn = PlainNumberer.number(model)?;
        if self.options.log {
            info!(
                "eigen analysis: {} nodes, {} elements, {} equations, {} constrained DOF",
                model.domain().num_nodes(),
                model.domain().num_elements(),
                num_eqn,
                constrained
            );
        }

        let mut soe = SymArpackSoe::new(self.options.ordering, self.options.block_size);
        soe.set_size(&model.dof_graph())?;
        soe.set_shift(self.options.shift);
        assemble(model, &mut soe)?;

        let solver = SymArpackSolver::new(self.options.lanczos());
        solver.solve_with(&mut soe, &*model, self.options.num_modes)?;

        model.set_eigenvectors(soe.eigenvectors())?;
        debug!("{} mode shapes stored on the nodes", soe.num_modes());
        Ok(soe)
    }
}

/// Add the stiffness of every FE element and DOF group to `A`, then their
/// mass through [`SymArpackSoe::add_m`]
pub fn assemble(model: &AnalysisModel, soe: &mut SymArpackSoe) -> FEAResult<()> {
    let domain = model.domain();
    let stiffness: &dyn Integrator = &EigenIntegrator::Stiffness;
    for fe in model.fe_elements() {
        let tang = fe.get_tangent(domain, stiffness)?;
        soe.add_a(&tang, fe.id(), 1.0)?;
    }
    for group in model.dof_groups() {
        let tang = group.get_tangent(domain, stiffness)?;
        soe.add_a(&tang, group.id(), 1.0)?;
    }

    let mass: &dyn Integrator = &EigenIntegrator::Mass;
    for fe in model.fe_elements() {
        let tang = fe.get_tangent(domain, mass)?;
        soe.add_m(&tang, fe.id(), 1.0)?;
    }
    for group in model.dof_groups() {
        let tang = group.get_tangent(domain, mass)?;
        soe.add_m(&tang, group.id(), 1.0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::HandlerKind;
    use crate::domain::{Node, SpConstraint};
    use crate::elements::Spring;
    use approx::assert_relative_eq;

    fn chain() -> Domain {
        let mut domain = Domain::new();
        domain.add_node(Node::new(0, 1, &[0.0])).unwrap();
        domain.add_node(Node::new(1, 1, &[1.0]).with_mass(&[1.0]).unwrap()).unwrap();
        domain.add_node(Node::new(2, 1, &[2.0]).with_mass(&[1.0]).unwrap()).unwrap();
        domain.add_element(Spring::new(1, [0, 1], 1, 0, 1000.0)).unwrap();
        domain.add_element(Spring::new(2, [1, 2], 1, 0, 1000.0)).unwrap();
        domain.add_sp_constraint(SpConstraint::fixed(0, 0)).unwrap();
        domain
    }

    #[test]
    fn test_both_handlers_agree() {
        for handler in [HandlerKind::Plain, HandlerKind::Transformation] {
            let options = EigenOptions::new(2).with_handler(handler);
            let (model, results) = EigenAnalysis::new(options).analyze(chain()).unwrap();
            assert_eq!(model.num_eqn(), 2);
            assert_relative_eq!(results.eigenvalues()[0], 381.966, max_relative = 1e-3);
            assert_relative_eq!(results.eigenvalues()[1], 2618.034, max_relative = 1e-3);
            // Fixed node shows a zero mode shape
            assert_eq!(results.mode(1).unwrap().shape(0), Some(&[0.0][..]));
        }
    }

    #[test]
    fn test_mode_shapes_mass_normalized() {
        let (model, results) = EigenAnalysis::new(EigenOptions::new(2)).analyze(chain()).unwrap();
        for mode in 1..=2 {
            let u1 = model.domain().node(1).unwrap().eigenvector(mode).unwrap()[0];
            let u2 = model.domain().node(2).unwrap().eigenvector(mode).unwrap()[0];
            assert_relative_eq!(u1 * u1 + u2 * u2, 1.0, epsilon = 1e-10);
        }
        assert_eq!(results.num_equations, 2);
    }
}
