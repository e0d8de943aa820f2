//! Integrators decide which element and nodal contributions form a tangent
//! or residual.

use serde::{Deserialize, Serialize};

use super::dof_group::DofGroup;
use super::fe_element::FeElement;
use crate::domain::Domain;
use crate::error::FEAResult;
use crate::math::{Mat, Vec as FEVec};

pub trait Integrator {
    fn form_ele_tangent(&self, fe: &FeElement, domain: &Domain, tang: &mut Mat) -> FEAResult<()>;

    fn form_ele_residual(&self, fe: &FeElement, domain: &Domain, resid: &mut FEVec) -> FEAResult<()>;

    fn form_node_tangent(&self, group: &DofGroup, domain: &Domain, tang: &mut Mat) -> FEAResult<()>;

    fn form_node_unbalance(&self, group: &DofGroup, domain: &Domain, unbal: &mut FEVec) -> FEAResult<()>;
}

/// Forms either the stiffness or the mass of a generalized eigenproblem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EigenIntegrator {
    Stiffness,
    Mass,
}

impl Integrator for EigenIntegrator {
    fn form_ele_tangent(&self, fe: &FeElement, domain: &Domain, tang: &mut Mat) -> FEAResult<()> {
        match self {
            EigenIntegrator::Stiffness => fe.add_kt_to_tang(domain, tang, 1.0),
            EigenIntegrator::Mass => fe.add_m_to_tang(domain, tang, 1.0),
        }
    }

    fn form_ele_residual(&self, _fe: &FeElement, _domain: &Domain, _resid: &mut FEVec) -> FEAResult<()> {
        Ok(())
    }

    fn form_node_tangent(&self, group: &DofGroup, domain: &Domain, tang: &mut Mat) -> FEAResult<()> {
        match self {
            EigenIntegrator::Stiffness => Ok(()),
            EigenIntegrator::Mass => group.add_m_to_tang(domain, tang, 1.0),
        }
    }

    fn form_node_unbalance(&self, _group: &DofGroup, _domain: &Domain, _unbal: &mut FEVec) -> FEAResult<()> {
        Ok(())
    }
}

/// `k Kt + ki Ki + c C + m M`, the tangent of most transient schemes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCombination {
    pub k: f64,
    pub ki: f64,
    pub c: f64,
    pub m: f64,
    /// Include damping and inertia forces in the residual
    pub inertia: bool,
}

impl LinearCombination {
    /// Static tangent `Kt`
    pub fn stiffness() -> Self {
        Self {
            k: 1.0,
            ki: 0.0,
            c: 0.0,
            m: 0.0,
            inertia: false,
        }
    }

    /// Effective tangent `Kt + a1 C + a0 M` with inertia in the residual
    pub fn dynamic(a0: f64, a1: f64) -> Self {
        Self {
            k: 1.0,
            ki: 0.0,
            c: a1,
            m: a0,
            inertia: true,
        }
    }
}

impl Integrator for LinearCombination {
    fn form_ele_tangent(&self, fe: &FeElement, domain: &Domain, tang: &mut Mat) -> FEAResult<()> {
        fe.add_kt_to_tang(domain, tang, self.k)?;
        fe.add_ki_to_tang(domain, tang, self.ki)?;
        fe.add_c_to_tang(domain, tang, self.c)?;
        fe.add_m_to_tang(domain, tang, self.m)
    }

    fn form_ele_residual(&self, fe: &FeElement, domain: &Domain, resid: &mut FEVec) -> FEAResult<()> {
        if self.inertia {
            fe.add_r_inc_inertia_to_residual(domain, resid, 1.0)
        } else {
            fe.add_r_to_residual(domain, resid, 1.0)
        }
    }

    fn form_node_tangent(&self, group: &DofGroup, domain: &Domain, tang: &mut Mat) -> FEAResult<()> {
        group.add_c_to_tang(domain, tang, self.c)?;
        group.add_m_to_tang(domain, tang, self.m)
    }

    fn form_node_unbalance(&self, group: &DofGroup, domain: &Domain, unbal: &mut FEVec) -> FEAResult<()> {
        group.add_p_to_unbalance(domain, unbal, 1.0)?;
        if self.inertia {
            group.add_m_accel_to_unbalance(domain, unbal, -1.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisModel, ConstraintHandler, PlainNumberer, TransformationHandler};
    use crate::domain::{MpConstraint, Node, SpConstraint};
    use crate::elements::Spring;
    use approx::assert_relative_eq;

    /// Node 2 follows node 1 in x, spring 2 joins the pair in x
    fn tied_pair() -> AnalysisModel {
        let mut domain = Domain::new();
        domain.add_node(Node::new(0, 2, &[0.0])).unwrap();
        for tag in 1..=2 {
            domain
                .add_node(Node::new(tag, 2, &[tag as f64]).with_mass(&[1.0, 1.0]).unwrap())
                .unwrap();
        }
        domain.add_element(Spring::new(1, [0, 1], 2, 0, 1000.0)).unwrap();
        domain
            .add_element(Spring::new(2, [1, 2], 2, 0, 500.0).with_damping(3.0).with_mass(2.0))
            .unwrap();
        domain.add_element(Spring::new(3, [0, 2], 2, 1, 300.0)).unwrap();
        for sp in SpConstraint::fix_all(0, &[0, 1]) {
            domain.add_sp_constraint(sp).unwrap();
        }
        domain.add_sp_constraint(SpConstraint::fixed(1, 1)).unwrap();
        domain
            .add_mp_constraint(MpConstraint::equal_dof(1, 2, &[0]).unwrap())
            .unwrap();

        let mut model = AnalysisModel::new(domain);
        TransformationHandler.handle(&mut model).unwrap();
        PlainNumberer.number(&mut model).unwrap();
        model
    }

    #[test]
    fn test_dynamic_tangent_combination() {
        let model = tied_pair();
        let domain = model.domain();
        let fe = model.fe_element(1).unwrap();

        let tang = fe
            .get_tangent(domain, &LinearCombination::dynamic(4.0, 2.0))
            .unwrap()
            .into_owned();
        assert_eq!(tang.shape(), (4, 4));
        // x of node 1 is column 0, the retained x seen from node 2 is column 2
        let diag = 500.0 + 2.0 * 3.0 + 4.0 * 1.0;
        let off = -500.0 - 2.0 * 3.0;
        let mut expected = Mat::zeros(4, 4);
        expected[(0, 0)] = diag;
        expected[(2, 2)] = diag;
        expected[(0, 2)] = off;
        expected[(2, 0)] = off;
        assert_relative_eq!(tang, expected, epsilon = 1e-12);

        let kt = fe.get_tangent(domain, &EigenIntegrator::Stiffness).unwrap().into_owned();
        let m = fe.get_tangent(domain, &EigenIntegrator::Mass).unwrap().into_owned();
        let undamped = fe
            .get_tangent(domain, &LinearCombination::dynamic(4.0, 0.0))
            .unwrap()
            .into_owned();
        assert_relative_eq!(undamped, kt + m * 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_static_combination_skips_inertia() {
        let mut model = tied_pair();
        let zero = FEVec::zeros(model.num_eqn());
        let accel = FEVec::from_element(model.num_eqn(), 1.0);
        model.set_response(&zero, &zero, &accel).unwrap();
        model.update_domain().unwrap();

        let domain = model.domain();
        let fe = model.fe_element(1).unwrap();
        let at_rest = fe
            .get_residual(domain, &LinearCombination::stiffness())
            .unwrap()
            .into_owned();
        assert_relative_eq!(at_rest, FEVec::zeros(4));

        // Half the spring mass on each end, both ends accelerate with node 1
        let moving = fe
            .get_residual(domain, &LinearCombination::dynamic(4.0, 2.0))
            .unwrap()
            .into_owned();
        assert_relative_eq!(moving, FEVec::from_vec(vec![-1.0, 0.0, -1.0, 0.0]), epsilon = 1e-12);
    }
}
