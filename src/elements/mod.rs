//! Structural elements module
//!
//! [`Element`] is the contract the analysis layer relies on: matrices in the
//! element's native DOF ordering (node by node, `ndf` entries per node) and
//! state transitions driven by the nodal trial response.

mod beam_column;
mod spring;
mod truss;

pub use beam_column::ElasticBeamColumn2d;
pub use spring::Spring;
pub use truss::Truss;

use std::fmt::Debug;

use crate::domain::Node;
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec};

/// A finite element of the domain
pub trait Element: Debug {
    fn tag(&self) -> usize;

    /// Connected node tags, in the element's DOF order
    fn node_tags(&self) -> &[usize];

    /// Native DOF count, the sum of the nodes' `ndf`
    fn num_dof(&self) -> usize;

    /// Called once when the element is added to a domain
    fn set_domain(&mut self, nodes: &[&Node]) -> FEAResult<()>;

    fn tangent_stiff(&self) -> FEAResult<Mat>;

    fn initial_stiff(&self) -> FEAResult<Mat> {
        self.tangent_stiff()
    }

    fn damp(&self) -> FEAResult<Mat> {
        Ok(Mat::zeros(self.num_dof(), self.num_dof()))
    }

    fn mass(&self) -> FEAResult<Mat> {
        Ok(Mat::zeros(self.num_dof(), self.num_dof()))
    }

    fn resisting_force(&self) -> FEAResult<FEVec>;

    /// Resisting force plus damping and inertia forces of the nodal trial response
    fn resisting_force_inc_inertia(&self, nodes: &[&Node]) -> FEAResult<FEVec> {
        let mut force = self.resisting_force()?;
        let accel = gather(nodes, Node::trial_accel, self.num_dof())?;
        let vel = gather(nodes, Node::trial_vel, self.num_dof())?;
        force.gemv(1.0, &self.mass()?, &accel, 1.0);
        force.gemv(1.0, &self.damp()?, &vel, 1.0);
        Ok(force)
    }

    /// Pull the trial response of the nodes into the element state
    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()>;

    fn commit_state(&mut self) -> FEAResult<()> {
        Ok(())
    }

    /// Return to the last committed state. Called after the nodes reverted.
    fn revert_to_last_commit(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        self.update(nodes)
    }

    fn revert_to_start(&mut self) -> FEAResult<()>;
}

/// Concatenate a nodal quantity over the element's nodes
pub(crate) fn gather(
    nodes: &[&Node],
    quantity: fn(&Node) -> &FEVec,
    num_dof: usize,
) -> FEAResult<FEVec> {
    let found: usize = nodes.iter().map(|n| n.ndf()).sum();
    if found != num_dof {
        return Err(FEAError::DofMismatch {
            what: "element nodes".to_string(),
            expected: num_dof,
            found,
        });
    }
    let mut out = FEVec::zeros(num_dof);
    let mut offset = 0;
    for node in nodes {
        let v = quantity(node);
        out.rows_mut(offset, v.len()).copy_from(v);
        offset += v.len();
    }
    Ok(out)
}

/// Check that every node carries `ndf` DOF
pub(crate) fn check_ndf(element: usize, nodes: &[&Node], ndf: usize) -> FEAResult<()> {
    for node in nodes {
        if node.ndf() != ndf {
            return Err(FEAError::DofMismatch {
                what: format!("node {} of element {}", node.tag(), element),
                expected: ndf,
                found: node.ndf(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_concatenates_nodes() {
        let mut a = Node::new(1, 2, &[0.0]);
        let b = Node::new(2, 1, &[1.0]);
        a.set_trial_disp(&FEVec::from_vec(vec![1.0, 2.0])).unwrap();
        let u = gather(&[&a, &b], Node::trial_disp, 3).unwrap();
        assert_eq!(u.as_slice(), &[1.0, 2.0, 0.0]);
        assert!(gather(&[&a, &b], Node::trial_disp, 4).is_err());
    }
}
