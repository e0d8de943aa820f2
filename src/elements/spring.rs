//! Zero-length spring acting in one DOF direction

use super::{check_ndf, gather, Element};
use crate::domain::Node;
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec};

/// Two-node spring coupling DOF `dir` of both nodes
#[derive(Debug, Clone)]
pub struct Spring {
    tag: usize,
    nodes: [usize; 2],
    ndf: usize,
    dir: usize,
    /// Axial stiffness
    pub k: f64,
    /// Dashpot coefficient
    pub c: f64,
    /// Total mass, lumped half to each node
    pub mass: f64,
    trial_disp: FEVec,
}

impl Spring {
    pub fn new(tag: usize, nodes: [usize; 2], ndf: usize, dir: usize, k: f64) -> Self {
        Self {
            tag,
            nodes,
            ndf,
            dir,
            k,
            c: 0.0,
            mass: 0.0,
            trial_disp: FEVec::zeros(2 * ndf),
        }
    }

    pub fn with_damping(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// `value * [1 -1; -1 1]` on the spring direction
    fn coupling(&self, value: f64) -> Mat {
        let n = self.num_dof();
        let (i, j) = (self.dir, self.ndf + self.dir);
        let mut m = Mat::zeros(n, n);
        m[(i, i)] = value;
        m[(j, j)] = value;
        m[(i, j)] = -value;
        m[(j, i)] = -value;
        m
    }
}

impl Element for Spring {
    fn tag(&self) -> usize {
        self.tag
    }

    fn node_tags(&self) -> &[usize] {
        &self.nodes
    }

    fn num_dof(&self) -> usize {
        2 * self.ndf
    }

    fn set_domain(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        if self.dir >= self.ndf {
            return Err(FEAError::InvalidInput(format!(
                "spring {} direction {} exceeds {} DOF per node",
                self.tag, self.dir, self.ndf
            )));
        }
        check_ndf(self.tag, nodes, self.ndf)
    }

    fn tangent_stiff(&self) -> FEAResult<Mat> {
        Ok(self.coupling(self.k))
    }

    fn damp(&self) -> FEAResult<Mat> {
        Ok(self.coupling(self.c))
    }

    fn mass(&self) -> FEAResult<Mat> {
        let n = self.num_dof();
        let mut m = Mat::zeros(n, n);
        m[(self.dir, self.dir)] = 0.5 * self.mass;
        m[(self.ndf + self.dir, self.ndf + self.dir)] = 0.5 * self.mass;
        Ok(m)
    }

    fn resisting_force(&self) -> FEAResult<FEVec> {
        Ok(self.coupling(self.k) * &self.trial_disp)
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        self.trial_disp = gather(nodes, Node::trial_disp, self.num_dof())?;
        Ok(())
    }

    fn revert_to_start(&mut self) -> FEAResult<()> {
        self.trial_disp.fill(0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spring_stiffness() {
        let spring = Spring::new(1, [1, 2], 2, 1, 100.0);
        let k = spring.tangent_stiff().unwrap();
        assert_eq!(k.nrows(), 4);
        assert_eq!(k[(1, 1)], 100.0);
        assert_eq!(k[(1, 3)], -100.0);
        assert_eq!(k[(0, 0)], 0.0);
    }

    #[test]
    fn test_spring_mass_is_lumped() {
        let spring = Spring::new(1, [1, 2], 1, 0, 1.0).with_mass(4.0);
        let m = spring.mass().unwrap();
        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(1, 1)], 2.0);
        assert_eq!(m[(0, 1)], 0.0);
    }

    #[test]
    fn test_invalid_direction() {
        let mut spring = Spring::new(1, [1, 2], 1, 2, 1.0);
        let a = Node::new(1, 1, &[0.0]);
        let b = Node::new(2, 1, &[0.0]);
        assert!(spring.set_domain(&[&a, &b]).is_err());
    }

    #[test]
    fn test_revert_restores_committed_force() {
        let mut spring = Spring::new(1, [1, 2], 1, 0, 10.0);
        let a = Node::new(1, 1, &[0.0]);
        let mut b = Node::new(2, 1, &[1.0]);
        b.set_trial_disp(&FEVec::from_vec(vec![0.2])).unwrap();
        b.commit_state();
        spring.update(&[&a, &b]).unwrap();
        spring.commit_state().unwrap();

        b.set_trial_disp(&FEVec::from_vec(vec![0.5])).unwrap();
        spring.update(&[&a, &b]).unwrap();
        assert_relative_eq!(spring.resisting_force().unwrap()[1], 5.0, epsilon = 1e-12);

        b.revert_to_last_commit();
        spring.revert_to_last_commit(&[&a, &b]).unwrap();
        assert_relative_eq!(spring.resisting_force().unwrap()[1], 2.0, epsilon = 1e-12);
    }
}
