//! Linear elastic truss in 2D or 3D with lumped mass

use super::{check_ndf, gather, Element};
use crate::domain::Node;
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec};

/// Two-node axial bar. Nodes may carry rotational DOF beyond the translations.
#[derive(Debug, Clone)]
pub struct Truss {
    tag: usize,
    nodes: [usize; 2],
    /// Young's modulus
    pub e: f64,
    /// Cross-section area
    pub a: f64,
    /// Mass per unit length
    pub rho: f64,
    ndf: usize,
    length: f64,
    /// Direction cosines, one per spatial dimension
    cosines: Vec<f64>,
    trial_disp: FEVec,
}

impl Truss {
    pub fn new(tag: usize, nodes: [usize; 2], e: f64, a: f64) -> Self {
        Self {
            tag,
            nodes,
            e,
            a,
            rho: 0.0,
            ndf: 0,
            length: 0.0,
            cosines: Vec::new(),
            trial_disp: FEVec::zeros(0),
        }
    }

    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Element DOF index of translation `d` at end `end`
    fn dof(&self, end: usize, d: usize) -> usize {
        end * self.ndf + d
    }
}

impl Element for Truss {
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
        let (ni, nj) = (nodes[0], nodes[1]);
        let dim = ni.crds().len();
        if (dim != 2 && dim != 3) || nj.crds().len() != dim {
            return Err(FEAError::InvalidInput(format!(
                "truss {} needs 2D or 3D nodes of matching dimension",
                self.tag
            )));
        }
        if ni.ndf() < dim {
            return Err(FEAError::DofMismatch {
                what: format!("node {} of truss {}", ni.tag(), self.tag),
                expected: dim,
                found: ni.ndf(),
            });
        }
        check_ndf(self.tag, nodes, ni.ndf())?;

        let length = ni.distance_to(nj);
        if length < 1e-10 {
            return Err(FEAError::InvalidInput(format!(
                "truss {} has zero length",
                self.tag
            )));
        }

        self.ndf = ni.ndf();
        self.length = length;
        self.cosines = ni
            .crds()
            .iter()
            .zip(nj.crds())
            .map(|(a, b)| (b - a) / length)
            .collect();
        self.trial_disp = FEVec::zeros(self.num_dof());
        Ok(())
    }

    fn tangent_stiff(&self) -> FEAResult<Mat> {
        let n = self.num_dof();
        let ea_l = self.e * self.a / self.length;
        let mut k = Mat::zeros(n, n);
        for (p, &cp) in self.cosines.iter().enumerate() {
            for (q, &cq) in self.cosines.iter().enumerate() {
                let v = ea_l * cp * cq;
                k[(self.dof(0, p), self.dof(0, q))] = v;
                k[(self.dof(1, p), self.dof(1, q))] = v;
                k[(self.dof(0, p), self.dof(1, q))] = -v;
                k[(self.dof(1, p), self.dof(0, q))] = -v;
            }
        }
        Ok(k)
    }

    fn mass(&self) -> FEAResult<Mat> {
        let n = self.num_dof();
        let half = 0.5 * self.rho * self.length;
        let mut m = Mat::zeros(n, n);
        for end in 0..2 {
            for d in 0..self.cosines.len() {
                let i = self.dof(end, d);
                m[(i, i)] = half;
            }
        }
        Ok(m)
    }

    fn resisting_force(&self) -> FEAResult<FEVec> {
        Ok(self.tangent_stiff()? * &self.trial_disp)
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

    fn inclined() -> Truss {
        let mut truss = Truss::new(1, [1, 2], 200.0, 2.0).with_rho(3.0);
        let a = Node::new(1, 2, &[0.0, 0.0]);
        let b = Node::new(2, 2, &[3.0, 4.0]);
        truss.set_domain(&[&a, &b]).unwrap();
        truss
    }

    #[test]
    fn test_truss_stiffness() {
        let truss = inclined();
        let k = truss.tangent_stiff().unwrap();
        // EA/L = 80, c = 0.6, s = 0.8
        assert_relative_eq!(k[(0, 0)], 80.0 * 0.36, epsilon = 1e-12);
        assert_relative_eq!(k[(0, 1)], 80.0 * 0.48, epsilon = 1e-12);
        assert_relative_eq!(k[(1, 3)], -80.0 * 0.64, epsilon = 1e-12);
        assert_relative_eq!(k.row_sum()[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_truss_lumped_mass() {
        let m = inclined().mass().unwrap();
        assert_relative_eq!(m.trace(), 2.0 * 3.0 * 5.0, epsilon = 1e-12);
        assert_eq!(m[(0, 1)], 0.0);
    }

    #[test]
    fn test_truss_on_frame_nodes() {
        let mut truss = Truss::new(1, [1, 2], 1.0, 1.0);
        let a = Node::new(1, 3, &[0.0, 0.0]);
        let b = Node::new(2, 3, &[2.0, 0.0]);
        truss.set_domain(&[&a, &b]).unwrap();
        let k = truss.tangent_stiff().unwrap();
        assert_eq!(k.nrows(), 6);
        assert_relative_eq!(k[(0, 3)], -0.5, epsilon = 1e-12);
        assert_eq!(k[(2, 2)], 0.0);
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut truss = Truss::new(1, [1, 2], 1.0, 1.0);
        let a = Node::new(1, 2, &[1.0, 1.0]);
        let b = Node::new(2, 2, &[1.0, 1.0]);
        assert!(truss.set_domain(&[&a, &b]).is_err());
    }
}
