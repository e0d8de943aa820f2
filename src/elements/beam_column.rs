//! Elastic 2D beam-column integrated in flexibility form
//!
//! Section flexibility `f_s = diag(1/EA, 1/EI)` is integrated along the
//! member with a [`BeamIntegration`] rule and inverted to the basic
//! stiffness. With an exact rule the result matches the closed-form
//! Euler-Bernoulli stiffness.

use super::{check_ndf, gather, Element};
use crate::domain::Node;
use crate::error::{FEAError, FEAResult};
use crate::integration::BeamIntegration;
use crate::math::{Mat, Mat3, Vec as FEVec};

/// Two-node frame element with `(ux, uy, rz)` at each node
#[derive(Debug, Clone)]
pub struct ElasticBeamColumn2d {
    tag: usize,
    nodes: [usize; 2],
    /// Young's modulus
    pub e: f64,
    /// Cross-section area
    pub a: f64,
    /// Second moment of area
    pub iz: f64,
    /// Mass per unit length
    pub rho: f64,
    integration: BeamIntegration,
    num_sections: usize,

    length: f64,
    cos: f64,
    sin: f64,
    /// Basic stiffness, cached at `set_domain`
    kb: Mat3,
    trial_disp: FEVec,
}

impl ElasticBeamColumn2d {
    pub fn new(tag: usize, nodes: [usize; 2], e: f64, a: f64, iz: f64) -> Self {
        Self {
            tag,
            nodes,
            e,
            a,
            iz,
            rho: 0.0,
            integration: BeamIntegration::lobatto(),
            num_sections: 3,
            length: 0.0,
            cos: 1.0,
            sin: 0.0,
            kb: Mat3::zeros(),
            trial_disp: FEVec::zeros(6),
        }
    }

    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    /// Integrate the flexibility with `num_sections` sections of `integration`
    pub fn with_integration(mut self, integration: BeamIntegration, num_sections: usize) -> Self {
        self.integration = integration;
        self.num_sections = num_sections;
        self
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Basic stiffness relating `(axial, theta_i, theta_j)` to `(N, M_i, M_j)`
    pub fn basic_stiffness(&self) -> &Mat3 {
        &self.kb
    }

    /// Integrate the basic flexibility `f_b = sum(w L b^T f_s b)`
    fn basic_flexibility(&self) -> FEAResult<Mat3> {
        let rule = self.integration.rule(self.num_sections, self.length)?;
        let fs_axial = 1.0 / (self.e * self.a);
        let fs_bending = 1.0 / (self.e * self.iz);

        let mut fb = Mat3::zeros();
        for (&xi, &wt) in rule.xi.iter().zip(&rule.wt) {
            let wl = wt * self.length;
            // b(xi) = [[1, 0, 0], [0, xi - 1, xi]]
            let (bi, bj) = (xi - 1.0, xi);
            fb[(0, 0)] += wl * fs_axial;
            fb[(1, 1)] += wl * bi * bi * fs_bending;
            fb[(1, 2)] += wl * bi * bj * fs_bending;
            fb[(2, 2)] += wl * bj * bj * fs_bending;
        }
        fb[(2, 1)] = fb[(1, 2)];
        Ok(fb)
    }

    /// Basic-to-global compatibility matrix (3 x 6)
    fn compatibility(&self) -> Mat {
        let (c, s) = (self.cos, self.sin);
        let (cl, sl) = (c / self.length, s / self.length);
        #[rustfmt::skip]
        let data = [
            -c,  -s,  0.0, c,   s,   0.0,
            -sl, cl,  1.0, sl,  -cl, 0.0,
            -sl, cl,  0.0, sl,  -cl, 1.0,
        ];
        Mat::from_row_slice(3, 6, &data)
    }
}

impl Element for ElasticBeamColumn2d {
    fn tag(&self) -> usize {
        self.tag
    }

    fn node_tags(&self) -> &[usize] {
        &self.nodes
    }

    fn num_dof(&self) -> usize {
        6
    }

    fn set_domain(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_ndf(self.tag, nodes, 3)?;
        let (ni, nj) = (nodes[0], nodes[1]);
        if ni.crds().len() != 2 || nj.crds().len() != 2 {
            return Err(FEAError::InvalidInput(format!(
                "beam-column {} needs 2D nodes",
                self.tag
            )));
        }
        let length = ni.distance_to(nj);
        if length < 1e-10 {
            return Err(FEAError::InvalidInput(format!(
                "beam-column {} has zero length",
                self.tag
            )));
        }
        self.length = length;
        self.cos = (nj.crds()[0] - ni.crds()[0]) / length;
        self.sin = (nj.crds()[1] - ni.crds()[1]) / length;

        let fb = self.basic_flexibility()?;
        self.kb = fb.try_inverse().ok_or_else(|| {
            FEAError::NumericalFailure(format!(
                "singular section flexibility in beam-column {}",
                self.tag
            ))
        })?;
        Ok(())
    }

    fn tangent_stiff(&self) -> FEAResult<Mat> {
        let t = self.compatibility();
        let kb = Mat::from_iterator(3, 3, self.kb.iter().copied());
        Ok(t.transpose() * kb * t)
    }

    fn mass(&self) -> FEAResult<Mat> {
        let half = 0.5 * self.rho * self.length;
        let mut m = Mat::zeros(6, 6);
        for i in [0, 1, 3, 4] {
            m[(i, i)] = half;
        }
        Ok(m)
    }

    fn resisting_force(&self) -> FEAResult<FEVec> {
        Ok(self.tangent_stiff()? * &self.trial_disp)
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        self.trial_disp = gather(nodes, Node::trial_disp, 6)?;
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
    use crate::integration::HingeScheme;
    use approx::assert_relative_eq;

    fn horizontal(integration: BeamIntegration, n: usize) -> ElasticBeamColumn2d {
        let mut beam = ElasticBeamColumn2d::new(1, [1, 2], 200.0, 3.0, 4.0)
            .with_integration(integration, n);
        let a = Node::new(1, 3, &[0.0, 0.0]);
        let b = Node::new(2, 3, &[2.0, 0.0]);
        beam.set_domain(&[&a, &b]).unwrap();
        beam
    }

    #[test]
    fn test_matches_closed_form_stiffness() {
        let (e, a, iz, l) = (200.0, 3.0, 4.0, 2.0);
        for (integration, n) in [
            (BeamIntegration::legendre(), 2),
            (BeamIntegration::lobatto(), 3),
            (BeamIntegration::lobatto(), 5),
        ] {
            let k = horizontal(integration, n).tangent_stiff().unwrap();
            assert_relative_eq!(k[(0, 0)], e * a / l, max_relative = 1e-10);
            assert_relative_eq!(k[(0, 3)], -e * a / l, max_relative = 1e-10);
            assert_relative_eq!(k[(1, 1)], 12.0 * e * iz / (l * l * l), max_relative = 1e-10);
            assert_relative_eq!(k[(1, 2)], 6.0 * e * iz / (l * l), max_relative = 1e-10);
            assert_relative_eq!(k[(2, 2)], 4.0 * e * iz / l, max_relative = 1e-10);
            assert_relative_eq!(k[(2, 5)], 2.0 * e * iz / l, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_stiffness_is_symmetric_when_inclined() {
        let mut beam = ElasticBeamColumn2d::new(1, [1, 2], 1.0, 1.0, 1.0);
        let a = Node::new(1, 3, &[0.0, 0.0]);
        let b = Node::new(2, 3, &[1.0, 1.0]);
        beam.set_domain(&[&a, &b]).unwrap();
        let k = beam.tangent_stiff().unwrap();
        assert!(crate::math::is_symmetric(&k, 1e-12));
    }

    #[test]
    fn test_hinge_rule_with_elastic_section_is_exact() {
        let integration = BeamIntegration::legendre().with_hinge(HingeScheme::Radau, 0.1, 0.1);
        let k = horizontal(integration, 6).tangent_stiff().unwrap();
        assert_relative_eq!(k[(2, 2)], 4.0 * 200.0 * 4.0 / 2.0, max_relative = 1e-10);
    }

    #[test]
    fn test_single_section_flexibility_is_singular() {
        let mut beam = ElasticBeamColumn2d::new(1, [1, 2], 1.0, 1.0, 1.0)
            .with_integration(BeamIntegration::legendre(), 1);
        let a = Node::new(1, 3, &[0.0, 0.0]);
        let b = Node::new(2, 3, &[1.0, 0.0]);
        let err = beam.set_domain(&[&a, &b]).unwrap_err();
        assert!(err.is_numerical());
    }
}
