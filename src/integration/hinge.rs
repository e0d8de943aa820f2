//! Plastic hinge integration: two end regions of fixed length wrapped
//! around an interior rule that covers the remaining elastic length.

use serde::{Deserialize, Serialize};

use super::QuadratureRule;
use crate::error::{FEAError, FEAResult};

/// How the hinge regions are sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HingeScheme {
    /// One point at the centre of each hinge region
    Midpoint,
    /// One point at each element end, weighted by the hinge length
    Endpoint,
    /// Two-point Gauss-Radau over a region of length `4 lp`
    Radau,
    /// Two-point Gauss-Radau over a region of length `2 lp`
    RadauTwo,
}

impl HingeScheme {
    /// Number of sample points placed in the two hinge regions
    pub fn hinge_points(&self) -> usize {
        match self {
            HingeScheme::Midpoint | HingeScheme::Endpoint => 2,
            HingeScheme::Radau | HingeScheme::RadauTwo => 4,
        }
    }

    /// Length of the element end consumed by a hinge of length `lp`
    fn region_length(&self, lp: f64) -> f64 {
        match self {
            HingeScheme::Midpoint | HingeScheme::Endpoint => lp,
            HingeScheme::Radau => 4.0 * lp,
            HingeScheme::RadauTwo => 2.0 * lp,
        }
    }

    /// Points (measured from the element end) and weights, both in length units
    fn end_samples(&self, lp: f64) -> [(f64, f64); 2] {
        match self {
            HingeScheme::Midpoint => [(0.5 * lp, lp), (0.0, 0.0)],
            HingeScheme::Endpoint => [(0.0, lp), (0.0, 0.0)],
            HingeScheme::Radau => [(0.0, lp), (8.0 / 3.0 * lp, 3.0 * lp)],
            HingeScheme::RadauTwo => [(0.0, 0.5 * lp), (4.0 / 3.0 * lp, 1.5 * lp)],
        }
    }
}

/// Hinge lengths at the i and j ends plus the sampling scheme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hinge {
    pub scheme: HingeScheme,
    pub lp_i: f64,
    pub lp_j: f64,
}

impl Hinge {
    pub fn new(scheme: HingeScheme, lp_i: f64, lp_j: f64) -> Self {
        Self { scheme, lp_i, lp_j }
    }

    /// Interior length left for the elastic rule
    pub fn interior_length(&self, length: f64) -> f64 {
        length - self.scheme.region_length(self.lp_i) - self.scheme.region_length(self.lp_j)
    }

    /// Compose the hinge points with an interior rule defined on [0, 1]
    pub(crate) fn compose(&self, interior: &QuadratureRule, length: f64) -> FEAResult<QuadratureRule> {
        if length <= 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "hinge integration requires a positive element length, got {}",
                length
            )));
        }
        if self.lp_i < 0.0 || self.lp_j < 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "negative hinge length (lp_i = {}, lp_j = {})",
                self.lp_i, self.lp_j
            )));
        }

        let interior_length = self.interior_length(length);
        if interior_length < 0.0 {
            return Err(FEAError::Configuration(format!(
                "hinge regions ({}, {}) exceed element length {}",
                self.lp_i, self.lp_j, length
            )));
        }

        let npts = self.scheme.hinge_points() / 2;
        let start = self.scheme.region_length(self.lp_i) / length;
        let alpha = interior_length / length;

        let mut xi = Vec::with_capacity(interior.len() + 2 * npts);
        let mut wt = Vec::with_capacity(xi.capacity());

        let i_samples = self.scheme.end_samples(self.lp_i);
        for &(x, w) in &i_samples[..npts] {
            xi.push(x / length);
            wt.push(w / length);
        }

        for (&x, &w) in interior.xi.iter().zip(&interior.wt) {
            xi.push(start + alpha * x);
            wt.push(alpha * w);
        }

        let j_samples = self.scheme.end_samples(self.lp_j);
        for &(x, w) in j_samples[..npts].iter().rev() {
            xi.push(1.0 - x / length);
            wt.push(w / length);
        }

        Ok(QuadratureRule { xi, wt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn midpoint_interior() -> QuadratureRule {
        QuadratureRule {
            xi: vec![0.5],
            wt: vec![1.0],
        }
    }

    #[test]
    fn test_midpoint_hinge_layout() {
        let hinge = Hinge::new(HingeScheme::Midpoint, 0.5, 1.0);
        let rule = hinge.compose(&midpoint_interior(), 10.0).unwrap();
        assert_eq!(rule.len(), 3);
        assert_relative_eq!(rule.xi[0], 0.025, epsilon = 1e-15);
        assert_relative_eq!(rule.xi[1], 0.05 + 0.85 * 0.5, epsilon = 1e-15);
        assert_relative_eq!(rule.xi[2], 0.95, epsilon = 1e-15);
        assert_relative_eq!(rule.wt.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_radau_hinge_layout() {
        let hinge = Hinge::new(HingeScheme::Radau, 0.3, 0.3);
        let rule = hinge.compose(&midpoint_interior(), 6.0).unwrap();
        assert_eq!(rule.len(), 5);
        assert_eq!(rule.xi[0], 0.0);
        assert_relative_eq!(rule.xi[1], 0.8 / 6.0, epsilon = 1e-15);
        assert_eq!(rule.xi[4], 1.0);
        assert_relative_eq!(rule.wt[0], 0.05, epsilon = 1e-15);
        assert_relative_eq!(rule.wt[1], 0.15, epsilon = 1e-15);
        assert_relative_eq!(rule.wt.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_hinge_exceeding_length_is_rejected() {
        let hinge = Hinge::new(HingeScheme::Radau, 1.0, 1.0);
        let err = hinge.compose(&midpoint_interior(), 6.0).unwrap_err();
        assert!(err.is_configuration());
    }
}
