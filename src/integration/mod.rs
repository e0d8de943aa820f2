//! Beam integration rules
//!
//! A [`BeamIntegration`] produces the normalized section locations `xi` on
//! [0, 1] and the weights `wt` (fractions of the element length) used by
//! force-based beam elements to integrate section response along the member.
//!
//! One data-driven type covers every family. Plastic hinge schemes wrap an
//! interior family with two end regions of fixed length.
//!
//! ## Example
//! ```rust
//! use fea_eigen::integration::BeamIntegration;
//!
//! let lobatto = BeamIntegration::from_name("Lobatto").unwrap();
//! let rule = lobatto.rule(5, 3.0).unwrap();
//! assert_eq!(rule.xi[0], 0.0);
//! assert_eq!(rule.xi[4], 1.0);
//! ```

mod hinge;
pub mod quadrature;

pub use hinge::{Hinge, HingeScheme};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};

/// Position sub-variant of the Chebyshev family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChebyshevKind {
    /// Equal weights, Chebyshev quadrature nodes (type 0)
    EqualWeight,
    /// Chebyshev roots, interior points only (type 1)
    Roots,
    /// Chebyshev extrema, endpoints included (type 2)
    Extrema,
}

impl ChebyshevKind {
    /// Map the legacy integer selector (0, 1, 2)
    pub fn from_type(kind: u8) -> FEAResult<Self> {
        match kind {
            0 => Ok(ChebyshevKind::EqualWeight),
            1 => Ok(ChebyshevKind::Roots),
            2 => Ok(ChebyshevKind::Extrema),
            other => Err(FEAError::InvalidInput(format!(
                "Chebyshev integration type must be 0, 1 or 2, got {}",
                other
            ))),
        }
    }
}

/// Quadrature family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntegrationFamily {
    Legendre,
    Lobatto,
    Radau,
    Chebyshev(ChebyshevKind),
    Trapezoidal,
    UserDefined { points: Vec<f64>, weights: Vec<f64> },
}

/// Section locations and weights on [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadratureRule {
    pub xi: Vec<f64>,
    pub wt: Vec<f64>,
}

impl QuadratureRule {
    pub fn len(&self) -> usize {
        self.xi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xi.is_empty()
    }

    /// Integrate `f(x)` over an element of the given length
    pub fn integrate(&self, length: f64, f: impl Fn(f64) -> f64) -> f64 {
        self.xi
            .iter()
            .zip(&self.wt)
            .map(|(&x, &w)| w * length * f(x * length))
            .sum()
    }
}

/// Beam integration rule: a family plus an optional hinge decoration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamIntegration {
    pub family: IntegrationFamily,
    pub hinge: Option<Hinge>,
}

impl BeamIntegration {
    pub fn new(family: IntegrationFamily) -> Self {
        Self {
            family,
            hinge: None,
        }
    }

    pub fn legendre() -> Self {
        Self::new(IntegrationFamily::Legendre)
    }

    pub fn lobatto() -> Self {
        Self::new(IntegrationFamily::Lobatto)
    }

    pub fn radau() -> Self {
        Self::new(IntegrationFamily::Radau)
    }

    pub fn chebyshev(kind: ChebyshevKind) -> Self {
        Self::new(IntegrationFamily::Chebyshev(kind))
    }

    pub fn trapezoidal() -> Self {
        Self::new(IntegrationFamily::Trapezoidal)
    }

    /// User-defined points and weights.
    ///
    /// Points outside [0, 1] are reported with a warning and kept as given.
    pub fn user_defined(points: Vec<f64>, weights: Vec<f64>) -> FEAResult<Self> {
        if points.len() != weights.len() {
            return Err(FEAError::InvalidInput(format!(
                "user-defined integration has {} points but {} weights",
                points.len(),
                weights.len()
            )));
        }
        if points.is_empty() {
            return Err(FEAError::InvalidInput(
                "user-defined integration requires at least one point".to_string(),
            ));
        }

        let integration = Self::new(IntegrationFamily::UserDefined { points, weights });
        for i in integration.out_of_range_points() {
            if let IntegrationFamily::UserDefined { points, .. } = &integration.family {
                warn!(
                    "user-defined integration point {} = {} lies outside [0, 1]",
                    i, points[i]
                );
            }
        }
        Ok(integration)
    }

    /// Wrap this rule as the interior of a hinge scheme
    pub fn with_hinge(mut self, scheme: HingeScheme, lp_i: f64, lp_j: f64) -> Self {
        self.hinge = Some(Hinge::new(scheme, lp_i, lp_j));
        self
    }

    /// Parse a family name such as `"Legendre"` or `"HingeRadau"`.
    ///
    /// Hinge names default to a Legendre interior and zero hinge
    /// lengths; set the lengths with [`BeamIntegration::with_hinge`].
    pub fn from_name(name: &str) -> FEAResult<Self> {
        let integration = match name.trim().to_ascii_lowercase().as_str() {
            "legendre" | "gauss" | "gausslegendre" => Self::legendre(),
            "lobatto" | "gausslobatto" => Self::lobatto(),
            "radau" | "gaussradau" => Self::radau(),
            "chebyshev" => Self::chebyshev(ChebyshevKind::EqualWeight),
            "trapezoidal" => Self::trapezoidal(),
            "hingemidpoint" => Self::legendre().with_hinge(HingeScheme::Midpoint, 0.0, 0.0),
            "hingeendpoint" => Self::legendre().with_hinge(HingeScheme::Endpoint, 0.0, 0.0),
            "hingeradau" => Self::legendre().with_hinge(HingeScheme::Radau, 0.0, 0.0),
            "hingeradautwo" => Self::legendre().with_hinge(HingeScheme::RadauTwo, 0.0, 0.0),
            _ => return Err(FEAError::UnknownIntegration(name.to_string())),
        };
        Ok(integration)
    }

    /// Indices of user-defined points outside the closed interval [0, 1]
    pub fn out_of_range_points(&self) -> Vec<usize> {
        match &self.family {
            IntegrationFamily::UserDefined { points, .. } => points
                .iter()
                .enumerate()
                .filter(|&(_, &x)| !(0.0..=1.0).contains(&x))
                .map(|(i, _)| i)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Points and weights for `num_sections` sections of an element of `length`
    pub fn rule(&self, num_sections: usize, length: f64) -> FEAResult<QuadratureRule> {
        match &self.hinge {
            None => self.family_rule(num_sections),
            Some(hinge) => {
                let hinge_points = hinge.scheme.hinge_points();
                if num_sections < hinge_points {
                    return Err(FEAError::Configuration(format!(
                        "{:?} hinge integration needs at least {} sections, got {}",
                        hinge.scheme, hinge_points, num_sections
                    )));
                }
                let interior_points = num_sections - hinge_points;
                let interior = if interior_points == 0 {
                    if hinge.interior_length(length) > 0.0 {
                        return Err(FEAError::Configuration(format!(
                            "{:?} hinge integration leaves an elastic interior but no sections to sample it",
                            hinge.scheme
                        )));
                    }
                    QuadratureRule {
                        xi: Vec::new(),
                        wt: Vec::new(),
                    }
                } else {
                    self.family_rule(interior_points)?
                };
                hinge.compose(&interior, length)
            }
        }
    }

    /// Normalized section locations
    pub fn section_locations(&self, num_sections: usize, length: f64) -> FEAResult<Vec<f64>> {
        Ok(self.rule(num_sections, length)?.xi)
    }

    /// Section weights as fractions of the element length
    pub fn section_weights(&self, num_sections: usize, length: f64) -> FEAResult<Vec<f64>> {
        Ok(self.rule(num_sections, length)?.wt)
    }

    fn family_rule(&self, n: usize) -> FEAResult<QuadratureRule> {
        let (xi, wt) = match &self.family {
            IntegrationFamily::Legendre => quadrature::gauss_legendre(n)?,
            IntegrationFamily::Lobatto => quadrature::gauss_lobatto(n)?,
            IntegrationFamily::Radau => quadrature::gauss_radau(n)?,
            IntegrationFamily::Chebyshev(ChebyshevKind::EqualWeight) => {
                quadrature::chebyshev_equal_weight(n)?
            }
            IntegrationFamily::Chebyshev(ChebyshevKind::Roots) => quadrature::chebyshev_roots(n)?,
            IntegrationFamily::Chebyshev(ChebyshevKind::Extrema) => {
                quadrature::chebyshev_extrema(n)?
            }
            IntegrationFamily::Trapezoidal => quadrature::trapezoidal(n)?,
            IntegrationFamily::UserDefined { points, weights } => {
                if points.len() != n {
                    return Err(FEAError::DofMismatch {
                        what: "user-defined integration points".to_string(),
                        expected: n,
                        found: points.len(),
                    });
                }
                (points.clone(), weights.clone())
            }
        };
        Ok(QuadratureRule { xi, wt })
    }
}

impl Default for BeamIntegration {
    fn default() -> Self {
        Self::lobatto()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn families() -> Vec<BeamIntegration> {
        vec![
            BeamIntegration::legendre(),
            BeamIntegration::lobatto(),
            BeamIntegration::radau(),
            BeamIntegration::chebyshev(ChebyshevKind::Roots),
            BeamIntegration::chebyshev(ChebyshevKind::Extrema),
            BeamIntegration::trapezoidal(),
        ]
    }

    #[test]
    fn test_weights_sum_to_one() {
        for integration in families() {
            for n in 2..=10 {
                let rule = integration.rule(n, 2.5).unwrap();
                assert_eq!(rule.len(), n);
                assert_relative_eq!(rule.wt.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
            }
        }
        for n in [2, 3, 4, 5, 6, 7, 9] {
            let rule = BeamIntegration::chebyshev(ChebyshevKind::EqualWeight)
                .rule(n, 1.0)
                .unwrap();
            assert_relative_eq!(rule.wt.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_gauss_families_are_ordered() {
        for integration in [
            BeamIntegration::legendre(),
            BeamIntegration::lobatto(),
            BeamIntegration::radau(),
        ] {
            for n in 2..=10 {
                let xi = integration.section_locations(n, 1.0).unwrap();
                assert!(xi.windows(2).all(|w| w[0] <= w[1]), "{:?}", integration);
                assert!(xi.iter().all(|&x| (0.0..=1.0).contains(&x)));
            }
        }
    }

    #[test]
    fn test_lobatto_includes_endpoints() {
        for n in 2..=10 {
            let xi = BeamIntegration::lobatto().section_locations(n, 4.0).unwrap();
            assert_eq!(xi[0], 0.0);
            assert_eq!(xi[n - 1], 1.0);
        }
    }

    #[test]
    fn test_unknown_family_name() {
        let err = BeamIntegration::from_name("Simpson").unwrap_err();
        assert!(matches!(err, FEAError::UnknownIntegration(_)));
        assert!(err.is_configuration());
        assert!(BeamIntegration::from_name("lobatto").is_ok());
    }

    #[test]
    fn test_user_defined_closed_interval_is_valid() {
        let integration =
            BeamIntegration::user_defined(vec![0.0, 0.5, 1.0], vec![0.25, 0.5, 0.25]).unwrap();
        assert!(integration.out_of_range_points().is_empty());
        let rule = integration.rule(3, 2.0).unwrap();
        assert_eq!(rule.xi, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_user_defined_out_of_range_is_kept() {
        let integration =
            BeamIntegration::user_defined(vec![-0.1, 1.2], vec![0.5, 0.5]).unwrap();
        assert_eq!(integration.out_of_range_points(), vec![0, 1]);
        assert_eq!(integration.section_locations(2, 1.0).unwrap(), vec![-0.1, 1.2]);
    }

    #[test]
    fn test_user_defined_size_mismatch() {
        assert!(BeamIntegration::user_defined(vec![0.5], vec![0.5, 0.5]).is_err());
        let integration = BeamIntegration::user_defined(vec![0.5], vec![1.0]).unwrap();
        assert!(integration.rule(2, 1.0).unwrap_err().is_configuration());
    }

    #[test]
    fn test_chebyshev_gap_is_explicit_error() {
        let err = BeamIntegration::chebyshev(ChebyshevKind::EqualWeight)
            .rule(8, 1.0)
            .unwrap_err();
        assert!(matches!(err, FEAError::UnsupportedConfiguration(_)));
    }

    #[test]
    fn test_hinge_radau_with_legendre_interior() {
        let integration = BeamIntegration::legendre().with_hinge(HingeScheme::Radau, 0.2, 0.4);
        let rule = integration.rule(6, 5.0).unwrap();
        assert_eq!(rule.len(), 6);
        assert!(rule.xi.windows(2).all(|w| w[0] <= w[1]));
        assert_relative_eq!(rule.wt.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rule_integrates_over_length() {
        let rule = BeamIntegration::legendre().rule(3, 2.0).unwrap();
        // Integral of x^2 over [0, 2]
        assert_relative_eq!(rule.integrate(2.0, |x| x * x), 8.0 / 3.0, epsilon = 1e-12);
    }
}
