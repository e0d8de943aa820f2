//! Result types for eigen analysis

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{FEAError, FEAResult};

/// Mode shape values at a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeShape {
    /// Node tag
    pub node: usize,
    /// One value per nodal DOF
    pub values: Vec<f64>,
}

/// One eigenmode of `K x = lambda M x`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenMode {
    /// Mode number, starting at 1
    pub mode: usize,
    /// Eigenvalue, the squared angular frequency
    pub eigenvalue: f64,
    /// Angular frequency in rad/s
    pub angular_frequency: f64,
    /// Frequency in Hz
    pub frequency: f64,
    /// Period in s, `None` for a zero frequency
    pub period: Option<f64>,
    /// Mass-normalized shape at every node
    pub shapes: Vec<ModeShape>,
}

impl EigenMode {
    fn new(mode: usize, eigenvalue: f64, shapes: Vec<ModeShape>) -> Self {
        let angular_frequency = eigenvalue.max(0.0).sqrt();
        let frequency = angular_frequency / (2.0 * PI);
        let period = (frequency > 0.0).then(|| 1.0 / frequency);
        Self {
            mode,
            eigenvalue,
            angular_frequency,
            frequency,
            period,
            shapes,
        }
    }

    /// Shape values at a node
    pub fn shape(&self, node: usize) -> Option<&[f64]> {
        self.shapes
            .iter()
            .find(|s| s.node == node)
            .map(|s| s.values.as_slice())
    }
}

/// Summary of an eigen analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EigenResults {
    /// Modes in ascending eigenvalue order
    pub modes: Vec<EigenMode>,
    /// Number of equations of the solved system
    pub num_equations: usize,
    /// Shift the system was factored with
    pub shift: f64,
}

impl EigenResults {
    /// Collect the modes stored on the nodes of a domain
    pub fn from_domain(domain: &Domain, eigenvalues: &[f64], num_equations: usize, shift: f64) -> Self {
        let modes = eigenvalues
            .iter()
            .enumerate()
            .map(|(k, &lambda)| {
                let shapes = domain
                    .nodes()
                    .filter_map(|node| {
                        node.eigenvector(k + 1).map(|v| ModeShape {
                            node: node.tag(),
                            values: v.iter().copied().collect(),
                        })
                    })
                    .collect();
                EigenMode::new(k + 1, lambda, shapes)
            })
            .collect();
        Self {
            modes,
            num_equations,
            shift,
        }
    }

    pub fn num_modes(&self) -> usize {
        self.modes.len()
    }

    /// Mode `mode`, 1-based
    pub fn mode(&self, mode: usize) -> FEAResult<&EigenMode> {
        if mode == 0 || mode > self.modes.len() {
            return Err(FEAError::ModeOutOfRange {
                mode,
                num_modes: self.modes.len(),
            });
        }
        Ok(&self.modes[mode - 1])
    }

    pub fn eigenvalues(&self) -> Vec<f64> {
        self.modes.iter().map(|m| m.eigenvalue).collect()
    }

    pub fn angular_frequencies(&self) -> Vec<f64> {
        self.modes.iter().map(|m| m.angular_frequency).collect()
    }

    /// Frequencies in Hz
    pub fn frequencies(&self) -> Vec<f64> {
        self.modes.iter().map(|m| m.frequency).collect()
    }

    pub fn periods(&self) -> Vec<Option<f64>> {
        self.modes.iter().map(|m| m.period).collect()
    }

    /// Export as pretty-printed JSON
    pub fn to_json(&self) -> FEAResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
