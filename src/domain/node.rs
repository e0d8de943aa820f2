//! Node - a point carrying `ndf` degrees of freedom and their response

use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec};

/// A node of the domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    tag: usize,
    ndf: usize,
    crds: Vec<f64>,

    trial_disp: FEVec,
    trial_vel: FEVec,
    trial_accel: FEVec,
    commit_disp: FEVec,
    commit_vel: FEVec,
    commit_accel: FEVec,

    /// Lumped nodal mass, `ndf x ndf`
    mass: Option<Mat>,
    /// Applied load assembled by the load patterns
    unbalanced_load: FEVec,

    /// Mode shapes, one column per mode
    #[serde(skip)]
    eigenvectors: Option<Mat>,

    /// DOF group created for this node by the constraint handler
    #[serde(skip)]
    pub(crate) dof_group: Option<usize>,
}

impl Node {
    /// Create a node with `ndf` degrees of freedom at the given coordinates
    pub fn new(tag: usize, ndf: usize, crds: &[f64]) -> Self {
        Self {
            tag,
            ndf,
            crds: crds.to_vec(),
            trial_disp: FEVec::zeros(ndf),
            trial_vel: FEVec::zeros(ndf),
            trial_accel: FEVec::zeros(ndf),
            commit_disp: FEVec::zeros(ndf),
            commit_vel: FEVec::zeros(ndf),
            commit_accel: FEVec::zeros(ndf),
            mass: None,
            unbalanced_load: FEVec::zeros(ndf),
            eigenvectors: None,
            dof_group: None,
        }
    }

    /// Attach a diagonal (lumped) mass, one entry per DOF
    pub fn with_mass(mut self, diagonal: &[f64]) -> FEAResult<Self> {
        self.set_mass(Mat::from_diagonal(&FEVec::from_column_slice(diagonal)))?;
        Ok(self)
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn ndf(&self) -> usize {
        self.ndf
    }

    pub fn crds(&self) -> &[f64] {
        &self.crds
    }

    /// Calculate distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        self.crds
            .iter()
            .zip(&other.crds)
            .map(|(a, b)| (b - a) * (b - a))
            .sum::<f64>()
            .sqrt()
    }

    pub fn mass(&self) -> Option<&Mat> {
        self.mass.as_ref()
    }

    pub fn set_mass(&mut self, mass: Mat) -> FEAResult<()> {
        if mass.nrows() != self.ndf || mass.ncols() != self.ndf {
            return Err(FEAError::DofMismatch {
                what: format!("mass of node {}", self.tag),
                expected: self.ndf,
                found: mass.nrows().max(mass.ncols()),
            });
        }
        self.mass = Some(mass);
        Ok(())
    }

    pub fn trial_disp(&self) -> &FEVec {
        &self.trial_disp
    }

    pub fn trial_vel(&self) -> &FEVec {
        &self.trial_vel
    }

    pub fn trial_accel(&self) -> &FEVec {
        &self.trial_accel
    }

    pub fn committed_disp(&self) -> &FEVec {
        &self.commit_disp
    }

    pub fn committed_vel(&self) -> &FEVec {
        &self.commit_vel
    }

    pub fn committed_accel(&self) -> &FEVec {
        &self.commit_accel
    }

    fn check_len(&self, what: &str, v: &FEVec) -> FEAResult<()> {
        if v.len() != self.ndf {
            return Err(FEAError::DofMismatch {
                what: format!("{} of node {}", what, self.tag),
                expected: self.ndf,
                found: v.len(),
            });
        }
        Ok(())
    }

    pub fn set_trial_disp(&mut self, v: &FEVec) -> FEAResult<()> {
        self.check_len("displacement", v)?;
        self.trial_disp.copy_from(v);
        Ok(())
    }

    pub fn set_trial_vel(&mut self, v: &FEVec) -> FEAResult<()> {
        self.check_len("velocity", v)?;
        self.trial_vel.copy_from(v);
        Ok(())
    }

    pub fn set_trial_accel(&mut self, v: &FEVec) -> FEAResult<()> {
        self.check_len("acceleration", v)?;
        self.trial_accel.copy_from(v);
        Ok(())
    }

    pub fn incr_trial_disp(&mut self, dv: &FEVec) -> FEAResult<()> {
        self.check_len("displacement increment", dv)?;
        self.trial_disp += dv;
        Ok(())
    }

    pub fn incr_trial_vel(&mut self, dv: &FEVec) -> FEAResult<()> {
        self.check_len("velocity increment", dv)?;
        self.trial_vel += dv;
        Ok(())
    }

    pub fn incr_trial_accel(&mut self, dv: &FEVec) -> FEAResult<()> {
        self.check_len("acceleration increment", dv)?;
        self.trial_accel += dv;
        Ok(())
    }

    pub fn unbalanced_load(&self) -> &FEVec {
        &self.unbalanced_load
    }

    /// `load += fact * p`
    pub fn add_unbalanced_load(&mut self, p: &FEVec, fact: f64) -> FEAResult<()> {
        self.check_len("load", p)?;
        self.unbalanced_load.axpy(fact, p, 1.0);
        Ok(())
    }

    pub fn zero_unbalanced_load(&mut self) {
        self.unbalanced_load.fill(0.0);
    }

    pub fn commit_state(&mut self) {
        self.commit_disp.copy_from(&self.trial_disp);
        self.commit_vel.copy_from(&self.trial_vel);
        self.commit_accel.copy_from(&self.trial_accel);
    }

    pub fn revert_to_last_commit(&mut self) {
        self.trial_disp.copy_from(&self.commit_disp);
        self.trial_vel.copy_from(&self.commit_vel);
        self.trial_accel.copy_from(&self.commit_accel);
    }

    pub fn revert_to_start(&mut self) {
        for v in [
            &mut self.trial_disp,
            &mut self.trial_vel,
            &mut self.trial_accel,
            &mut self.commit_disp,
            &mut self.commit_vel,
            &mut self.commit_accel,
            &mut self.unbalanced_load,
        ] {
            v.fill(0.0);
        }
    }

    /// Reset mode shape storage to `num_modes` zero columns
    pub fn set_num_eigenvectors(&mut self, num_modes: usize) {
        self.eigenvectors = Some(Mat::zeros(self.ndf, num_modes));
    }

    /// Store the shape of `mode` (1-based)
    pub fn set_eigenvector(&mut self, mode: usize, shape: &FEVec) -> FEAResult<()> {
        self.check_len("eigenvector", shape)?;
        let vectors = self.eigenvectors.as_mut().ok_or_else(|| {
            FEAError::Configuration(format!("node {} has no eigenvector storage", self.tag))
        })?;
        if mode == 0 || mode > vectors.ncols() {
            return Err(FEAError::ModeOutOfRange {
                mode,
                num_modes: vectors.ncols(),
            });
        }
        vectors.set_column(mode - 1, shape);
        Ok(())
    }

    /// All mode shapes, one column per mode
    pub fn eigenvectors(&self) -> Option<&Mat> {
        self.eigenvectors.as_ref()
    }

    /// Shape of `mode` (1-based)
    pub fn eigenvector(&self, mode: usize) -> Option<FEVec> {
        let vectors = self.eigenvectors.as_ref()?;
        if mode == 0 || mode > vectors.ncols() {
            return None;
        }
        Some(vectors.column(mode - 1).into_owned())
    }

    pub fn dof_group(&self) -> Option<usize> {
        self.dof_group
    }
}
