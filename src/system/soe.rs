use log::{debug, info};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use super::profile::ProfileFactor;
use super::{Graph, MassOperator, Ordering};
use crate::analysis::Equation;
use crate::error::{FEAError, FEAResult};
use crate::math::sparse::{natural_ordering, reverse_cuthill_mckee, sparse_matvec};
use crate::math::{is_symmetric, Mat, Vec as FEVec};

/// Lifecycle of the system of equations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoeState {
    Unbuilt,
    /// Structure known, symbolic factorization done
    SizeSet,
    Assembled,
    Factored,
    Solved,
}

/// Shifted stiffness `A = K - shift M` in blocked profile storage plus the
/// assembled mass, for the generalized problem `K x = lambda M x`
#[derive(Debug, Clone)]
pub struct SymArpackSoe {
    ordering: Ordering,
    block_size: usize,
    state: SoeState,
    size: usize,
    shift: f64,
    factor: Option<ProfileFactor>,
    mass: CooMatrix<f64>,
    mass_csr: Option<CsrMatrix<f64>>,
    eigenvalues: Vec<f64>,
    eigenvectors: Vec<FEVec>,
}

impl Default for SymArpackSoe {
    fn default() -> Self {
        Self::new(Ordering::default(), 32)
    }
}

impl SymArpackSoe {
    pub fn new(ordering: Ordering, block_size: usize) -> Self {
        Self {
            ordering,
            block_size,
            state: SoeState::Unbuilt,
            size: 0,
            shift: 0.0,
            factor: None,
            mass: CooMatrix::new(0, 0),
            mass_csr: None,
            eigenvalues: Vec::new(),
            eigenvectors: Vec::new(),
        }
    }

    pub fn state(&self) -> SoeState {
        self.state
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Build the structure from the equation graph and run the symbolic
    /// factorization
    pub fn set_size(&mut self, graph: &Graph) -> FEAResult<()> {
        let n = graph.num_vertex();
        if n == 0 {
            return Err(FEAError::NoFreeDofs);
        }
        let pattern = graph.to_pattern()?;
        let perm = match self.ordering {
            Ordering::Natural => natural_ordering(n),
            Ordering::ReverseCuthillMcKee => reverse_cuthill_mckee(&pattern),
        };
        let factor = ProfileFactor::symbolic(&pattern, perm, self.block_size)?;
        info!(
            "system of {} equations, {} off-diagonal couplings, {} stored factor entries in {} blocks",
            n,
            pattern.nnz() / 2,
            factor.stored_entries(),
            factor.num_blocks()
        );
        self.size = n;
        self.factor = Some(factor);
        self.mass = CooMatrix::new(n, n);
        self.mass_csr = None;
        self.eigenvalues.clear();
        self.eigenvectors.clear();
        self.state = SoeState::SizeSet;
        Ok(())
    }

    /// Shift folded into the stiffness by [`SymArpackSoe::add_m`]. Set it
    /// before assembling the mass.
    pub fn set_shift(&mut self, shift: f64) {
        self.shift = shift;
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    fn factor_mut(&mut self) -> FEAResult<&mut ProfileFactor> {
        self.factor
            .as_mut()
            .ok_or_else(|| FEAError::Configuration("system of equations has no size yet".to_string()))
    }

    fn factor_ref(&self) -> FEAResult<&ProfileFactor> {
        self.factor
            .as_ref()
            .ok_or_else(|| FEAError::Configuration("system of equations has no size yet".to_string()))
    }

    fn check_local(&self, m: &Mat, id: &[Equation]) -> FEAResult<()> {
        if m.nrows() != id.len() || m.ncols() != id.len() {
            return Err(FEAError::DofMismatch {
                what: "local matrix".to_string(),
                expected: id.len(),
                found: m.nrows().max(m.ncols()),
            });
        }
        if let Some(n) = id.iter().filter_map(Equation::number).find(|&n| n >= self.size) {
            return Err(FEAError::InvalidInput(format!(
                "equation {} outside a system of size {}",
                n, self.size
            )));
        }
        Ok(())
    }

    /// `A += fact * m` at the equations `id`. Only the lower triangle in
    /// elimination order is stored, so `m` must be symmetric.
    pub fn add_a(&mut self, m: &Mat, id: &[Equation], fact: f64) -> FEAResult<()> {
        self.check_local(m, id)?;
        debug_assert!(is_symmetric(m, 1e-8), "add_a requires a symmetric local matrix");
        let factor = self.factor_mut()?;
        if fact != 0.0 {
            // (position, local index, equation), ascending positions
            let mut local: Vec<(usize, usize, usize)> = Vec::with_capacity(id.len());
            for (a, eq) in id.iter().enumerate() {
                if let Some(n) = eq.number() {
                    let entry = (factor.position(n), a, n);
                    let at = local.partition_point(|e| e.0 <= entry.0);
                    local.insert(at, entry);
                }
            }
            for &(pi, a, ia) in &local {
                for &(pj, b, ib) in &local {
                    if pj > pi {
                        break;
                    }
                    let v = m[(a, b)];
                    if v != 0.0 {
                        factor.add(ia, ib, fact * v)?;
                    }
                }
            }
        }
        self.state = SoeState::Assembled;
        Ok(())
    }

    /// Record `fact * m` in the mass and fold `-shift * fact * m` into `A`
    pub fn add_m(&mut self, m: &Mat, id: &[Equation], fact: f64) -> FEAResult<()> {
        self.check_local(m, id)?;
        if self.factor.is_none() {
            return Err(FEAError::Configuration(
                "system of equations has no size yet".to_string(),
            ));
        }
        if fact == 0.0 {
            return Ok(());
        }
        for (a, ea) in id.iter().enumerate() {
            let Some(ia) = ea.number() else { continue };
            for (b, eb) in id.iter().enumerate() {
                let Some(ib) = eb.number() else { continue };
                let v = m[(a, b)];
                if v != 0.0 {
                    self.mass.push(ia, ib, fact * v);
                }
            }
        }
        self.mass_csr = None;
        if self.shift != 0.0 {
            self.add_a(m, id, -self.shift * fact)?;
        }
        self.state = SoeState::Assembled;
        Ok(())
    }

    /// Clear `A`, dropping any factor
    pub fn zero_a(&mut self) -> FEAResult<()> {
        self.factor_mut()?.zero();
        self.state = SoeState::Assembled;
        Ok(())
    }

    /// Clear the recorded mass. The shifted part already folded into `A` is
    /// only removed by [`SymArpackSoe::zero_a`].
    pub fn zero_m(&mut self) -> FEAResult<()> {
        self.factor_ref()?;
        self.mass = CooMatrix::new(self.size, self.size);
        self.mass_csr = None;
        Ok(())
    }

    /// Numeric factorization of `A`
    pub fn factor(&mut self) -> FEAResult<()> {
        if !self.is_factored() {
            self.factor_mut()?.factor()?;
            debug!("shifted stiffness factored with shift {}", self.shift);
        }
        if self.mass_csr.is_none() {
            self.mass_csr = Some(CsrMatrix::from(&self.mass));
        }
        if self.state != SoeState::Solved {
            self.state = SoeState::Factored;
        }
        Ok(())
    }

    pub fn is_factored(&self) -> bool {
        self.factor.as_ref().is_some_and(ProfileFactor::is_factored)
    }

    /// Overwrite `b` with `A^-1 b`
    pub fn solve_in_place(&self, b: &mut FEVec) -> FEAResult<()> {
        self.factor_ref()?.solve(b)
    }

    /// Assembled entry of `A`
    pub fn a_entry(&self, row: usize, col: usize) -> FEAResult<f64> {
        let factor = self.factor_ref()?;
        if row >= self.size || col >= self.size {
            return Err(FEAError::InvalidInput(format!(
                "entry ({}, {}) outside a system of size {}",
                row, col, self.size
            )));
        }
        Ok(factor.entry(row, col))
    }

    /// Assembled mass, available once factored
    pub fn mass_matrix(&self) -> Option<&CsrMatrix<f64>> {
        self.mass_csr.as_ref()
    }

    pub(crate) fn set_eigen(&mut self, pairs: Vec<(f64, FEVec)>) {
        let (values, vectors): (Vec<f64>, Vec<FEVec>) = pairs.into_iter().unzip();
        self.eigenvalues = values;
        self.eigenvectors = vectors;
        self.state = SoeState::Solved;
    }

    pub fn num_modes(&self) -> usize {
        self.eigenvalues.len()
    }

    fn check_mode(&self, mode: usize) -> FEAResult<usize> {
        if mode == 0 || mode > self.eigenvalues.len() {
            return Err(FEAError::ModeOutOfRange {
                mode,
                num_modes: self.eigenvalues.len(),
            });
        }
        Ok(mode - 1)
    }

    /// Eigenvalue of `mode`, 1-based
    pub fn eigenvalue(&self, mode: usize) -> FEAResult<f64> {
        Ok(self.eigenvalues[self.check_mode(mode)?])
    }

    /// Mass-normalized eigenvector of `mode`, 1-based, in equation numbering
    pub fn eigenvector(&self, mode: usize) -> FEAResult<&FEVec> {
        Ok(&self.eigenvectors[self.check_mode(mode)?])
    }

    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    pub fn eigenvectors(&self) -> &[FEVec] {
        &self.eigenvectors
    }
}

impl MassOperator for SymArpackSoe {
    fn mass_product(&self, x: &FEVec, y: &mut FEVec) -> FEAResult<()> {
        let mass = self.mass_csr.as_ref().ok_or_else(|| {
            FEAError::Configuration("mass product requested before factorization".to_string())
        })?;
        if x.len() != self.size || y.len() != self.size {
            return Err(FEAError::DofMismatch {
                what: "mass product".to_string(),
                expected: self.size,
                found: x.len(),
            });
        }
        y.copy_from(&sparse_matvec(mass, x));
        Ok(())
    }
}
