//! Shift-invert Lanczos iteration with reverse communication
//!
//! Computes the eigenvalues of largest magnitude of `OP = (K - sigma M)^-1 M`,
//! self-adjoint in the `M` inner product. The driver never touches a matrix:
//! [`SymmetricLanczos::iterate`] returns an [`Ido`] request, the caller fills
//! the output buffer and calls `iterate` again until [`Ido::Done`].
//!
//! The basis is fully `M`-reorthogonalized (two passes) and the iteration is
//! restarted by keeping the wanted Ritz vectors plus the residual direction,
//! so the projected matrix is kept dense.

use log::{debug, warn};
use nalgebra::SymmetricEigen;
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec, EPS};

/// Iteration controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanczosOptions {
    /// Basis size, `None` selects `min(max(2 nev, nev + 8), n)`
    pub ncv: Option<usize>,
    /// Relative Ritz residual tolerance, `0.0` means machine precision
    pub tolerance: f64,
    /// Maximum number of restart cycles
    pub max_iterations: usize,
}

impl Default for LanczosOptions {
    fn default() -> Self {
        Self {
            ncv: None,
            tolerance: 0.0,
            max_iterations: 1000,
        }
    }
}

/// Request returned to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ido {
    /// `y = OP x`, nothing else is known about `x`
    ApplyOpInitial,
    /// `y = OP x`, with `M x` already available in the second buffer
    ApplyOp,
    /// `y = M x`
    ApplyMass,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    /// Waiting for `OP x` of a start candidate
    CandidateOp,
    /// Waiting for `M r` of a start candidate
    CandidateMass,
    /// Waiting for `OP v_j`
    StepOp,
    /// Waiting for `M w`
    StepMass,
    Finished,
}

#[derive(Debug, Clone)]
pub struct SymmetricLanczos {
    n: usize,
    nev: usize,
    ncv: usize,
    tol: f64,
    max_iterations: usize,
    phase: Phase,
    /// `M`-orthonormal basis and its mass products
    v: Vec<FEVec>,
    bv: Vec<FEVec>,
    /// Projected matrix `V^T M OP V`
    h: Mat,
    /// Current residual direction and its mass product
    w: FEVec,
    bw: FEVec,
    /// Communication buffers
    x: FEVec,
    bx: FEVec,
    y: FEVec,
    /// Next unit vector tried after a breakdown
    candidate: usize,
    /// The start vector has not been tried yet
    random_start: bool,
    iterations: usize,
    num_op: usize,
    ritz: Vec<(f64, FEVec)>,
}

/// Deterministic start vector in `[-1, 1]`
fn start_vector(n: usize) -> FEVec {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    FEVec::from_fn(n, |_, _| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 52) as f64 - 1.0
    })
}

impl SymmetricLanczos {
    pub fn new(n: usize, nev: usize, ncv: usize, options: &LanczosOptions) -> FEAResult<Self> {
        if nev == 0 || nev > n {
            return Err(FEAError::Configuration(format!(
                "number of eigenvalues {} must be in 1..={}",
                nev, n
            )));
        }
        if ncv < nev || ncv > n || (ncv == nev && ncv < n) {
            return Err(FEAError::Configuration(format!(
                "basis size {} must exceed the number of eigenvalues {} and not exceed {}",
                ncv, nev, n
            )));
        }
        if options.tolerance < 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "negative tolerance {}",
                options.tolerance
            )));
        }
        let tol = if options.tolerance == 0.0 {
            EPS
        } else {
            options.tolerance
        };
        Ok(Self {
            n,
            nev,
            ncv,
            tol,
            max_iterations: options.max_iterations.max(1),
            phase: Phase::Init,
            v: Vec::with_capacity(ncv),
            bv: Vec::with_capacity(ncv),
            h: Mat::zeros(ncv, ncv),
            w: FEVec::zeros(n),
            bw: FEVec::zeros(n),
            x: FEVec::zeros(n),
            bx: FEVec::zeros(n),
            y: FEVec::zeros(n),
            candidate: 0,
            random_start: true,
            iterations: 0,
            num_op: 0,
            ritz: Vec::new(),
        })
    }

    pub fn ncv(&self) -> usize {
        self.ncv
    }

    /// Restart cycles performed
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Applications of `OP` requested
    pub fn num_op(&self) -> usize {
        self.num_op
    }

    pub fn num_converged(&self) -> usize {
        self.ritz.len()
    }

    /// `(x, M x, y)`: the input of the current request, its mass product
    /// when the request is [`Ido::ApplyOp`], and the buffer for the result
    pub fn buffers(&mut self) -> (&FEVec, &FEVec, &mut FEVec) {
        (&self.x, &self.bx, &mut self.y)
    }

    /// Advance the iteration with the result of the previous request
    pub fn iterate(&mut self) -> FEAResult<Ido> {
        match self.phase {
            Phase::Init => self.next_candidate(),
            Phase::CandidateOp => {
                self.w.copy_from(&self.y);
                self.x.copy_from(&self.y);
                self.phase = Phase::CandidateMass;
                Ok(Ido::ApplyMass)
            }
            Phase::CandidateMass => {
                self.bw.copy_from(&self.y);
                let norm0 = b_norm(&self.w, &self.bw);
                self.orthogonalize();
                let norm = b_norm(&self.w, &self.bw);
                if norm0 == 0.0 || norm <= EPS.sqrt() * norm0 {
                    return self.next_candidate();
                }
                self.push_basis(norm);
                self.request_step()
            }
            Phase::StepOp => {
                self.w.copy_from(&self.y);
                self.x.copy_from(&self.y);
                self.phase = Phase::StepMass;
                Ok(Ido::ApplyMass)
            }
            Phase::StepMass => {
                self.bw.copy_from(&self.y);
                self.step()
            }
            Phase::Finished => Ok(Ido::Done),
        }
    }

    fn request_step(&mut self) -> FEAResult<Ido> {
        let j = self.v.len() - 1;
        self.x.copy_from(&self.v[j]);
        self.bx.copy_from(&self.bv[j]);
        self.phase = Phase::StepOp;
        self.num_op += 1;
        Ok(Ido::ApplyOp)
    }

    /// Request `OP` of the next start candidate, or close the cycle when
    /// every candidate is exhausted
    fn next_candidate(&mut self) -> FEAResult<Ido> {
        if self.random_start {
            self.random_start = false;
            self.x = start_vector(self.n);
        } else if self.candidate < self.n {
            self.x.fill(0.0);
            self.x[self.candidate] = 1.0;
            self.candidate += 1;
        } else {
            if self.v.is_empty() {
                return Err(FEAError::NumericalFailure(
                    "mass operator has no positive part, no Lanczos vector can be built".to_string(),
                ));
            }
            debug!("Lanczos basis exhausted at {} vectors", self.v.len());
            return self.finish_cycle(0.0);
        }
        self.phase = Phase::CandidateOp;
        self.num_op += 1;
        Ok(Ido::ApplyOpInitial)
    }

    /// Two passes of `M`-orthogonalization of `w` against the basis.
    /// Returns the total coefficient removed along the last basis vector.
    fn orthogonalize(&mut self) -> f64 {
        let last = self.v.len().saturating_sub(1);
        let mut coefficient = 0.0;
        for _ in 0..2 {
            for (i, (vi, bvi)) in self.v.iter().zip(&self.bv).enumerate() {
                let c = self.w.dot(bvi);
                self.w.axpy(-c, vi, 1.0);
                self.bw.axpy(-c, bvi, 1.0);
                if i == last {
                    coefficient += c;
                }
            }
        }
        coefficient
    }

    /// Append `w / norm` to the basis, uncoupled from the existing vectors
    fn push_basis(&mut self, norm: f64) {
        self.v.push(&self.w / norm);
        self.bv.push(&self.bw / norm);
    }

    fn step(&mut self) -> FEAResult<Ido> {
        let j = self.v.len() - 1;
        let norm0 = b_norm(&self.w, &self.bw);

        let alpha = self.orthogonalize();
        self.h[(j, j)] = alpha;

        let beta = b_norm(&self.w, &self.bw);
        let breakdown = norm0 == 0.0 || beta <= EPS.sqrt() * norm0;
        let m = self.v.len();

        if breakdown {
            if m == self.ncv {
                return self.finish_cycle(0.0);
            }
            debug!("Lanczos breakdown at step {}, trying a new start direction", m);
            return self.next_candidate();
        }
        if m == self.ncv {
            return self.finish_cycle(beta);
        }
        self.h[(m, j)] = beta;
        self.h[(j, m)] = beta;
        self.push_basis(beta);
        self.request_step()
    }

    /// Rayleigh-Ritz on the current basis, then stop or restart.
    /// `beta` couples the basis to the residual direction held in `w`.
    fn finish_cycle(&mut self, beta: f64) -> FEAResult<Ido> {
        self.iterations += 1;
        let m = self.v.len();
        let eig = SymmetricEigen::new(self.h.view((0, 0), (m, m)).clone_owned());

        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[b].abs().total_cmp(&eig.eigenvalues[a].abs()));
        let wanted = &order[..self.nev.min(m)];

        let eps23 = EPS.powf(2.0 / 3.0);
        let converged: Vec<usize> = wanted
            .iter()
            .copied()
            .filter(|&k| {
                let theta = eig.eigenvalues[k];
                let estimate = (beta * eig.eigenvectors[(m - 1, k)]).abs();
                theta != 0.0 && estimate <= self.tol * eps23.max(theta.abs())
            })
            .collect();

        debug!(
            "Lanczos cycle {}: {} of {} wanted Ritz values converged",
            self.iterations,
            converged.len(),
            self.nev
        );

        let exhausted = beta == 0.0;
        if converged.len() == self.nev || exhausted || self.iterations >= self.max_iterations {
            if converged.len() < self.nev {
                if exhausted {
                    warn!(
                        "Lanczos: invariant subspace of dimension {} holds only {} of {} requested eigenvalues",
                        m,
                        converged.len(),
                        self.nev
                    );
                } else {
                    warn!(
                        "Lanczos: maximum number of iterations {} reached, {} of {} eigenvalues converged",
                        self.max_iterations,
                        converged.len(),
                        self.nev
                    );
                    warn!("Lanczos: increase ncv (currently {}) to improve convergence", self.ncv);
                }
            }
            let ritz = converged
                .iter()
                .map(|&k| (eig.eigenvalues[k], self.ritz_vector(&eig.eigenvectors, k)))
                .collect();
            self.ritz = ritz;
            self.phase = Phase::Finished;
            return Ok(Ido::Done);
        }

        // Thick restart: keep the leading Ritz vectors, then the residual
        let keep = (self.nev + (self.ncv - self.nev) / 2).clamp(self.nev, self.ncv - 1);
        let kept = &order[..keep];
        let v: Vec<FEVec> = kept.iter().map(|&k| self.ritz_vector(&eig.eigenvectors, k)).collect();
        let bv: Vec<FEVec> = kept
            .iter()
            .map(|&k| combine(&self.bv, &eig.eigenvectors, k))
            .collect();

        self.h.fill(0.0);
        for (i, &k) in kept.iter().enumerate() {
            self.h[(i, i)] = eig.eigenvalues[k];
            let coupling = beta * eig.eigenvectors[(m - 1, k)];
            self.h[(keep, i)] = coupling;
            self.h[(i, keep)] = coupling;
        }
        self.v = v;
        self.bv = bv;
        self.push_basis(beta);
        self.request_step()
    }

    fn ritz_vector(&self, s: &Mat, k: usize) -> FEVec {
        combine(&self.v, s, k)
    }

    /// Converged eigenpairs of `K x = lambda M x`, `lambda = sigma + 1/theta`,
    /// ascending, with `M`-normalized vectors
    pub fn eigenpairs(&self, sigma: f64) -> FEAResult<Vec<(f64, FEVec)>> {
        if self.phase != Phase::Finished {
            return Err(FEAError::Configuration(
                "eigenpairs requested before the Lanczos iteration finished".to_string(),
            ));
        }
        let mut pairs: Vec<(f64, FEVec)> = self
            .ritz
            .iter()
            .map(|(theta, x)| (sigma + 1.0 / theta, x.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(pairs)
    }
}

/// `M`-norm from a vector and its mass product
fn b_norm(x: &FEVec, bx: &FEVec) -> f64 {
    x.dot(bx).max(0.0).sqrt()
}

/// `sum_i basis[i] * s[(i, k)]`
fn combine(basis: &[FEVec], s: &Mat, k: usize) -> FEVec {
    let mut out = FEVec::zeros(basis.first().map_or(0, |b| b.len()));
    for (i, b) in basis.iter().enumerate() {
        out.axpy(s[(i, k)], b, 1.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Drive the iteration with dense operators
    fn run(k: &Mat, m: &Mat, sigma: f64, nev: usize, options: LanczosOptions) -> Vec<(f64, FEVec)> {
        let n = k.nrows();
        let a = (k - m * sigma).lu();
        let ncv = options.ncv.unwrap_or_else(|| (2 * nev).max(nev + 8).min(n));
        let mut lanczos = SymmetricLanczos::new(n, nev, ncv, &options).unwrap();
        loop {
            match lanczos.iterate().unwrap() {
                Ido::ApplyOpInitial => {
                    let (x, _, y) = lanczos.buffers();
                    y.copy_from(&a.solve(&(m * x)).unwrap());
                }
                Ido::ApplyOp => {
                    let (_, bx, y) = lanczos.buffers();
                    y.copy_from(&a.solve(bx).unwrap());
                }
                Ido::ApplyMass => {
                    let (x, _, y) = lanczos.buffers();
                    y.copy_from(&(m * x));
                }
                Ido::Done => break,
            }
        }
        lanczos.eigenpairs(sigma).unwrap()
    }

    fn chain(n: usize) -> (Mat, Mat) {
        let mut k = Mat::zeros(n, n);
        for i in 0..n {
            k[(i, i)] = if i + 1 < n { 2.0 } else { 1.0 };
            if i + 1 < n {
                k[(i, i + 1)] = -1.0;
                k[(i + 1, i)] = -1.0;
            }
        }
        (k, Mat::identity(n, n))
    }

    #[test]
    fn test_two_dof_exact() {
        let (k, m) = chain(2);
        let pairs = run(&(k * 1000.0), &m, 0.0, 2, LanczosOptions::default());
        assert_eq!(pairs.len(), 2);
        assert_relative_eq!(pairs[0].0, 381.966_011_250_105_1, max_relative = 1e-9);
        assert_relative_eq!(pairs[1].0, 2618.033_988_749_895, max_relative = 1e-9);
    }

    #[test]
    fn test_restarted_matches_dense() {
        let n = 40;
        let (k, m) = chain(n);
        let options = LanczosOptions {
            ncv: Some(10),
            tolerance: 1e-10,
            ..Default::default()
        };
        let pairs = run(&k, &m, 0.0, 3, options);
        let mut exact: Vec<f64> = SymmetricEigen::new(k.clone()).eigenvalues.iter().copied().collect();
        exact.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(pairs.len(), 3);
        for (pair, lambda) in pairs.iter().zip(&exact) {
            assert_relative_eq!(pair.0, *lambda, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_vectors_are_mass_normalized() {
        let (k, _) = chain(6);
        let m = Mat::from_diagonal(&FEVec::from_vec(vec![1.0, 2.0, 1.0, 3.0, 1.0, 2.0]));
        let pairs = run(&k, &m, 0.0, 2, LanczosOptions::default());
        for (lambda, x) in &pairs {
            assert_relative_eq!(x.dot(&(&m * x)), 1.0, epsilon = 1e-10);
            let r = &k * x - (&m * x) * *lambda;
            assert!(r.norm() < 1e-8);
        }
        assert_relative_eq!(pairs[0].1.dot(&(&m * &pairs[1].1)), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_shift_selects_nearby_eigenvalue() {
        let (k, m) = chain(8);
        let mut exact: Vec<f64> = SymmetricEigen::new(k.clone()).eigenvalues.iter().copied().collect();
        exact.sort_by(|a, b| a.total_cmp(b));
        let sigma = 0.5 * (exact[4] + exact[5]) - 0.01;
        let pairs = run(&k, &m, sigma, 1, LanczosOptions::default());
        assert_relative_eq!(pairs[0].0, exact[4], max_relative = 1e-9);
    }

    #[test]
    fn test_singular_mass() {
        // Second DOF is massless, only one finite eigenvalue exists
        let k = Mat::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]);
        let m = Mat::from_diagonal(&FEVec::from_vec(vec![1.0, 0.0]));
        let pairs = run(&k, &m, 0.0, 1, LanczosOptions::default());
        assert_eq!(pairs.len(), 1);
        assert_relative_eq!(pairs[0].0, 1.5, max_relative = 1e-10);
    }

    #[test]
    fn test_invalid_sizes() {
        let options = LanczosOptions::default();
        assert!(SymmetricLanczos::new(4, 0, 2, &options).is_err());
        assert!(SymmetricLanczos::new(4, 5, 4, &options).is_err());
        assert!(SymmetricLanczos::new(4, 2, 2, &options).is_err());
        assert!(SymmetricLanczos::new(4, 4, 4, &options).is_ok());
        assert!(SymmetricLanczos::new(10, 2, 11, &options).is_err());
    }

    #[test]
    fn test_eigenpairs_before_done() {
        let lanczos = SymmetricLanczos::new(4, 1, 3, &LanczosOptions::default()).unwrap();
        assert!(lanczos.eigenpairs(0.0).unwrap_err().is_configuration());
    }
}
