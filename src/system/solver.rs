use log::{info, warn};

use super::lanczos::{Ido, LanczosOptions, SymmetricLanczos};
use super::soe::SymArpackSoe;
use super::MassOperator;
use crate::error::{FEAError, FEAResult};

/// Basis size used when none is configured
pub fn default_ncv(nev: usize, n: usize) -> usize {
    (2 * nev).max(nev + 8).min(n)
}

/// Shift-invert eigen solver over a [`SymArpackSoe`]
#[derive(Debug, Clone, Default)]
pub struct SymArpackSolver {
    options: LanczosOptions,
}

impl SymArpackSolver {
    pub fn new(options: LanczosOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LanczosOptions {
        &self.options
    }

    /// Solve for `nev` eigenpairs with the mass assembled in the system
    pub fn solve(&self, soe: &mut SymArpackSoe, nev: usize) -> FEAResult<()> {
        soe.factor()?;
        let pairs = {
            let soe: &SymArpackSoe = soe;
            self.run(soe, soe, nev)?
        };
        soe.set_eigen(pairs);
        Ok(())
    }

    /// Solve for `nev` eigenpairs with an external mass operator
    pub fn solve_with(&self, soe: &mut SymArpackSoe, mass: &dyn MassOperator, nev: usize) -> FEAResult<()> {
        soe.factor()?;
        let pairs = self.run(soe, mass, nev)?;
        soe.set_eigen(pairs);
        Ok(())
    }

    fn run(
        &self,
        soe: &SymArpackSoe,
        mass: &dyn MassOperator,
        nev: usize,
    ) -> FEAResult<Vec<(f64, crate::math::Vec)>> {
        let n = soe.size();
        if nev == 0 || nev > n {
            return Err(FEAError::Configuration(format!(
                "requested {} eigenvalues from a system of {} equations",
                nev, n
            )));
        }
        let ncv = self.options.ncv.unwrap_or_else(|| default_ncv(nev, n));
        let mut lanczos = SymmetricLanczos::new(n, nev, ncv, &self.options)?;

        loop {
            match lanczos.iterate()? {
                Ido::ApplyOpInitial => {
                    let (x, _, y) = lanczos.buffers();
                    mass.mass_product(x, y)?;
                    soe.solve_in_place(y)?;
                }
                Ido::ApplyOp => {
                    let (_, bx, y) = lanczos.buffers();
                    y.copy_from(bx);
                    soe.solve_in_place(y)?;
                }
                Ido::ApplyMass => {
                    let (x, _, y) = lanczos.buffers();
                    mass.mass_product(x, y)?;
                }
                Ido::Done => break,
            }
        }

        info!(
            "Lanczos: {} eigenvalues after {} cycles and {} operator applications (ncv = {})",
            lanczos.num_converged(),
            lanczos.iterations(),
            lanczos.num_op(),
            ncv
        );
        let pairs = lanczos.eigenpairs(soe.shift())?;
        if pairs.len() < nev {
            warn!("only {} of {} requested eigenvalues converged", pairs.len(), nev);
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Equation;
    use crate::math::Mat;
    use crate::system::{Graph, Ordering, SoeState};
    use approx::assert_relative_eq;

    /// Fixed-free chain of `n` unit masses joined by springs of stiffness `k`
    fn chain(n: usize, k: f64, shift: f64) -> SymArpackSoe {
        let mut graph = Graph::new(n);
        for i in 1..n {
            graph.add_edge(i - 1, i);
        }
        let mut soe = SymArpackSoe::new(Ordering::ReverseCuthillMcKee, 4);
        soe.set_size(&graph).unwrap();
        soe.set_shift(shift);
        let spring = Mat::from_row_slice(2, 2, &[k, -k, -k, k]);
        let unit = Mat::identity(1, 1);
        soe.add_a(&spring, &[Equation::Constrained, Equation::Number(0)], 1.0).unwrap();
        for i in 1..n {
            soe.add_a(&spring, &[Equation::Number(i - 1), Equation::Number(i)], 1.0)
                .unwrap();
        }
        for i in 0..n {
            soe.add_m(&unit, &[Equation::Number(i)], 1.0).unwrap();
        }
        soe
    }

    #[test]
    fn test_default_ncv() {
        assert_eq!(default_ncv(2, 100), 10);
        assert_eq!(default_ncv(20, 100), 40);
        assert_eq!(default_ncv(3, 5), 5);
    }

    #[test]
    fn test_two_dof_chain() {
        let mut soe = chain(2, 1000.0, 0.0);
        SymArpackSolver::default().solve(&mut soe, 2).unwrap();
        assert_eq!(soe.state(), SoeState::Solved);
        assert_eq!(soe.num_modes(), 2);
        assert_relative_eq!(soe.eigenvalue(1).unwrap(), 381.966, max_relative = 1e-3);
        assert_relative_eq!(soe.eigenvalue(2).unwrap(), 2618.034, max_relative = 1e-3);
        assert!(soe.eigenvalue(3).unwrap_err().is_configuration());
    }

    #[test]
    fn test_shift_is_reversed() {
        let mut soe = chain(2, 1000.0, 300.0);
        SymArpackSolver::default().solve(&mut soe, 1).unwrap();
        assert_relative_eq!(soe.eigenvalue(1).unwrap(), 381.966_011_25, max_relative = 1e-8);
    }

    #[test]
    fn test_longer_chain_with_restarts() {
        let n = 30;
        let mut soe = chain(n, 1.0, 0.0);
        let solver = SymArpackSolver::new(LanczosOptions {
            ncv: Some(8),
            tolerance: 1e-10,
            ..Default::default()
        });
        solver.solve(&mut soe, 2).unwrap();
        for mode in 1..=2 {
            let j = (2 * mode - 1) as f64;
            let angle = j * std::f64::consts::PI / (2 * n + 1) as f64;
            let exact = 2.0 - 2.0 * angle.cos();
            assert_relative_eq!(soe.eigenvalue(mode).unwrap(), exact, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_too_many_modes() {
        let mut soe = chain(2, 1.0, 0.0);
        let err = SymArpackSolver::default().solve(&mut soe, 3).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_indefinite_shift_fails_numerically() {
        // Shift above the first eigenvalue makes the factor indefinite
        let mut soe = chain(2, 1000.0, 1000.0);
        let err = SymArpackSolver::default().solve(&mut soe, 1).unwrap_err();
        assert!(matches!(err, FEAError::SingularFactor { .. }));
    }
}
