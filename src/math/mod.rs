//! Mathematical utilities shared by the assembly and solve layers

pub mod sparse;

use nalgebra::{DMatrix, DVector, Matrix3};

pub type Mat = DMatrix<f64>;
pub type Vec = DVector<f64>;
pub type Mat3 = Matrix3<f64>;

/// Machine epsilon for f64
pub const EPS: f64 = f64::EPSILON;

/// Check that a square matrix is symmetric to a relative tolerance
pub fn is_symmetric(m: &Mat, rel_tol: f64) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }
    if m.is_empty() {
        return true;
    }
    let scale = m.amax().max(1.0);
    for i in 0..m.nrows() {
        for j in 0..i {
            if (m[(i, j)] - m[(j, i)]).abs() > rel_tol * scale {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetry_check() {
        let sym = Mat::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]);
        let unsym = Mat::from_row_slice(2, 2, &[2.0, -1.0, 0.5, 2.0]);
        assert!(is_symmetric(&sym, 1e-12));
        assert!(!is_symmetric(&unsym, 1e-12));
        assert!(!is_symmetric(&Mat::zeros(2, 3), 1e-12));
    }
}
