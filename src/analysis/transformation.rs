//! Constraint transformations
//!
//! A node whose DOF are constrained is represented by a reduced set of
//! transformed DOF `u_t` with `u = T u_t`. `T` has one row per native DOF and
//! one column per transformed DOF. Element matrices and vectors are written in
//! native DOF and mapped block by block, one block per node:
//! `K_t(i, j) = T_i^T K(i, j) T_j` and `R_t(i) = T_i^T R(i)`.

use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec};

/// Per-node transformation
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// No constraint, `T = I` of the given size
    Identity(usize),
    /// Explicit `T`, native DOF x transformed DOF
    Explicit(Mat),
}

impl Transform {
    pub fn native_dof(&self) -> usize {
        match self {
            Transform::Identity(n) => *n,
            Transform::Explicit(t) => t.nrows(),
        }
    }

    pub fn transformed_dof(&self) -> usize {
        match self {
            Transform::Identity(n) => *n,
            Transform::Explicit(t) => t.ncols(),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Transform::Identity(_))
    }

    /// `T` as a dense matrix
    pub fn matrix(&self) -> Mat {
        match self {
            Transform::Identity(n) => Mat::identity(*n, *n),
            Transform::Explicit(t) => t.clone(),
        }
    }

    /// `T x_t`
    pub fn expand(&self, x_t: &FEVec) -> FEVec {
        match self {
            Transform::Identity(_) => x_t.clone(),
            Transform::Explicit(t) => t * x_t,
        }
    }

    /// `T^T r`
    pub fn reduce(&self, r: &FEVec) -> FEVec {
        match self {
            Transform::Identity(_) => r.clone(),
            Transform::Explicit(t) => t.tr_mul(r),
        }
    }

    /// `T^T M T`
    pub fn congruence(&self, m: &Mat) -> Mat {
        match self {
            Transform::Identity(_) => m.clone(),
            Transform::Explicit(t) => t.tr_mul(m) * t,
        }
    }
}

fn check_native(what: &str, found: usize, transforms: &[Transform]) -> FEAResult<()> {
    let expected: usize = transforms.iter().map(Transform::native_dof).sum();
    if expected != found {
        return Err(FEAError::DofMismatch {
            what: what.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Map a native element matrix to the transformed DOF of its nodes
pub fn transform_tangent(k: &Mat, transforms: &[Transform]) -> FEAResult<Mat> {
    check_native("element tangent", k.nrows(), transforms)?;
    check_native("element tangent", k.ncols(), transforms)?;
    if transforms.iter().all(Transform::is_identity) {
        return Ok(k.clone());
    }

    let size: usize = transforms.iter().map(Transform::transformed_dof).sum();
    let mut out = Mat::zeros(size, size);

    let (mut ni, mut ti) = (0, 0);
    for tr_i in transforms {
        let (rows_n, rows_t) = (tr_i.native_dof(), tr_i.transformed_dof());
        let (mut nj, mut tj) = (0, 0);
        for tr_j in transforms {
            let (cols_n, cols_t) = (tr_j.native_dof(), tr_j.transformed_dof());
            let block = k.view((ni, nj), (rows_n, cols_n));
            let mapped = match (tr_i, tr_j) {
                (Transform::Identity(_), Transform::Identity(_)) => block.into_owned(),
                (Transform::Explicit(t), Transform::Identity(_)) => t.tr_mul(&block),
                (Transform::Identity(_), Transform::Explicit(t)) => block * t,
                (Transform::Explicit(a), Transform::Explicit(b)) => a.tr_mul(&block) * b,
            };
            out.view_mut((ti, tj), (rows_t, cols_t)).copy_from(&mapped);
            nj += cols_n;
            tj += cols_t;
        }
        ni += rows_n;
        ti += rows_t;
    }
    Ok(out)
}

/// Map a native element vector to the transformed DOF, `T_i^T R(i)` per node
pub fn transform_residual(r: &FEVec, transforms: &[Transform]) -> FEAResult<FEVec> {
    check_native("element residual", r.len(), transforms)?;
    if transforms.iter().all(Transform::is_identity) {
        return Ok(r.clone());
    }
    let size: usize = transforms.iter().map(Transform::transformed_dof).sum();
    let mut out = FEVec::zeros(size);
    let (mut n, mut t) = (0, 0);
    for tr in transforms {
        let block = r.rows(n, tr.native_dof()).into_owned();
        out.rows_mut(t, tr.transformed_dof()).copy_from(&tr.reduce(&block));
        n += tr.native_dof();
        t += tr.transformed_dof();
    }
    Ok(out)
}

/// Expand transformed DOF values to native ones, `T_i x_t(i)` per node
pub fn expand_vector(x_t: &FEVec, transforms: &[Transform]) -> FEAResult<FEVec> {
    let expected: usize = transforms.iter().map(Transform::transformed_dof).sum();
    if expected != x_t.len() {
        return Err(FEAError::DofMismatch {
            what: "transformed vector".to_string(),
            expected,
            found: x_t.len(),
        });
    }
    let size: usize = transforms.iter().map(Transform::native_dof).sum();
    let mut out = FEVec::zeros(size);
    let (mut n, mut t) = (0, 0);
    for tr in transforms {
        let block = x_t.rows(t, tr.transformed_dof()).into_owned();
        out.rows_mut(n, tr.native_dof()).copy_from(&tr.expand(&block));
        n += tr.native_dof();
        t += tr.transformed_dof();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_k() -> Mat {
        Mat::from_fn(4, 4, |i, j| 1.0 + (i * 4 + j) as f64 + (j * 4 + i) as f64)
    }

    fn block_diag(a: &Mat, b: &Mat) -> Mat {
        let mut t = Mat::zeros(a.nrows() + b.nrows(), a.ncols() + b.ncols());
        t.view_mut((0, 0), a.shape()).copy_from(a);
        t.view_mut((a.nrows(), a.ncols()), b.shape()).copy_from(b);
        t
    }

    #[test]
    fn test_identity_path_is_exact_copy() {
        let k = sample_k();
        let out = transform_tangent(&k, &[Transform::Identity(2), Transform::Identity(2)]).unwrap();
        assert_eq!(out, k);
    }

    #[test]
    fn test_two_sided_congruence() {
        let k = sample_k();
        let t1 = Mat::from_row_slice(2, 1, &[1.0, 0.5]);
        let t2 = Mat::from_row_slice(2, 2, &[0.0, 1.0, 2.0, -1.0]);
        let transforms = [Transform::Explicit(t1.clone()), Transform::Explicit(t2.clone())];
        let out = transform_tangent(&k, &transforms).unwrap();

        let t = block_diag(&t1, &t2);
        let expected = t.transpose() * &k * &t;
        assert_eq!(out.shape(), (3, 3));
        for (a, b) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_one_sided_transform() {
        let k = sample_k();
        let t2 = Mat::from_row_slice(2, 1, &[1.0, 1.0]);
        let transforms = [Transform::Identity(2), Transform::Explicit(t2.clone())];
        let out = transform_tangent(&k, &transforms).unwrap();
        let expected = {
            let t = block_diag(&Mat::identity(2, 2), &t2);
            t.transpose() * &k * &t
        };
        for (a, b) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_residual_and_expand() {
        let t1 = Mat::from_row_slice(2, 1, &[1.0, 2.0]);
        let transforms = [Transform::Explicit(t1), Transform::Identity(1)];
        let r = FEVec::from_vec(vec![1.0, 1.0, 5.0]);
        let rt = transform_residual(&r, &transforms).unwrap();
        assert_eq!(rt.as_slice(), &[3.0, 5.0]);
        let x = expand_vector(&FEVec::from_vec(vec![2.0, 7.0]), &transforms).unwrap();
        assert_eq!(x.as_slice(), &[2.0, 4.0, 7.0]);
    }

    #[test]
    fn test_dof_mismatch() {
        let err = transform_tangent(&sample_k(), &[Transform::Identity(3)]).unwrap_err();
        assert!(matches!(err, FEAError::DofMismatch { expected: 3, found: 4, .. }));
        assert!(err.is_configuration());
    }
}
