//! Blocked profile Cholesky factorization
//!
//! Equations are reordered (`perm[new] = old`) and split into contiguous
//! blocks. Inside its block each row of the factor is stored as a dense
//! envelope ending at the diagonal. Nonzeros of a row that fall left of its
//! block are stored as segments: runs of consecutive columns held in one
//! shared value array, indexed per row (`first`) and per block (`begblk`).
//! The symbolic phase computes the exact nonzero structure of the factor from
//! the elimination tree, so the numeric phase never fills outside the storage.

use std::ops::Range;

use log::debug;
use nalgebra_sparse::pattern::SparsityPattern;

use crate::error::{FEAError, FEAResult};
use crate::math::sparse::{apply_permutation, inverse_permutation};
use crate::math::Vec as FEVec;

/// Run of consecutive off-block columns of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    col_start: usize,
    len: usize,
    /// Position of the first value in the segment value array
    offset: usize,
}

impl Segment {
    fn columns(&self) -> Range<usize> {
        self.col_start..self.col_start + self.len
    }
}

/// Numeric values laid out on the symbolic structure
#[derive(Debug, Clone, PartialEq)]
struct ProfileValues {
    diag: Vec<f64>,
    penv: Vec<f64>,
    seg: Vec<f64>,
}

impl ProfileValues {
    fn zeros(n: usize, env: usize, seg: usize) -> Self {
        Self {
            diag: vec![0.0; n],
            penv: vec![0.0; env],
            seg: vec![0.0; seg],
        }
    }

    fn fill_zero(&mut self) {
        self.diag.fill(0.0);
        self.penv.fill(0.0);
        self.seg.fill(0.0);
    }
}

#[derive(Debug, Clone)]
pub struct ProfileFactor {
    n: usize,
    perm: Vec<usize>,
    invp: Vec<usize>,
    /// Block boundaries, block `b` holds rows `xblk[b]..xblk[b + 1]`
    xblk: Vec<usize>,
    rowblks: Vec<usize>,
    /// First column of each row's dense envelope
    env_start: Vec<usize>,
    /// Row `i` envelope values live at `env_ptr[i]..env_ptr[i + 1]`
    env_ptr: Vec<usize>,
    segments: Vec<Segment>,
    /// Segments of row `i`, ascending columns
    first: Vec<Range<usize>>,
    /// Segments of the rows of block `b`
    begblk: Vec<Range<usize>>,
    assembled: ProfileValues,
    factor: Option<ProfileValues>,
}

impl ProfileFactor {
    /// Symbolic factorization of a symmetric structure.
    ///
    /// `pattern` holds the off-diagonal adjacency of each equation, `perm`
    /// the elimination order with `perm[new] = old`.
    pub fn symbolic(pattern: &SparsityPattern, perm: Vec<usize>, block_size: usize) -> FEAResult<Self> {
        let n = pattern.major_dim();
        if perm.len() != n {
            return Err(FEAError::DofMismatch {
                what: "equation ordering".to_string(),
                expected: n,
                found: perm.len(),
            });
        }
        let mut seen = vec![false; n];
        for &p in &perm {
            if p >= n || std::mem::replace(&mut seen[p], true) {
                return Err(FEAError::InvalidInput(format!(
                    "equation ordering is not a permutation of 0..{}",
                    n
                )));
            }
        }
        let invp = inverse_permutation(&perm);

        // Lower adjacency in the new ordering
        let lower: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                let mut cols: Vec<usize> = pattern
                    .lane(perm[i])
                    .iter()
                    .map(|&c| invp[c])
                    .filter(|&c| c < i)
                    .collect();
                cols.sort_unstable();
                cols
            })
            .collect();

        let parent = elimination_tree(&lower);

        let block_size = block_size.max(1);
        let nblks = n.div_ceil(block_size);
        let xblk: Vec<usize> = (0..=nblks).map(|b| (b * block_size).min(n)).collect();
        let rowblks: Vec<usize> = (0..n).map(|i| i / block_size).collect();

        let mut env_start = Vec::with_capacity(n);
        let mut env_ptr = Vec::with_capacity(n + 1);
        env_ptr.push(0);
        let mut segments = Vec::new();
        let mut first = Vec::with_capacity(n);
        let mut begblk = vec![0..0; nblks];
        let mut seg_len = 0;

        let mut mark = vec![usize::MAX; n];
        let mut row = Vec::new();
        for i in 0..n {
            // Row structure of the factor: walk the elimination tree up from
            // every nonzero of the row until reaching an already visited node
            row.clear();
            mark[i] = i;
            for &j in &lower[i] {
                let mut k = j;
                while mark[k] != i {
                    mark[k] = i;
                    row.push(k);
                    match parent[k] {
                        Some(p) => k = p,
                        None => break,
                    }
                }
            }
            row.sort_unstable();

            let block_start = xblk[rowblks[i]];
            let split = row.partition_point(|&c| c < block_start);
            let start = row.get(split).copied().unwrap_or(i);
            env_start.push(start);
            env_ptr.push(env_ptr[i] + (i - start));

            let seg_first = segments.len();
            let mut iter = row[..split].iter().copied().peekable();
            while let Some(col_start) = iter.next() {
                let mut len = 1;
                while iter.peek() == Some(&(col_start + len)) {
                    iter.next();
                    len += 1;
                }
                segments.push(Segment {
                    col_start,
                    len,
                    offset: seg_len,
                });
                seg_len += len;
            }
            first.push(seg_first..segments.len());
        }
        for (b, range) in begblk.iter_mut().enumerate() {
            let rows = xblk[b]..xblk[b + 1];
            *range = first[rows.start].start..first[rows.end - 1].end;
        }

        let env_len = env_ptr[n];
        debug!(
            "symbolic factorization: {} equations, {} blocks, {} envelope and {} off-block entries in {} segments",
            n,
            nblks,
            env_len,
            seg_len,
            segments.len()
        );

        Ok(Self {
            n,
            perm,
            invp,
            xblk,
            rowblks,
            env_start,
            env_ptr,
            segments,
            first,
            begblk,
            assembled: ProfileValues::zeros(n, env_len, seg_len),
            factor: None,
        })
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    pub fn invp(&self) -> &[usize] {
        &self.invp
    }

    /// Position of equation `eq` in the elimination order
    pub fn position(&self, eq: usize) -> usize {
        self.invp[eq]
    }

    pub fn num_blocks(&self) -> usize {
        self.xblk.len() - 1
    }

    pub fn block_bounds(&self) -> &[usize] {
        &self.xblk
    }

    pub fn block_of_row(&self, row: usize) -> usize {
        self.rowblks[row]
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn block_segments(&self, block: usize) -> Range<usize> {
        self.begblk[block].clone()
    }

    /// Stored entries of the factor below the diagonal
    pub fn stored_entries(&self) -> usize {
        self.assembled.penv.len() + self.assembled.seg.len()
    }

    pub fn is_factored(&self) -> bool {
        self.factor.is_some()
    }

    /// Clear the assembled values and drop any factor
    pub fn zero(&mut self) {
        self.assembled.fill_zero();
        self.factor = None;
    }

    /// Add `value` at `(row, col)` of the assembled matrix, both given as
    /// equation numbers. The matrix is symmetric so either triangle may be
    /// addressed. Drops any factor.
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> FEAResult<()> {
        if row >= self.n || col >= self.n {
            return Err(FEAError::InvalidInput(format!(
                "entry ({}, {}) outside a system of size {}",
                row, col, self.n
            )));
        }
        let (r, c) = {
            let (a, b) = (self.invp[row], self.invp[col]);
            if a >= b {
                (a, b)
            } else {
                (b, a)
            }
        };
        self.factor = None;
        if r == c {
            self.assembled.diag[r] += value;
            return Ok(());
        }
        match self.locate(r, c) {
            Some(Slot::Env(k)) => self.assembled.penv[k] += value,
            Some(Slot::Seg(k)) => self.assembled.seg[k] += value,
            None => {
                return Err(FEAError::InvalidInput(format!(
                    "entry ({}, {}) outside the symbolic structure",
                    row, col
                )))
            }
        }
        Ok(())
    }

    /// Storage slot of `(r, c)`, `r > c`, in elimination order
    fn locate(&self, r: usize, c: usize) -> Option<Slot> {
        if c >= self.env_start[r] {
            return Some(Slot::Env(self.env_ptr[r] + c - self.env_start[r]));
        }
        self.segments[self.first[r].clone()]
            .iter()
            .find(|s| s.columns().contains(&c))
            .map(|s| Slot::Seg(s.offset + c - s.col_start))
    }

    /// Entry `(r, c)` of the assembled matrix in elimination order
    fn assembled_entry(&self, r: usize, c: usize) -> f64 {
        let (r, c) = if r >= c { (r, c) } else { (c, r) };
        if r == c {
            return self.assembled.diag[r];
        }
        match self.locate(r, c) {
            Some(Slot::Env(k)) => self.assembled.penv[k],
            Some(Slot::Seg(k)) => self.assembled.seg[k],
            None => 0.0,
        }
    }

    /// Calls `f(col, index)` for every stored off-diagonal entry of row `i`
    /// in ascending column order. `index` addresses the segment values for
    /// off-block entries and the envelope values otherwise.
    fn for_each_in_row(&self, i: usize, mut f: impl FnMut(usize, Slot)) {
        for s in &self.segments[self.first[i].clone()] {
            for (k, c) in s.columns().enumerate() {
                f(c, Slot::Seg(s.offset + k));
            }
        }
        let start = self.env_start[i];
        for (k, c) in (start..i).enumerate() {
            f(c, Slot::Env(self.env_ptr[i] + k));
        }
    }

    /// Numeric factorization `A = L L^T` by rows.
    ///
    /// A non-positive pivot reports the equation number of its row.
    pub fn factor(&mut self) -> FEAResult<()> {
        if self.factor.is_some() {
            return Ok(());
        }
        let mut l = self.assembled.clone();
        let mut work = vec![0.0; self.n];
        let mut cols = Vec::new();

        for i in 0..self.n {
            cols.clear();
            self.for_each_in_row(i, |c, slot| cols.push((c, slot)));
            for &(c, slot) in &cols {
                work[c] = slot.get(&l);
            }

            let mut d = l.diag[i];
            for &(j, slot) in &cols {
                let mut s = work[j];
                self.for_each_in_row(j, |k, jslot| {
                    s -= work[k] * jslot.get(&l);
                });
                let lij = s / l.diag[j];
                work[j] = lij;
                d -= lij * lij;
                slot.set(&mut l, lij);
            }
            for &(c, _) in &cols {
                work[c] = 0.0;
            }

            if d <= 0.0 || !d.is_finite() {
                return Err(FEAError::SingularFactor { row: self.perm[i] });
            }
            l.diag[i] = d.sqrt();
        }

        debug!("profile factorization of {} equations complete", self.n);
        self.factor = Some(l);
        Ok(())
    }

    /// Overwrite `b` (equation ordering) with the solution of `A x = b`
    pub fn solve(&self, b: &mut FEVec) -> FEAResult<()> {
        let l = self.factor.as_ref().ok_or_else(|| {
            FEAError::Configuration("profile solve requested before factorization".to_string())
        })?;
        if b.len() != self.n {
            return Err(FEAError::DofMismatch {
                what: "right-hand side".to_string(),
                expected: self.n,
                found: b.len(),
            });
        }
        let mut y = apply_permutation(b.as_slice(), &self.perm);

        // L y = b
        for i in 0..self.n {
            let mut s = y[i];
            self.for_each_in_row(i, |c, slot| s -= slot.get(l) * y[c]);
            y[i] = s / l.diag[i];
        }
        // L^T x = y
        for i in (0..self.n).rev() {
            let xi = y[i] / l.diag[i];
            y[i] = xi;
            self.for_each_in_row(i, |c, slot| y[c] -= slot.get(l) * xi);
        }

        for (new, &old) in self.perm.iter().enumerate() {
            b[old] = y[new];
        }
        Ok(())
    }

    /// `y = A x` with the assembled matrix, equation ordering
    pub fn multiply(&self, x: &FEVec) -> FEAResult<FEVec> {
        if x.len() != self.n {
            return Err(FEAError::DofMismatch {
                what: "profile product operand".to_string(),
                expected: self.n,
                found: x.len(),
            });
        }
        let xp = apply_permutation(x.as_slice(), &self.perm);
        let mut yp = vec![0.0; self.n];
        for i in 0..self.n {
            yp[i] += self.assembled.diag[i] * xp[i];
            self.for_each_in_row(i, |c, slot| {
                let v = slot.get(&self.assembled);
                yp[i] += v * xp[c];
                yp[c] += v * xp[i];
            });
        }
        let mut y = FEVec::zeros(self.n);
        for (new, &old) in self.perm.iter().enumerate() {
            y[old] = yp[new];
        }
        Ok(y)
    }

    /// Assembled entry at equation numbers `(row, col)`
    pub fn entry(&self, row: usize, col: usize) -> f64 {
        self.assembled_entry(self.invp[row], self.invp[col])
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Env(usize),
    Seg(usize),
}

impl Slot {
    fn get(self, values: &ProfileValues) -> f64 {
        match self {
            Slot::Env(k) => values.penv[k],
            Slot::Seg(k) => values.seg[k],
        }
    }

    fn set(self, values: &mut ProfileValues, v: f64) {
        match self {
            Slot::Env(k) => values.penv[k] = v,
            Slot::Seg(k) => values.seg[k] = v,
        }
    }
}

/// Parent of every node in the elimination tree of a lower structure
fn elimination_tree(lower: &[Vec<usize>]) -> Vec<Option<usize>> {
    let n = lower.len();
    let mut parent = vec![None; n];
    let mut ancestor: Vec<Option<usize>> = vec![None; n];
    for (k, cols) in lower.iter().enumerate() {
        for &c in cols {
            let mut r = Some(c);
            while let Some(i) = r.filter(|&i| i < k) {
                let next = ancestor[i];
                ancestor[i] = Some(k);
                if next.is_none() {
                    parent[i] = Some(k);
                }
                r = next;
            }
        }
    }
    parent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sparse::{compress_adjacency, natural_ordering, reverse_cuthill_mckee};
    use crate::math::Mat;
    use approx::assert_relative_eq;

    /// Symmetric positive definite test matrix with an arrow and a band
    fn dense_spd(n: usize) -> Mat {
        let mut a = Mat::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = 10.0 + i as f64;
            if i + 1 < n {
                a[(i, i + 1)] = -1.0;
                a[(i + 1, i)] = -1.0;
            }
            if i > 1 {
                a[(i, 0)] = 0.5;
                a[(0, i)] = 0.5;
            }
        }
        a
    }

    fn pattern_of(a: &Mat) -> SparsityPattern {
        let n = a.nrows();
        let adjacency: Vec<Vec<usize>> = (0..n)
            .map(|i| (0..n).filter(|&j| j != i && a[(i, j)] != 0.0).collect())
            .collect();
        compress_adjacency(&adjacency).unwrap()
    }

    fn assemble(a: &Mat, pf: &mut ProfileFactor) {
        for i in 0..a.nrows() {
            for j in 0..=i {
                if a[(i, j)] != 0.0 {
                    pf.add(i, j, a[(i, j)]).unwrap();
                }
            }
        }
    }

    fn check_solve(block_size: usize, rcm: bool) {
        let a = dense_spd(9);
        let pattern = pattern_of(&a);
        let perm = if rcm {
            reverse_cuthill_mckee(&pattern)
        } else {
            natural_ordering(9)
        };
        let mut pf = ProfileFactor::symbolic(&pattern, perm, block_size).unwrap();
        assemble(&a, &mut pf);

        let x_true = FEVec::from_fn(9, |i, _| 1.0 + i as f64 * 0.25);
        let mut b = &a * &x_true;
        assert_relative_eq!(pf.multiply(&x_true).unwrap(), b.clone(), epsilon = 1e-12);

        pf.factor().unwrap();
        pf.solve(&mut b).unwrap();
        assert_relative_eq!(b, x_true, epsilon = 1e-10);
    }

    #[test]
    fn test_solve_single_block() {
        check_solve(32, false);
        check_solve(32, true);
    }

    #[test]
    fn test_solve_with_off_block_segments() {
        check_solve(2, false);
        check_solve(3, true);
        check_solve(1, false);
    }

    #[test]
    fn test_block_layout() {
        let a = dense_spd(7);
        let pf = ProfileFactor::symbolic(&pattern_of(&a), natural_ordering(7), 3).unwrap();
        assert_eq!(pf.num_blocks(), 3);
        assert_eq!(pf.block_bounds(), &[0, 3, 6, 7]);
        assert_eq!(pf.block_of_row(4), 1);
        // Rows of later blocks reach column 0 through the arrow
        assert!(pf.num_segments() > 0);
        assert_eq!(pf.block_segments(0), 0..0);
    }

    #[test]
    fn test_entry_outside_structure() {
        let adjacency = vec![vec![1], vec![0], vec![]];
        let pattern = compress_adjacency(&adjacency).unwrap();
        let mut pf = ProfileFactor::symbolic(&pattern, natural_ordering(3), 1).unwrap();
        assert!(pf.add(1, 0, 1.0).is_ok());
        assert!(matches!(pf.add(2, 0, 1.0), Err(FEAError::InvalidInput(_))));
        assert!(pf.add(3, 0, 1.0).is_err());
    }

    #[test]
    fn test_indefinite_reports_equation() {
        let adjacency = vec![vec![1], vec![0]];
        let pattern = compress_adjacency(&adjacency).unwrap();
        let mut pf = ProfileFactor::symbolic(&pattern, vec![1, 0], 4).unwrap();
        pf.add(0, 0, 1.0).unwrap();
        pf.add(1, 1, 1.0).unwrap();
        pf.add(0, 1, 2.0).unwrap();
        let err = pf.factor().unwrap_err();
        // Equation 1 is eliminated first, equation 0 carries the bad pivot
        assert!(matches!(err, FEAError::SingularFactor { row: 0 }));
        assert!(err.is_numerical());
    }

    #[test]
    fn test_zero_resets_values() {
        let a = dense_spd(5);
        let pattern = pattern_of(&a);
        let mut pf = ProfileFactor::symbolic(&pattern, natural_ordering(5), 2).unwrap();
        assemble(&a, &mut pf);
        pf.factor().unwrap();
        let first = pf.clone();

        pf.zero();
        assert!(!pf.is_factored());
        assert_eq!(pf.entry(3, 3), 0.0);
        assemble(&a, &mut pf);
        pf.factor().unwrap();
        assert_eq!(pf.factor, first.factor);
    }

    #[test]
    fn test_product_operand_length_checked() {
        let a = dense_spd(4);
        let pf = ProfileFactor::symbolic(&pattern_of(&a), natural_ordering(4), 2).unwrap();
        let err = pf.multiply(&FEVec::zeros(3)).unwrap_err();
        assert!(matches!(err, FEAError::DofMismatch { expected: 4, found: 3, .. }));
    }

    #[test]
    fn test_bad_permutation() {
        let pattern = compress_adjacency(&[vec![], vec![]]).unwrap();
        assert!(ProfileFactor::symbolic(&pattern, vec![0, 0], 2).is_err());
        assert!(ProfileFactor::symbolic(&pattern, vec![0], 2).is_err());
    }
}
