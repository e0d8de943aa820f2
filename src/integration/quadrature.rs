//! One-dimensional quadrature families on the unit interval.
//!
//! Every routine returns `(xi, wt)` with `xi` ascending on [0, 1] and the
//! weights already scaled by 0.5 from the reference interval [-1, 1], so
//! that they sum to one.

use std::f64::consts::PI;

use crate::error::{FEAError, FEAResult};

const NEWTON_TOL: f64 = 1e-15;
const NEWTON_MAX_ITER: usize = 100;

/// Legendre polynomials `(P_m(x), P_{m-1}(x))`, `m >= 1`
fn legendre_pair(x: f64, m: usize) -> (f64, f64) {
    let mut p_prev = 1.0;
    let mut p = x;
    for k in 2..=m {
        let kf = k as f64;
        let p_next = ((2.0 * kf - 1.0) * x * p - (kf - 1.0) * p_prev) / kf;
        p_prev = p;
        p = p_next;
    }
    (p, p_prev)
}

/// Map reference abscissas/weights from [-1, 1] to [0, 1] and sort ascending
fn to_unit_interval(x: Vec<f64>, w: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = x
        .into_iter()
        .zip(w)
        .map(|(x, w)| (0.5 * (x + 1.0), 0.5 * w))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

fn require_points(family: &str, n: usize, min: usize) -> FEAResult<()> {
    if n < min {
        return Err(FEAError::InvalidInput(format!(
            "{} integration requires at least {} point(s), got {}",
            family, min, n
        )));
    }
    Ok(())
}

/// Gauss-Legendre points and weights
pub fn gauss_legendre(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    require_points("Legendre", n, 1)?;

    let mut x = Vec::with_capacity(n);
    let mut w = Vec::with_capacity(n);
    for i in 0..n {
        let mut xi = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 1.0;
        for _ in 0..NEWTON_MAX_ITER {
            let (p, p_prev) = legendre_pair(xi, n);
            dp = n as f64 * (xi * p - p_prev) / (xi * xi - 1.0);
            let dx = p / dp;
            xi -= dx;
            if dx.abs() < NEWTON_TOL {
                break;
            }
        }
        x.push(xi);
        w.push(2.0 / ((1.0 - xi * xi) * dp * dp));
    }

    Ok(to_unit_interval(x, w))
}

/// Gauss-Lobatto points and weights, both endpoints included
pub fn gauss_lobatto(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    require_points("Lobatto", n, 2)?;

    let order = n - 1;
    let nf = n as f64;
    let mut x = Vec::with_capacity(n);
    let mut w = Vec::with_capacity(n);
    for i in 0..n {
        let mut xi = (PI * i as f64 / order as f64).cos();
        if i > 0 && i < order {
            for _ in 0..NEWTON_MAX_ITER {
                let (p, p_prev) = legendre_pair(xi, order);
                let dx = (xi * p - p_prev) / (nf * p);
                xi -= dx;
                if dx.abs() < NEWTON_TOL {
                    break;
                }
            }
        }
        let (p, _) = legendre_pair(xi, order);
        x.push(xi);
        w.push(2.0 / (order as f64 * nf * p * p));
    }

    let (mut xi, wt) = to_unit_interval(x, w);
    xi[0] = 0.0;
    xi[n - 1] = 1.0;
    Ok((xi, wt))
}

/// Gauss-Radau points and weights, left endpoint included
pub fn gauss_radau(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    require_points("Radau", n, 1)?;

    let nf = n as f64;
    let mut x = Vec::with_capacity(n);
    let mut w = Vec::with_capacity(n);
    x.push(-1.0);
    w.push(2.0 / (nf * nf));
    for i in 1..n {
        let mut xi = -(2.0 * PI * i as f64 / (2.0 * nf - 1.0)).cos();
        for _ in 0..NEWTON_MAX_ITER {
            let (p_n, p_nm1) = legendre_pair(xi, n);
            let dx = ((1.0 - xi) / nf) * (p_nm1 + p_n) / (p_nm1 - p_n);
            xi -= dx;
            if dx.abs() < NEWTON_TOL {
                break;
            }
        }
        let (_, p_nm1) = legendre_pair(xi, n);
        x.push(xi);
        w.push((1.0 - xi) / (nf * p_nm1).powi(2));
    }

    let (mut xi, wt) = to_unit_interval(x, w);
    xi[0] = 0.0;
    Ok((xi, wt))
}

/// Positive abscissas of the equal-weight Chebyshev rule on [-1, 1].
///
/// Real nodes only exist for n = 1..=7 and n = 9.
fn chebyshev_equal_nodes(n: usize) -> Option<&'static [f64]> {
    match n {
        1 => Some(&[]),
        2 => Some(&[0.577_350_269_189_625_8]),
        3 => Some(&[0.707_106_781_186_547_6]),
        4 => Some(&[0.187_592_474_085_079_9, 0.794_654_472_291_766_1]),
        5 => Some(&[0.374_541_409_553_632_5, 0.832_497_487_000_981_9]),
        6 => Some(&[
            0.266_635_401_516_704_7,
            0.422_518_653_761_111_5,
            0.866_246_818_107_820_6,
        ]),
        7 => Some(&[
            0.323_911_810_519_907_6,
            0.529_656_775_285_156_8,
            0.883_861_700_758_049_0,
        ]),
        9 => Some(&[
            0.167_906_184_214_803_9,
            0.528_761_783_057_880_0,
            0.601_018_655_380_238_1,
            0.911_589_307_728_434_5,
        ]),
        _ => None,
    }
}

/// Equal-weight Chebyshev quadrature
pub fn chebyshev_equal_weight(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    require_points("Chebyshev", n, 1)?;

    let half = chebyshev_equal_nodes(n).ok_or_else(|| {
        FEAError::UnsupportedConfiguration(format!(
            "equal-weight Chebyshev integration has complex nodes for {} points",
            n
        ))
    })?;

    let mut x: Vec<f64> = half.iter().map(|&v| -v).collect();
    if n % 2 == 1 {
        x.push(0.0);
    }
    x.extend(half.iter().copied());

    let w = vec![2.0 / n as f64; n];
    Ok(to_unit_interval(x, w))
}

/// Fejér's first rule: Chebyshev roots as abscissas
pub fn chebyshev_roots(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    require_points("Chebyshev", n, 1)?;

    let nf = n as f64;
    let mut x = Vec::with_capacity(n);
    let mut w = Vec::with_capacity(n);
    for k in 1..=n {
        let theta = (2.0 * k as f64 - 1.0) * PI / (2.0 * nf);
        let mut sum = 0.0;
        for j in 1..=n / 2 {
            let jf = j as f64;
            sum += (2.0 * jf * theta).cos() / (4.0 * jf * jf - 1.0);
        }
        x.push(theta.cos());
        w.push(2.0 / nf * (1.0 - 2.0 * sum));
    }

    Ok(to_unit_interval(x, w))
}

/// Clenshaw-Curtis rule: Chebyshev extrema as abscissas, endpoints included
pub fn chebyshev_extrema(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    require_points("Chebyshev", n, 2)?;

    let order = n - 1;
    let of = order as f64;
    let mut x = Vec::with_capacity(n);
    let mut w = Vec::with_capacity(n);
    for k in 0..n {
        let theta = k as f64 * PI / of;
        let mut sum = 0.0;
        for j in 1..=order / 2 {
            let jf = j as f64;
            let b = if 2 * j == order { 1.0 } else { 2.0 };
            sum += b / (4.0 * jf * jf - 1.0) * (2.0 * jf * theta).cos();
        }
        let c = if k == 0 || k == order { 1.0 } else { 2.0 };
        x.push(theta.cos());
        w.push(c / of * (1.0 - sum));
    }

    let (mut xi, wt) = to_unit_interval(x, w);
    xi[0] = 0.0;
    xi[n - 1] = 1.0;
    Ok((xi, wt))
}

/// Composite trapezoidal rule
pub fn trapezoidal(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    require_points("Trapezoidal", n, 2)?;

    let h = 1.0 / (n - 1) as f64;
    let xi = (0..n).map(|i| i as f64 * h).collect();
    let wt = (0..n)
        .map(|i| if i == 0 || i == n - 1 { 0.5 * h } else { h })
        .collect();
    Ok((xi, wt))
}
