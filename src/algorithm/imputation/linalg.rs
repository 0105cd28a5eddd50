//! Small dense solvers for the imputation regressions

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Solve `a x = b` for symmetric positive definite `a`
///
/// Returns `None` when `a` is not positive definite.
#[must_use]
pub fn cholesky_solve(a: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    // Forward substitution: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }

    // Back substitution: L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    Some(x)
}

/// Ridge-stabilized least squares
///
/// Column 0 of `x` is the intercept and is not penalized. The penalty is
/// raised tenfold a few times when the normal equations are singular.
#[must_use]
pub fn ridge_least_squares(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, ridge: f64) -> Option<Array1<f64>> {
    let gram = x.t().dot(&x);
    let rhs = x.t().dot(&y);
    let scale = (gram.diag().sum() / gram.nrows().max(1) as f64).max(1.0);

    let mut penalty = ridge.max(f64::EPSILON) * scale;
    for _ in 0..4 {
        let mut system = gram.clone();
        for j in 1..system.nrows() {
            system[[j, j]] += penalty;
        }
        if let Some(beta) = cholesky_solve(system.view(), rhs.view()) {
            return Some(beta);
        }
        penalty *= 10.0;
    }
    None
}
