//! Dense matrix helpers.
//!
//! Row selection and stacking used to assemble active-set subproblems, plus
//! a few norms the solvers use for relative tolerances.

use nalgebra::{DMatrix, DVector};

/// Copy the given rows of `a`, in the given order.
pub fn select_rows(a: &DMatrix<f64>, rows: &[usize]) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(rows.len(), a.ncols());
    for (dst, &src) in rows.iter().enumerate() {
        out.row_mut(dst).copy_from(&a.row(src));
    }
    out
}

/// Copy the given entries of `v`, in the given order.
pub fn select_entries(v: &DVector<f64>, rows: &[usize]) -> DVector<f64> {
    DVector::from_iterator(rows.len(), rows.iter().map(|&i| v[i]))
}

/// Stack two matrices vertically: [A; B].
pub fn vstack(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    assert_eq!(a.ncols(), b.ncols(), "Matrices must have same number of columns");
    let mut out = DMatrix::zeros(a.nrows() + b.nrows(), a.ncols());
    out.view_mut((0, 0), (a.nrows(), a.ncols())).copy_from(a);
    out.view_mut((a.nrows(), 0), (b.nrows(), b.ncols())).copy_from(b);
    out
}

/// Concatenate two vectors: [a; b].
pub fn vconcat(a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(a.len() + b.len(), a.iter().chain(b.iter()).copied())
}

/// Largest absolute entry (0 for an empty matrix).
pub fn max_abs(a: &DMatrix<f64>) -> f64 {
    a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Largest absolute entry of a vector (0 when empty).
pub fn max_abs_vec(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

/// Largest asymmetry |a_ij - a_ji| of a square matrix.
pub fn max_asymmetry(a: &DMatrix<f64>) -> f64 {
    let n = a.nrows();
    let mut worst = 0.0_f64;
    for j in 0..n {
        for i in (j + 1)..n {
            worst = worst.max((a[(i, j)] - a[(j, i)]).abs());
        }
    }
    worst
}
