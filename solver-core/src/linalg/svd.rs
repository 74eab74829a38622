//! Two-sided Jacobi singular value decomposition.
//!
//! Each step diagonalizes a 2×2 block with [`Rotation::rotations_p`],
//! rotating rows with the combined rotation and columns with the Jacobi
//! one, until every off-diagonal pair is negligible. Rectangular inputs are
//! zero-padded to a square of size `max(m, n)`; the padding only adds zero
//! singular values.
//!
//! Intended for the small dense systems of the active-set method, where the
//! accuracy of Jacobi matters more than its cost.

use nalgebra::{DMatrix, DVector};

use super::rotation::{self, Rotation};
use crate::util::numerics::NumberContext;

const MAX_SWEEPS: usize = 64;

/// `A = U diag(s) V^T`, singular values sorted in decreasing order.
#[derive(Debug, Clone)]
pub struct JacobiSvd {
    u: DMatrix<f64>,
    singular: DVector<f64>,
    v: DMatrix<f64>,
    rows: usize,
    cols: usize,
    sweeps: usize,
    converged: bool,
}

impl JacobiSvd {
    /// Decompose `a` (m × n).
    pub fn decompose(a: &DMatrix<f64>) -> Self {
        let (rows, cols) = a.shape();
        let k = rows.max(cols);

        let mut w = DMatrix::zeros(k, k);
        w.view_mut((0, 0), (rows, cols)).copy_from(a);
        let mut u = DMatrix::<f64>::identity(k, k);
        let mut v = DMatrix::<f64>::identity(k, k);

        let floor = f64::EPSILON * a.norm();
        let mut sweeps = 0;
        let mut converged = false;

        while sweeps < MAX_SWEEPS {
            sweeps += 1;
            let mut rotated = false;

            for p in 0..k {
                for q in (p + 1)..k {
                    let off = w[(p, q)].abs().max(w[(q, p)].abs());
                    let diag = (w[(p, p)] * w[(q, q)]).abs().sqrt();
                    if off <= floor || off <= f64::EPSILON * diag {
                        continue;
                    }

                    let [left, right] =
                        Rotation::rotations_p(p, q, w[(p, p)], w[(p, q)], w[(q, p)], w[(q, q)]);
                    rotation::rotate_left(&mut w, &left);
                    rotation::rotate_right(&mut w, &right);
                    rotation::rotate_right(&mut u, &left);
                    rotation::rotate_right(&mut v, &right);
                    w[(p, q)] = 0.0;
                    w[(q, p)] = 0.0;
                    rotated = true;
                }
            }

            if !rotated {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!("Jacobi SVD hit the sweep limit ({}) on a {}x{} matrix", MAX_SWEEPS, rows, cols);
        }

        // Make singular values nonnegative by flipping the matching U column
        let mut values: Vec<f64> = (0..k).map(|i| w[(i, i)]).collect();
        for (i, s) in values.iter_mut().enumerate() {
            if *s < 0.0 {
                *s = -*s;
                u.column_mut(i).neg_mut();
            }
        }

        // Sort decreasing
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));
        let singular = DVector::from_iterator(k, order.iter().map(|&i| values[i]));
        let u = DMatrix::from_fn(k, k, |r, c| u[(r, order[c])]);
        let v = DMatrix::from_fn(k, k, |r, c| v[(r, order[c])]);

        Self { u, singular, v, rows, cols, sweeps, converged }
    }

    /// All `max(m, n)` singular values, decreasing.
    pub fn singular_values(&self) -> &DVector<f64> {
        &self.singular
    }

    /// Left singular vectors of the padded square matrix.
    pub fn u(&self) -> &DMatrix<f64> {
        &self.u
    }

    /// Right singular vectors of the padded square matrix.
    pub fn v(&self) -> &DMatrix<f64> {
        &self.v
    }

    /// Number of sweeps used.
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Whether a sweep finished without rotating before the sweep limit.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Singular values larger than `context.threshold(s_max)`.
    pub fn rank(&self, context: &NumberContext) -> usize {
        let cutoff = self.cutoff(context);
        self.singular.iter().filter(|&&s| s > cutoff).count()
    }

    /// Minimum-norm least-squares solution of `A x = b`.
    ///
    /// Singular values at or below the rank cutoff are treated as zero.
    pub fn solve_least_norm(&self, b: &DVector<f64>, context: &NumberContext) -> DVector<f64> {
        assert_eq!(b.len(), self.rows, "rhs length must match row count");
        let k = self.singular.len();
        let cutoff = self.cutoff(context);

        let mut padded = DVector::zeros(k);
        padded.rows_mut(0, self.rows).copy_from(b);

        let mut x = DVector::zeros(k);
        for i in 0..k {
            let s = self.singular[i];
            if s <= cutoff {
                break;
            }
            let coeff = self.u.column(i).dot(&padded) / s;
            x.axpy(coeff, &self.v.column(i), 1.0);
        }
        x.rows(0, self.cols).into_owned()
    }

    fn cutoff(&self, context: &NumberContext) -> f64 {
        let largest = self.singular.iter().copied().fold(0.0, f64::max);
        context.threshold(largest)
    }
}
