//! Column-pivoted Householder QR.
//!
//! Computes `A P = Q R` with the full square orthogonal factor `Q`, so the
//! trailing columns of `Q` span the null space of `A^T`. The numerical rank
//! is the number of pivots whose remaining column norm is not negligible
//! relative to the first one.

use nalgebra::{DMatrix, DVector};

use super::householder::{self, Householder};
use crate::util::numerics::NumberContext;

/// `A P = Q R` with `Q` square orthogonal and `R` upper trapezoidal.
#[derive(Debug, Clone)]
pub struct PivotedQr {
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    /// Column `j` of `R` is column `permutation[j]` of `A`
    permutation: Vec<usize>,
    rank: usize,
}

impl PivotedQr {
    /// Factorize `a` (m × n).
    pub fn decompose(a: &DMatrix<f64>, context: &NumberContext) -> Self {
        let (m, n) = a.shape();
        let mut r = a.clone();
        let mut q = DMatrix::<f64>::identity(m, m);
        let mut permutation: Vec<usize> = (0..n).collect();
        let mut reflector = Householder::new(m);
        let mut column = vec![0.0; m];

        let mut rank = 0;
        let mut leading_norm = 0.0;

        for k in 0..m.min(n) {
            // Pivot: remaining column with the largest norm
            let (pivot, norm) = (k..n)
                .map(|j| (j, r.view((k, j), (m - k, 1)).norm()))
                .fold((k, -1.0), |best, cand| if cand.1 > best.1 { cand } else { best });

            if k == 0 {
                leading_norm = norm;
            }
            if norm <= 0.0 || context.is_small(leading_norm, norm) {
                break;
            }

            if pivot != k {
                r.swap_columns(k, pivot);
                permutation.swap(k, pivot);
            }

            column.copy_from_slice(r.column(k).as_slice());
            let alpha = reflector.make(&column, k);
            householder::transform_left_from(&mut r, &reflector, k + 1);
            householder::transform_right(&mut q, &reflector);

            r[(k, k)] = alpha;
            for i in (k + 1)..m {
                r[(i, k)] = 0.0;
            }
            rank += 1;
        }

        // Below the rank the trailing block is numerically zero
        for j in rank..n {
            for i in rank..m {
                r[(i, j)] = 0.0;
            }
        }

        Self { q, r, permutation, rank }
    }

    /// Full orthogonal factor (m × m).
    pub fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    /// Upper trapezoidal factor (m × n).
    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    /// Column permutation.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Numerical rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// True when every column of `A` is independent.
    pub fn is_full_rank(&self) -> bool {
        self.rank == self.r.ncols()
    }

    /// Orthonormal basis of the range of `A` (first `rank` columns of Q).
    pub fn range_basis(&self) -> DMatrix<f64> {
        self.q.columns(0, self.rank).into_owned()
    }

    /// Orthonormal basis of the null space of `A^T` (remaining columns of Q).
    pub fn null_basis(&self) -> DMatrix<f64> {
        let m = self.q.nrows();
        self.q.columns(self.rank, m - self.rank).into_owned()
    }

    /// Basic solution of `A x = b`: solve with the leading `rank × rank`
    /// triangle and set the components of dependent columns to zero.
    ///
    /// For a full-column-rank `A` this is the least-squares solution.
    pub fn solve_basic(&self, b: &DVector<f64>) -> DVector<f64> {
        let n = self.r.ncols();
        let qtb = self.q.tr_mul(b);

        let mut z = vec![0.0; n];
        for i in (0..self.rank).rev() {
            let mut acc = qtb[i];
            for j in (i + 1)..self.rank {
                acc -= self.r[(i, j)] * z[j];
            }
            z[i] = acc / self.r[(i, i)];
        }

        let mut x = DVector::zeros(n);
        for (j, &col) in self.permutation.iter().enumerate() {
            x[col] = z[j];
        }
        x
    }

    /// Least-squares solution of `A x = b`, or `None` when `A` is rank
    /// deficient.
    pub fn solve(&self, b: &DVector<f64>) -> Option<DVector<f64>> {
        if self.is_full_rank() {
            Some(self.solve_basic(b))
        } else {
            None
        }
    }
}
