//! Invertible factors and the product form of the inverse.
//!
//! An [`InvertibleFactor`] is a linear operator `F` that can solve with
//! itself (`ftran`: `F x = b`) and with its transpose (`btran`:
//! `F^T x = b`) in place. A [`ProductForm`] chains factors
//! `A = F1 F2 ... Fk`:
//!
//! - `ftran` solves `A x = b` by applying F1, F2, ..., Fk in that order
//! - `btran` solves `A^T x = b` by applying Fk, ..., F1 (strict reverse)
//!
//! Swapping a basis column is the classic product-form update:
//! [`ProductForm::replace`] ftrans the entering column through the current
//! chain and appends the resulting elementary (eta) factor.

use nalgebra::DMatrix;

use super::sparse::{self, SparseVec};

/// A linear operator that can solve with itself and its transpose.
pub trait InvertibleFactor {
    /// Size of the (square) operator.
    fn dim(&self) -> usize;

    /// Solve `F x = rhs`, overwriting `rhs` with `x`.
    fn ftran(&self, rhs: &mut [f64]);

    /// Solve `F^T x = rhs`, overwriting `rhs` with `x`.
    fn btran(&self, rhs: &mut [f64]);

    /// Column-by-column [`ftran`](Self::ftran).
    fn ftran_matrix(&self, rhs: &mut DMatrix<f64>) {
        let rows = rhs.nrows();
        for j in 0..rhs.ncols() {
            let start = j * rows;
            self.ftran(&mut rhs.as_mut_slice()[start..start + rows]);
        }
    }

    /// Column-by-column [`btran`](Self::btran).
    fn btran_matrix(&self, rhs: &mut DMatrix<f64>) {
        let rows = rhs.nrows();
        for j in 0..rhs.ncols() {
            let start = j * rows;
            self.btran(&mut rhs.as_mut_slice()[start..start + rows]);
        }
    }
}

/// Identity except for one column, which holds `values`.
///
/// The pivot `values[col]` must be safely nonzero; this is not checked.
#[derive(Debug, Clone)]
pub struct ElementaryFactor {
    values: SparseVec,
    col: usize,
    /// `-values[col]`, the pivot divisor
    negated_diagonal: f64,
}

impl ElementaryFactor {
    /// Build from the sparse eta column and its position.
    pub fn new(values: SparseVec, col: usize) -> Self {
        assert!(col < values.dim(), "pivot column out of range");
        let diagonal = values.get(col).copied().unwrap_or(0.0);
        Self {
            values,
            col,
            negated_diagonal: -diagonal,
        }
    }

    /// Build from a dense eta column, dropping exact zeros.
    pub fn from_dense(values: &[f64], col: usize) -> Self {
        Self::new(sparse::from_dense_vector(values), col)
    }

    /// Position of the non-identity column.
    pub fn col(&self) -> usize {
        self.col
    }

    /// The eta column.
    pub fn values(&self) -> &SparseVec {
        &self.values
    }

    /// The pivot `values[col]`.
    pub fn diagonal(&self) -> f64 {
        -self.negated_diagonal
    }
}

impl InvertibleFactor for ElementaryFactor {
    fn dim(&self) -> usize {
        self.values.dim()
    }

    // x[col] = b[col] / d, x[i] = b[i] - v[i] * x[col]
    fn ftran(&self, rhs: &mut [f64]) {
        let scale = rhs[self.col] / self.negated_diagonal;
        if scale != 0.0 {
            for (i, &v) in self.values.iter() {
                if i != self.col {
                    rhs[i] += v * scale;
                }
            }
        }
        rhs[self.col] = -scale;
    }

    // x[col] = (b[col] - sum_{i != col} v[i] b[i]) / d, other entries unchanged
    fn btran(&self, rhs: &mut [f64]) {
        let mut acc = -rhs[self.col];
        for (i, &v) in self.values.iter() {
            if i != self.col {
                acc += v * rhs[i];
            }
        }
        rhs[self.col] = acc / self.negated_diagonal;
    }
}

/// Product of invertible factors, starting from the identity.
pub struct ProductForm {
    dim: usize,
    factors: Vec<Box<dyn InvertibleFactor>>,
    work: Vec<f64>,
}

impl ProductForm {
    /// The identity of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            factors: Vec::new(),
            work: vec![0.0; dim],
        }
    }

    /// Number of accumulated factors.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Drop every factor, back to the identity.
    pub fn reset(&mut self) {
        self.factors.clear();
    }

    /// Append a factor on the right: `A <- A * F`.
    pub fn push(&mut self, factor: Box<dyn InvertibleFactor>) {
        assert!(
            factor.dim() <= self.dim,
            "factor of dim {} does not fit a product form of dim {}",
            factor.dim(),
            self.dim
        );
        self.factors.push(factor);
    }

    /// Replace column `col` of the represented matrix by `values`.
    ///
    /// `values` is transformed through the current chain and the result
    /// becomes a new elementary factor. Returns the pivot of that factor so
    /// the caller can reject a degenerate swap.
    pub fn replace(&mut self, values: &[f64], col: usize) -> f64 {
        assert_eq!(values.len(), self.dim);
        self.work.copy_from_slice(values);
        let mut eta = std::mem::take(&mut self.work);
        self.ftran(&mut eta);

        let factor = ElementaryFactor::from_dense(&eta, col);
        let pivot = factor.diagonal();
        self.work = eta;
        self.factors.push(Box::new(factor));
        pivot
    }
}

impl InvertibleFactor for ProductForm {
    fn dim(&self) -> usize {
        self.dim
    }

    fn ftran(&self, rhs: &mut [f64]) {
        for factor in &self.factors {
            factor.ftran(&mut rhs[..factor.dim()]);
        }
    }

    fn btran(&self, rhs: &mut [f64]) {
        for factor in self.factors.iter().rev() {
            factor.btran(&mut rhs[..factor.dim()]);
        }
    }
}

impl std::fmt::Debug for ProductForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductForm")
            .field("dim", &self.dim)
            .field("factors", &self.factors.len())
            .finish()
    }
}
