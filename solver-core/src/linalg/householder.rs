//! Householder reflections.
//!
//! A reflection is stored as a vector `v`, a leading index `first` and a
//! coefficient `beta`, representing `H = I - beta * v * v^T` where every
//! entry of `v` below `first` is treated as zero regardless of what is
//! stored there. The full matrix is never materialized.
//!
//! The transform functions take the target by exclusive reference and the
//! reflection by shared reference and mutate the target in place.

use nalgebra::DMatrix;

use super::factor::InvertibleFactor;
use crate::util::numerics::signum_or_one;

/// Householder reflection `I - beta * v * v^T` acting on indices `first..`.
#[derive(Debug, Clone, PartialEq)]
pub struct Householder {
    vector: Vec<f64>,
    first: usize,
    beta: f64,
}

impl Householder {
    /// Identity reflection of dimension `dim` (beta = 0).
    pub fn new(dim: usize) -> Self {
        Self {
            vector: vec![0.0; dim],
            first: 0,
            beta: 0.0,
        }
    }

    /// Build from an explicit vector, computing beta from its tail norm.
    pub fn from_vector(vector: Vec<f64>, first: usize) -> Self {
        let beta = beta_for(&vector, first);
        Self { vector, first, beta }
    }

    /// Dimension of the space the reflection acts on.
    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    /// Leading index; entries below it are implicitly zero.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Reflection coefficient.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Entry `i` of the reflection vector (zero below `first`).
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        if i < self.first {
            0.0
        } else {
            self.vector[i]
        }
    }

    /// Raw stored vector. Entries below `first` are not meaningful.
    pub fn vector(&self) -> &[f64] {
        &self.vector
    }

    /// Generate the reflection that maps `column[first..]` onto a multiple of
    /// the unit vector `e_first`, and return that multiple.
    ///
    /// The sign is chosen opposite to `column[first]` so that forming
    /// `v = x - alpha * e_first` never cancels. A zero tail yields the
    /// identity (beta = 0) and returns 0.
    pub fn make(&mut self, column: &[f64], first: usize) -> f64 {
        assert_eq!(column.len(), self.vector.len());
        assert!(first < column.len(), "first index out of range");

        self.first = first;
        let tail = &column[first..];

        let scale = tail.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 {
            self.vector.fill(0.0);
            self.beta = 0.0;
            return 0.0;
        }
        let norm = scale * tail.iter().map(|v| (v / scale).powi(2)).sum::<f64>().sqrt();
        let alpha = -signum_or_one(column[first]) * norm;

        self.vector[..first].fill(0.0);
        self.vector[first..].copy_from_slice(tail);
        self.vector[first] -= alpha;
        self.beta = beta_for(&self.vector, first);

        alpha
    }

    /// Copy `source`, recomputing `beta = 2 / sum(v[first..]^2)`.
    pub fn copy(&mut self, source: &Householder) {
        self.copy_vector(source);
        self.beta = beta_for(&self.vector, self.first);
    }

    /// Copy `source` but use a beta that is already known.
    pub fn copy_with_beta(&mut self, source: &Householder, beta: f64) {
        self.copy_vector(source);
        self.beta = beta;
    }

    fn copy_vector(&mut self, source: &Householder) {
        self.vector.clear();
        self.vector.extend_from_slice(&source.vector);
        self.first = source.first;
    }

    /// v^T x over the active range.
    #[inline]
    fn dot_tail(&self, x: impl Iterator<Item = f64>) -> f64 {
        self.vector[self.first..]
            .iter()
            .zip(x)
            .map(|(v, x)| v * x)
            .sum()
    }
}

fn beta_for(vector: &[f64], first: usize) -> f64 {
    let sum_sq: f64 = vector[first..].iter().map(|v| v * v).sum();
    if sum_sq == 0.0 {
        0.0
    } else {
        2.0 / sum_sq
    }
}

/// Apply `H` from the left to every column of `target`: `target <- H * target`.
pub fn transform_left(target: &mut DMatrix<f64>, h: &Householder) {
    transform_left_from(target, h, 0);
}

/// Apply `H` from the left to columns `first_col..` of `target` only.
///
/// Used during decomposition sweeps where the leading columns are already
/// reduced.
pub fn transform_left_from(target: &mut DMatrix<f64>, h: &Householder, first_col: usize) {
    assert_eq!(target.nrows(), h.dim());
    if h.beta == 0.0 {
        return;
    }
    let first = h.first;
    for j in first_col..target.ncols() {
        let mut col = target.column_mut(j);
        let s = h.beta * h.dot_tail(col.rows_range(first..).iter().copied());
        if s != 0.0 {
            for (i, v) in h.vector[first..].iter().enumerate() {
                col[first + i] -= s * v;
            }
        }
    }
}

/// Apply `H` from the right to every row of `target`: `target <- target * H`.
pub fn transform_right(target: &mut DMatrix<f64>, h: &Householder) {
    assert_eq!(target.ncols(), h.dim());
    if h.beta == 0.0 {
        return;
    }
    let first = h.first;
    for i in 0..target.nrows() {
        let s = h.beta * h.dot_tail((first..target.ncols()).map(|j| target[(i, j)]));
        if s != 0.0 {
            for (k, v) in h.vector[first..].iter().enumerate() {
                target[(i, first + k)] -= s * v;
            }
        }
    }
}

/// Apply `H` to a vector in place.
pub fn transform_vector(target: &mut [f64], h: &Householder) {
    assert_eq!(target.len(), h.dim());
    if h.beta == 0.0 {
        return;
    }
    let first = h.first;
    let s = h.beta * h.dot_tail(target[first..].iter().copied());
    for (t, v) in target[first..].iter_mut().zip(&h.vector[first..]) {
        *t -= s * v;
    }
}

// H is symmetric and orthogonal, so it is its own inverse and transpose.
impl InvertibleFactor for Householder {
    fn dim(&self) -> usize {
        self.vector.len()
    }

    fn ftran(&self, rhs: &mut [f64]) {
        transform_vector(rhs, self);
    }

    fn btran(&self, rhs: &mut [f64]) {
        transform_vector(rhs, self);
    }
}
