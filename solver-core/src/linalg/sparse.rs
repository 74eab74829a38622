//! Sparse matrix types and conversions.
//!
//! Problems may be assembled in CSC (Compressed Sparse Column) form and
//! elementary factors store their eta column as a sparse vector. The dense
//! solvers convert at the boundary.

use nalgebra::{DMatrix, DVector};
use sprs::{CsMat, CsVec, TriMat};

/// Sparse matrix in CSC format.
pub type SparseCsc = CsMat<f64>;

/// Sparse column vector.
pub type SparseVec = CsVec<f64>;

/// Build a sparse CSC matrix from triplets (row, col, value).
///
/// Duplicate entries are summed.
pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> SparseCsc
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((nrows, ncols));
    for (i, j, v) in triplets {
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

/// Expand a CSC matrix into dense storage.
pub fn to_dense(a: &SparseCsc) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(a.rows(), a.cols());
    for (&val, (row, col)) in a.iter() {
        dense[(row, col)] += val;
    }
    dense
}

/// Compress a dense slice, keeping only entries that are exactly nonzero.
pub fn from_dense_vector(values: &[f64]) -> SparseVec {
    let mut indices = Vec::new();
    let mut data = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if v != 0.0 {
            indices.push(i);
            data.push(v);
        }
    }
    CsVec::new(values.len(), indices, data)
}

/// Expand a sparse vector into a dense one.
pub fn vector_to_dense(v: &SparseVec) -> DVector<f64> {
    let mut dense = DVector::zeros(v.dim());
    for (i, &val) in v.iter() {
        dense[i] = val;
    }
    dense
}
