//! Linear algebra layer.
//!
//! Dense/sparse storage helpers, elementary orthogonal transforms, the
//! product form of the inverse, and the pivoted QR and Jacobi SVD
//! decompositions built from them.

pub mod dense;
pub mod sparse;
pub mod factor;
pub mod householder;
pub mod rotation;
pub mod qr;
pub mod svd;

pub use factor::{ElementaryFactor, InvertibleFactor, ProductForm};
pub use householder::Householder;
pub use rotation::Rotation;
