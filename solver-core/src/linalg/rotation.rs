//! Plane (Givens/Jacobi) rotations.
//!
//! A [`Rotation`] acts on the two indices `low` and `high` only:
//!
//! ```text
//! G = [ cos  sin ]
//!     [-sin  cos ]
//! ```
//!
//! [`rotate_left`] computes `G * A` on rows `low, high`, [`rotate_right`]
//! computes `A * G^T` on columns `low, high`, so applying both with the same
//! rotation is the similarity `G A G^T`.

use nalgebra::DMatrix;

use super::factor::InvertibleFactor;
use crate::util::numerics::signum_or_one;

/// Relative size below which one of the two symmetrization terms is
/// treated as zero.
const NEGLIGIBLE: f64 = f64::EPSILON;

/// Plane rotation of the (`low`, `high`) coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// First rotated index
    pub low: usize,
    /// Second rotated index
    pub high: usize,
    /// Cosine of the rotation angle
    pub cos: f64,
    /// Sine of the rotation angle
    pub sin: f64,
}

impl Rotation {
    pub fn new(low: usize, high: usize, cos: f64, sin: f64) -> Self {
        Self { low, high, cos, sin }
    }

    /// The identity rotation on (`low`, `high`).
    pub fn identity(low: usize, high: usize) -> Self {
        Self::new(low, high, 1.0, 0.0)
    }

    /// The inverse (= transposed) rotation.
    pub fn invert(&self) -> Self {
        Self::new(self.low, self.high, self.cos, -self.sin)
    }

    /// Rotation `self` followed by `next`, i.e. `next * self` as matrices.
    ///
    /// Both must act on the same index pair.
    pub fn then(&self, next: &Rotation) -> Self {
        debug_assert_eq!((self.low, self.high), (next.low, next.high));
        Self::new(
            self.low,
            self.high,
            next.cos * self.cos - next.sin * self.sin,
            next.sin * self.cos + next.cos * self.sin,
        )
    }

    /// One step of a two-sided Jacobi sweep on the 2x2 block
    ///
    /// ```text
    /// A = [ a00  a01 ]
    ///     [ a10  a11 ]
    /// ```
    ///
    /// First a Givens rotation makes the block symmetric, then a Jacobi
    /// rotation annihilates the off-diagonal pair. Returns
    /// `[combined, jacobi]` where `combined` is the Givens rotation followed
    /// by the Jacobi one, such that `combined * A * jacobi^T` is diagonal.
    pub fn rotations_p(
        low: usize,
        high: usize,
        a00: f64,
        a01: f64,
        a10: f64,
        a11: f64,
    ) -> [Rotation; 2] {
        let x = a00 + a11;
        let y = a10 - a01;

        // Symmetrizing rotation: cos * y == sin * x
        let (cos, sin) = if y.abs() <= NEGLIGIBLE * x.abs() {
            (signum_or_one(x), 0.0)
        } else if x.abs() <= NEGLIGIBLE * y.abs() {
            (0.0, signum_or_one(y))
        } else if x.abs() > y.abs() {
            let t = y / x;
            let cos = signum_or_one(x) / (1.0 + t * t).sqrt();
            (cos, t * cos)
        } else {
            let t = x / y;
            let sin = signum_or_one(y) / (1.0 + t * t).sqrt();
            (t * sin, sin)
        };
        let givens = Rotation::new(low, high, cos, sin);

        // Symmetric block after the Givens rotation
        let s00 = cos * a00 + sin * a10;
        let s01 = cos * a01 + sin * a11;
        let s11 = -sin * a01 + cos * a11;

        let jacobi = if s01 == 0.0 {
            Rotation::identity(low, high)
        } else {
            let zeta = (s00 - s11) / (2.0 * s01);
            let t = signum_or_one(zeta) / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
            let cos = 1.0 / (1.0 + t * t).sqrt();
            Rotation::new(low, high, cos, t * cos)
        };

        [givens.then(&jacobi), jacobi]
    }
}

/// `target <- G * target`, touching rows `low` and `high` only.
pub fn rotate_left(target: &mut DMatrix<f64>, rotation: &Rotation) {
    let (lo, hi, c, s) = (rotation.low, rotation.high, rotation.cos, rotation.sin);
    for j in 0..target.ncols() {
        let a = target[(lo, j)];
        let b = target[(hi, j)];
        target[(lo, j)] = c * a + s * b;
        target[(hi, j)] = c * b - s * a;
    }
}

/// `target <- target * G^T`, touching columns `low` and `high` only.
pub fn rotate_right(target: &mut DMatrix<f64>, rotation: &Rotation) {
    let (lo, hi, c, s) = (rotation.low, rotation.high, rotation.cos, rotation.sin);
    for i in 0..target.nrows() {
        let a = target[(i, lo)];
        let b = target[(i, hi)];
        target[(i, lo)] = c * a + s * b;
        target[(i, hi)] = c * b - s * a;
    }
}

/// `target <- G * target` for a vector.
pub fn rotate_vector(target: &mut [f64], rotation: &Rotation) {
    let (lo, hi, c, s) = (rotation.low, rotation.high, rotation.cos, rotation.sin);
    let a = target[lo];
    let b = target[hi];
    target[lo] = c * a + s * b;
    target[hi] = c * b - s * a;
}

// G is orthogonal: G^-1 = G^T.
impl InvertibleFactor for Rotation {
    fn dim(&self) -> usize {
        self.low.max(self.high) + 1
    }

    fn ftran(&self, rhs: &mut [f64]) {
        rotate_vector(rhs, &self.invert());
    }

    fn btran(&self, rhs: &mut [f64]) {
        rotate_vector(rhs, self);
    }
}
