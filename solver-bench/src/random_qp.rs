//! Seeded random convex QPs with a known strictly feasible point.

use nalgebra::{DMatrix, DVector};
use qpset_core::QuadraticProblem;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Shape of a generated problem.
#[derive(Debug, Clone, Copy)]
pub struct RandomQpConfig {
    pub n: usize,
    pub eq: usize,
    pub ineq: usize,
    pub seed: u64,
}

/// Generate
///
/// ```text
/// minimize    (1/2) x^T (M^T M + 0.1 I) x + c^T x
/// subject to  AE x  = AE x0
///             AI x >= AI x0 - margin
/// ```
///
/// with entries uniform in [-1, 1] and margins in [0.1, 1], so `x0` is
/// strictly feasible. Returns the problem and `x0`.
pub fn generate(config: &RandomQpConfig) -> (QuadraticProblem, DVector<f64>) {
    let RandomQpConfig { n, eq, ineq, seed } = *config;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
    let q = m.transpose() * &m + DMatrix::identity(n, n) * 0.1;
    let c = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));

    let x0 = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));
    let ae = DMatrix::from_fn(eq, n, |_, _| rng.gen_range(-1.0..1.0));
    let be = &ae * &x0;
    let ai = DMatrix::from_fn(ineq, n, |_, _| rng.gen_range(-1.0..1.0));
    let margin = DVector::from_fn(ineq, |_, _| rng.gen_range(0.1..1.0));
    let bi = &ai * &x0 - margin;

    let prob = QuadraticProblem::new(q, c)
        .with_equalities(ae, be)
        .with_inequalities(ai, bi);
    (prob, x0)
}
