//! qpset: dense convex quadratic programming with an active-set method
//!
//! Solves problems of the form
//!
//! ```text
//! minimize    (1/2) x^T Q x + C^T x
//! subject to  AE x  = BE
//!             AI x >= BI
//! ```
//!
//! with Q symmetric positive semidefinite. The solver family is:
//!
//! - **Unconstrained**: Cholesky of Q, eigen pseudo-inverse when Q is singular
//! - **Nullspace**: equality constraints eliminated through a pivoted QR of AE^T
//! - **Active set**: working-set iterations over the inequalities, each one an
//!   equality constrained sub-problem
//!
//! The linear algebra layer ([`linalg`]) carries the elementary transforms the
//! solvers are built on: Householder reflections, plane rotations, eta
//! (elementary) factors and their product form.
//!
//! # Multiplier signs
//!
//! Results satisfy `Q x + C + AE^T le + AI^T li = 0`. An active inequality
//! has `li <= 0`, an inactive one has `li = 0`.
//!
//! # Example
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use qpset_core::{solve, QuadraticProblem, SolverSettings, SolveStatus};
//!
//! // min (1/2)|x|^2  s.t.  x1 + x2 = 1, x1 >= 0.8
//! let prob = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
//!     .with_equalities(DMatrix::from_row_slice(1, 2, &[1.0, 1.0]), DVector::from_vec(vec![1.0]))
//!     .with_inequalities(DMatrix::from_row_slice(1, 2, &[1.0, 0.0]), DVector::from_vec(vec![0.8]));
//!
//! let result = solve(&prob, &SolverSettings::default()).unwrap();
//! assert_eq!(result.status, SolveStatus::Optimal);
//! assert_eq!(result.active, vec![0]);
//! assert!((result.x[0] - 0.8).abs() < 1e-9);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(non_snake_case)] // Q, C, AE, BE, AI, BI

pub mod error;
pub mod linalg;
pub mod problem;
pub mod qp;
pub mod util;

// Re-export main types
pub use error::{SolverError, SolverResult};
pub use problem::{
    QuadraticProblem, SolveInfo, SolveResult, SolveStatus, SolverSettings, WarmStart,
};
pub use qp::{ActiveSetSolver, NullspaceSolver, QuadraticStrategy, SolverStrategy, UnconstrainedSolver};

/// Main solve entry point.
///
/// Checks the problem dimensions, picks a strategy from the constraints
/// present and runs it, warm starting from `settings.warm_start` when set.
///
/// Infeasible problems return [`SolverError::InfeasibleEqualities`] (the
/// equality constraints alone are inconsistent and there are no
/// inequalities) or [`SolverError::Infeasible`]. A non-convex Q gives an
/// `Ok` result with status [`SolveStatus::Invalid`].
pub fn solve(problem: &QuadraticProblem, settings: &SolverSettings) -> SolverResult<SolveResult> {
    problem.validate()?;

    let mut strategy = QuadraticStrategy::for_problem(problem.clone(), settings.clone());
    log::debug!(
        "solving with {} strategy: n = {}, m_e = {}, m_i = {}",
        strategy.name(),
        problem.num_vars(),
        problem.num_equalities(),
        problem.num_inequalities()
    );

    qp::strategy::run(&mut strategy, settings.warm_start.as_ref())
}
