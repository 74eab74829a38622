//! Error types for the quadratic solvers.

use thiserror::Error;

/// Errors that can occur while building or solving a quadratic program.
///
/// Infeasibility is always reported through this type; reportable outcomes
/// such as an unbounded or non-convex problem are statuses on
/// [`crate::SolveResult`] instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Operand dimensions do not agree
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which operand was inconsistent
        what: &'static str,
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Problem data is malformed (non-finite entries, non-symmetric Q, ...)
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// The equality constraints AE x = BE have no solution
    #[error("Equality constraints are infeasible (residual {residual:.3e})")]
    InfeasibleEqualities {
        /// Max-norm of AE x - BE at the least-norm point
        residual: f64,
    },

    /// No point satisfies all equality and inequality constraints
    #[error("Problem is infeasible")]
    Infeasible,

    /// A decomposition broke down in a way the solver cannot recover from
    #[error("Numerical failure: {0}")]
    Numerical(String),
}

/// Result type for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;
