//! Problem data structures, settings and results.
//!
//! This module defines the canonical quadratic program representation and
//! everything a caller passes in or gets back.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::linalg::dense;
use crate::linalg::sparse::{self, SparseCsc};
use crate::util::numerics::NumberContext;

/// Quadratic program in the canonical form
///
/// ```text
/// minimize    (1/2) x^T Q x + C^T x
/// subject to  AE x  = BE
///             AI x >= BI
/// ```
///
/// # Dimensions
///
/// - `n`: number of variables (length of C)
/// - Q: n × n, symmetric positive semidefinite
/// - AE: m_e × n, BE: m_e
/// - AI: m_i × n, BI: m_i
///
/// Absent constraint blocks have zero rows.
#[derive(Debug, Clone)]
#[allow(non_snake_case)] // Q, C, AE, ... are standard mathematical notation
pub struct QuadraticProblem {
    /// Quadratic cost matrix Q (n × n, PSD)
    pub Q: DMatrix<f64>,

    /// Linear cost vector C (length n)
    pub C: DVector<f64>,

    /// Equality constraint matrix AE (m_e × n)
    pub AE: DMatrix<f64>,

    /// Equality right-hand side BE (length m_e)
    pub BE: DVector<f64>,

    /// Inequality constraint matrix AI (m_i × n)
    pub AI: DMatrix<f64>,

    /// Inequality right-hand side BI (length m_i)
    pub BI: DVector<f64>,
}

#[allow(non_snake_case)]
impl QuadraticProblem {
    /// Unconstrained problem `min (1/2) x^T Q x + C^T x`.
    pub fn new(Q: DMatrix<f64>, C: DVector<f64>) -> Self {
        let n = C.len();
        Self {
            Q,
            C,
            AE: DMatrix::zeros(0, n),
            BE: DVector::zeros(0),
            AI: DMatrix::zeros(0, n),
            BI: DVector::zeros(0),
        }
    }

    /// Build from a sparse (CSC) Q, storing either triangle or both.
    ///
    /// When only one triangle is stored it is mirrored.
    pub fn from_sparse(Q: &SparseCsc, C: &[f64]) -> Self {
        let mut q = sparse::to_dense(Q);
        let n = q.nrows();
        let upper_only = (0..n).all(|j| (j + 1..n).all(|i| q[(i, j)] == 0.0));
        let lower_only = (0..n).all(|j| (0..j).all(|i| q[(i, j)] == 0.0));
        if upper_only && !lower_only {
            q.fill_lower_triangle_with_upper_triangle();
        } else if lower_only && !upper_only {
            q.fill_upper_triangle_with_lower_triangle();
        }
        Self::new(q, DVector::from_column_slice(C))
    }

    /// Set the equality block `AE x = BE`.
    pub fn with_equalities(mut self, AE: DMatrix<f64>, BE: DVector<f64>) -> Self {
        self.AE = AE;
        self.BE = BE;
        self
    }

    /// Set the inequality block `AI x >= BI`.
    pub fn with_inequalities(mut self, AI: DMatrix<f64>, BI: DVector<f64>) -> Self {
        self.AI = AI;
        self.BI = BI;
        self
    }

    /// Set the equality block from a sparse matrix.
    pub fn with_sparse_equalities(self, AE: &SparseCsc, BE: &[f64]) -> Self {
        self.with_equalities(sparse::to_dense(AE), DVector::from_column_slice(BE))
    }

    /// Set the inequality block from a sparse matrix.
    pub fn with_sparse_inequalities(self, AI: &SparseCsc, BI: &[f64]) -> Self {
        self.with_inequalities(sparse::to_dense(AI), DVector::from_column_slice(BI))
    }

    /// Number of variables (n)
    pub fn num_vars(&self) -> usize {
        self.C.len()
    }

    /// Number of equality constraints (m_e)
    pub fn num_equalities(&self) -> usize {
        self.BE.len()
    }

    /// Number of inequality constraints (m_i)
    pub fn num_inequalities(&self) -> usize {
        self.BI.len()
    }

    /// Validate dimensions, finiteness and symmetry of Q.
    pub fn validate(&self) -> SolverResult<()> {
        let n = self.num_vars();

        check_dim("Q rows", n, self.Q.nrows())?;
        check_dim("Q cols", n, self.Q.ncols())?;
        check_dim("AE rows", self.BE.len(), self.AE.nrows())?;
        check_dim("AE cols", n, self.AE.ncols())?;
        check_dim("AI rows", self.BI.len(), self.AI.nrows())?;
        check_dim("AI cols", n, self.AI.ncols())?;

        let finite = self.Q.iter().all(|v| v.is_finite())
            && self.C.iter().all(|v| v.is_finite())
            && self.AE.iter().all(|v| v.is_finite())
            && self.BE.iter().all(|v| v.is_finite())
            && self.AI.iter().all(|v| v.is_finite())
            && self.BI.iter().all(|v| v.is_finite());
        if !finite {
            return Err(SolverError::InvalidProblem(
                "problem data contains NaN or infinite entries".to_string(),
            ));
        }

        let asymmetry = dense::max_asymmetry(&self.Q);
        if asymmetry > 1e-10 * dense::max_abs(&self.Q).max(1.0) {
            return Err(SolverError::InvalidProblem(format!(
                "Q is not symmetric (max |Q_ij - Q_ji| = {:.3e})",
                asymmetry
            )));
        }

        Ok(())
    }

    /// Objective value (1/2) x^T Q x + C^T x.
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * x.dot(&(&self.Q * x)) + self.C.dot(x)
    }

    /// Inequality slack AI x - BI (negative entries are violated).
    pub fn slack(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.AI * x - &self.BI
    }

    /// Max-norm of AE x - BE.
    pub fn equality_residual(&self, x: &DVector<f64>) -> f64 {
        dense::max_abs_vec(&(&self.AE * x - &self.BE))
    }

    /// Max-norm of the stationarity residual Q x + C + AE^T le + AI^T li.
    pub fn stationarity_residual(
        &self,
        x: &DVector<f64>,
        le: &DVector<f64>,
        li: &DVector<f64>,
    ) -> f64 {
        let r = &self.Q * x + &self.C + self.AE.tr_mul(le) + self.AI.tr_mul(li);
        dense::max_abs_vec(&r)
    }
}

fn check_dim(what: &'static str, expected: usize, actual: usize) -> SolverResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(SolverError::DimensionMismatch { what, expected, actual })
    }
}

/// Optional warm-start data.
#[derive(Debug, Clone, Default)]
pub struct WarmStart {
    /// Previous solution x (length n)
    pub x: Option<Vec<f64>>,
    /// Previously active inequality indices
    pub active: Option<Vec<usize>>,
}

impl From<&SolveResult> for WarmStart {
    fn from(result: &SolveResult) -> Self {
        Self {
            x: Some(result.x.clone()),
            active: Some(result.active.clone()),
        }
    }
}

/// Solver settings and parameters.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    /// Iteration cap; `None` derives it from the problem size
    pub max_iter: Option<usize>,

    /// Print a summary table to stdout
    pub verbose: bool,

    /// Tolerances for constraint satisfaction (AE x = BE, slack signs)
    pub feasibility: NumberContext,

    /// Tolerances for solution quantities (multiplier signs, residuals)
    pub solution: NumberContext,

    /// Optional warm start (previous active set and/or x)
    pub warm_start: Option<WarmStart>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        // Environment overrides, e.g. QPSET_MAX_ITER=50 QPSET_TOL_FEAS=1e-6
        let max_iter = std::env::var("QPSET_MAX_ITER")
            .ok()
            .and_then(|s| s.parse::<usize>().ok());
        let verbose = std::env::var("QPSET_VERBOSE")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(false);
        let tol_feas = std::env::var("QPSET_TOL_FEAS")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| *v > 0.0)
            .unwrap_or(1e-9);

        Self {
            max_iter,
            verbose,
            feasibility: NumberContext::new(tol_feas, 1e-14),
            solution: NumberContext::new(1e-10, 1e-14),
            warm_start: None,
        }
    }
}

impl SolverSettings {
    /// Iteration budget for a problem with `rows` constraints and `cols`
    /// variables: `(9 + sqrt(max(rows, cols)))^2` unless overridden.
    pub fn iterations_abort(&self, rows: usize, cols: usize) -> usize {
        self.max_iter.unwrap_or_else(|| {
            let size = rows.max(cols) as f64;
            let root = 9.0 + size.sqrt();
            (root * root) as usize
        })
    }
}

/// Solver state.
///
/// A fresh solver is `Unexplored`; validation moves it to `Valid` or
/// `Invalid`; iterating ends in one of the remaining states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Nothing attempted yet
    Unexplored,

    /// Problem data checked and convex
    Valid,

    /// Q is not positive semidefinite
    Invalid,

    /// Iteration budget exhausted at an infeasible point
    Failed,

    /// No feasible point exists
    Infeasible,

    /// The objective is unbounded below
    Unbounded,

    /// Feasible, optimality not fully confirmed
    Approximate,

    /// Feasible, not optimal
    Feasible,

    /// Optimal
    Optimal,

    /// Optimal and the optimum is unique
    Distinct,
}

impl SolveStatus {
    /// `Optimal` or `Distinct`.
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Distinct)
    }

    /// Any state carrying a primal feasible point.
    pub fn is_feasible(&self) -> bool {
        matches!(
            self,
            SolveStatus::Feasible
                | SolveStatus::Approximate
                | SolveStatus::Optimal
                | SolveStatus::Distinct
        )
    }

    /// States after which no iteration makes sense.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SolveStatus::Invalid
                | SolveStatus::Failed
                | SolveStatus::Infeasible
                | SolveStatus::Unbounded
        )
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Unexplored => write!(f, "Unexplored"),
            SolveStatus::Valid => write!(f, "Valid"),
            SolveStatus::Invalid => write!(f, "Invalid"),
            SolveStatus::Failed => write!(f, "Failed"),
            SolveStatus::Infeasible => write!(f, "Infeasible"),
            SolveStatus::Unbounded => write!(f, "Unbounded"),
            SolveStatus::Approximate => write!(f, "Approximate"),
            SolveStatus::Feasible => write!(f, "Feasible"),
            SolveStatus::Optimal => write!(f, "Optimal"),
            SolveStatus::Distinct => write!(f, "Distinct"),
        }
    }
}

/// Solve result with solution, multipliers and diagnostics.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Solution status
    pub status: SolveStatus,

    /// Primal solution x (length n)
    pub x: Vec<f64>,

    /// Equality multipliers LE (length m_e)
    pub le: Vec<f64>,

    /// Inequality multipliers LI (length m_i, zero for inactive rows)
    pub li: Vec<f64>,

    /// Inequality slack AI x - BI (length m_i)
    pub slack: Vec<f64>,

    /// Active inequality indices, increasing
    pub active: Vec<usize>,

    /// Objective value at x
    pub obj_val: f64,

    /// Detailed solve information and diagnostics
    pub info: SolveInfo,
}

/// Detailed solve information and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SolveInfo {
    /// Number of iterations performed
    pub iters: usize,

    /// Iteration budget that applied
    pub max_iter: usize,

    /// Total solve time (milliseconds)
    pub solve_time_ms: u64,

    /// Max-norm of Q x + C + AE^T le + AI^T li
    pub stationarity: f64,

    /// Max-norm of AE x - BE
    pub equality_residual: f64,

    /// Largest inequality violation max(0, -min slack)
    pub inequality_violation: f64,
}
