//! Shared KKT state of the quadratic solvers.
//!
//! Every strategy owns one [`KktSystem`]: the problem data, the current
//! primal point X, the equality multipliers LE, the inequality multipliers
//! LI (indexed by original constraint, zero when inactive) and the solver
//! state. Multipliers follow the stationarity convention
//!
//! ```text
//! Q X + C + AE^T LE + AI^T LI = 0
//! ```
//!
//! so an active inequality `AI_i x >= BI_i` is dual feasible when
//! `LI_i <= 0`.

use nalgebra::linalg::{Cholesky, SymmetricEigen};
use nalgebra::DVector;

use crate::linalg::dense;
use crate::problem::{QuadraticProblem, SolveInfo, SolveResult, SolveStatus, SolverSettings};

/// Problem data plus the primal/dual iterate of a solver.
#[derive(Debug, Clone)]
pub struct KktSystem {
    problem: QuadraticProblem,
    settings: SolverSettings,
    x: DVector<f64>,
    le: DVector<f64>,
    li: DVector<f64>,
    state: SolveStatus,
    iterations: usize,
}

impl KktSystem {
    /// Wrap a problem; the iterate starts at zero in state `Unexplored`.
    pub fn new(problem: QuadraticProblem, settings: SolverSettings) -> Self {
        let x = DVector::zeros(problem.num_vars());
        let le = DVector::zeros(problem.num_equalities());
        let li = DVector::zeros(problem.num_inequalities());
        Self {
            problem,
            settings,
            x,
            le,
            li,
            state: SolveStatus::Unexplored,
            iterations: 0,
        }
    }

    pub fn problem(&self) -> &QuadraticProblem {
        &self.problem
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Current solution X.
    pub fn x(&self) -> &DVector<f64> {
        &self.x
    }

    /// Equality multipliers LE.
    pub fn le(&self) -> &DVector<f64> {
        &self.le
    }

    /// Inequality multipliers LI.
    pub fn li(&self) -> &DVector<f64> {
        &self.li
    }

    /// Inequality slack SI = AI X - BI.
    pub fn si(&self) -> DVector<f64> {
        self.problem.slack(&self.x)
    }

    pub fn state(&self) -> SolveStatus {
        self.state
    }

    pub fn set_state(&mut self, state: SolveStatus) {
        self.state = state;
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub(crate) fn increment_iterations(&mut self) {
        self.iterations += 1;
    }

    pub(crate) fn set_x(&mut self, x: DVector<f64>) {
        debug_assert_eq!(x.len(), self.x.len());
        self.x = x;
    }

    pub(crate) fn set_le(&mut self, le: DVector<f64>) {
        debug_assert_eq!(le.len(), self.le.len());
        self.le = le;
    }

    pub(crate) fn li_mut(&mut self) -> &mut DVector<f64> {
        &mut self.li
    }

    /// Zero the primal point and all multipliers.
    pub(crate) fn reset_solution(&mut self) {
        self.x.fill(0.0);
        self.le.fill(0.0);
        self.li.fill(0.0);
    }

    /// Check that Q is positive semidefinite.
    ///
    /// A successful Cholesky factorization settles it; otherwise the
    /// symmetric eigenvalues are inspected and any eigenvalue below
    /// `-tol * max(1, max |λ|)` makes the problem `Invalid`.
    pub fn validate(&mut self) -> bool {
        let q = &self.problem.Q;
        if q.nrows() == 0 || Cholesky::new(q.clone()).is_some() {
            self.state = SolveStatus::Valid;
            return true;
        }

        let eigenvalues = SymmetricEigen::new(q.clone()).eigenvalues;
        let largest = eigenvalues.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
        let smallest = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        let tolerance = self.settings.solution.threshold(largest);

        if smallest < -tolerance {
            log::info!(
                "Q is not positive semidefinite (min eigenvalue {:.3e}), problem is invalid",
                smallest
            );
            self.state = SolveStatus::Invalid;
            false
        } else {
            log::debug!("Q is singular but positive semidefinite (min eigenvalue {:.3e})", smallest);
            self.state = SolveStatus::Valid;
            true
        }
    }

    /// Magnitude used to decide when a multiplier is "zero": the size of
    /// the objective gradient at X.
    pub fn multiplier_scale(&self) -> f64 {
        let gradient = &self.problem.Q * &self.x + &self.problem.C;
        1.0 + dense::max_abs_vec(&gradient)
    }

    /// Threshold below which slack of inequality `i` counts as zero.
    pub fn slack_tolerance(&self, i: usize) -> f64 {
        self.settings.feasibility.threshold(1.0 + self.problem.BI[i].abs())
    }

    /// Threshold for the equality residual at `x`.
    pub fn equality_tolerance(&self, x: &DVector<f64>) -> f64 {
        let scale = 1.0
            + dense::max_abs_vec(&self.problem.BE)
                .max(dense::max_abs(&self.problem.AE) * dense::max_abs_vec(x));
        self.settings.feasibility.threshold(scale)
    }

    /// X satisfies every constraint within tolerance.
    pub fn is_primal_feasible(&self) -> bool {
        if self.problem.equality_residual(&self.x) > self.equality_tolerance(&self.x) {
            return false;
        }
        self.si()
            .iter()
            .enumerate()
            .all(|(i, &s)| s >= -self.slack_tolerance(i))
    }

    /// Snapshot the iterate as a [`SolveResult`].
    pub fn build_result(&self, active: Vec<usize>) -> SolveResult {
        let slack = self.si();
        let inequality_violation = slack.iter().fold(0.0_f64, |acc, &s| acc.max(-s));
        SolveResult {
            status: self.state,
            x: self.x.as_slice().to_vec(),
            le: self.le.as_slice().to_vec(),
            li: self.li.as_slice().to_vec(),
            slack: slack.as_slice().to_vec(),
            active,
            obj_val: self.problem.objective(&self.x),
            info: SolveInfo {
                iters: self.iterations,
                max_iter: 0,
                solve_time_ms: 0,
                stationarity: self.problem.stationarity_residual(&self.x, &self.le, &self.li),
                equality_residual: self.problem.equality_residual(&self.x),
                inequality_violation,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn system(q: DMatrix<f64>) -> KktSystem {
        let n = q.nrows();
        KktSystem::new(QuadraticProblem::new(q, DVector::zeros(n)), SolverSettings::default())
    }

    #[test]
    fn test_validate_positive_definite() {
        let mut kkt = system(DMatrix::identity(3, 3));
        assert!(kkt.validate());
        assert_eq!(kkt.state(), SolveStatus::Valid);
    }

    #[test]
    fn test_validate_semidefinite_via_eigen() {
        let mut kkt = system(DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]));
        assert!(kkt.validate());
        assert_eq!(kkt.state(), SolveStatus::Valid);

        let mut kkt = system(DMatrix::zeros(2, 2));
        assert!(kkt.validate());
    }

    #[test]
    fn test_validate_rejects_indefinite() {
        let mut kkt = system(DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]));
        assert!(!kkt.validate());
        assert_eq!(kkt.state(), SolveStatus::Invalid);
    }

    #[test]
    fn test_feasibility_check() {
        let prob = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
            .with_inequalities(
                DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
                DVector::from_vec(vec![0.5]),
            );
        let mut kkt = KktSystem::new(prob, SolverSettings::default());
        assert!(!kkt.is_primal_feasible());
        kkt.set_x(DVector::from_vec(vec![0.5, 0.0]));
        assert!(kkt.is_primal_feasible());
        assert!(kkt.si()[0].abs() < 1e-15);

        let result = kkt.build_result(vec![0]);
        assert_eq!(result.active, vec![0]);
        assert_eq!(result.info.inequality_violation, 0.0);
        assert!((result.obj_val - 0.125).abs() < 1e-15);
    }
}
