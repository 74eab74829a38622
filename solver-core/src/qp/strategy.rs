//! Solver strategies and the driver loop.
//!
//! A strategy exposes the steps of one solve (validate, initialise, iterate,
//! test for another iteration, build the result); [`run`] calls them in a
//! fixed order and enforces the iteration budget. [`QuadraticStrategy`]
//! picks the strategy matching the constraints a problem has.

use std::time::Instant;

use nalgebra::DVector;

use super::active_set::ActiveSetSolver;
use super::kkt::KktSystem;
use super::nullspace::NullspaceSolver;
use super::unconstrained::UnconstrainedSolver;
use crate::error::{SolverError, SolverResult};
use crate::problem::{QuadraticProblem, SolveResult, SolveStatus, SolverSettings, WarmStart};

/// The steps of a solve, driven by [`run`].
pub trait SolverStrategy {
    /// Short name used in logs and the verbose header.
    fn name(&self) -> &'static str;

    fn kkt(&self) -> &KktSystem;

    fn kkt_mut(&mut self) -> &mut KktSystem;

    /// Check convexity; `false` leaves the state `Invalid`.
    fn validate(&mut self) -> bool {
        self.kkt_mut().validate()
    }

    /// Prepare for the first iteration, optionally from a warm start.
    fn initialise(&mut self, kick_start: Option<&WarmStart>) -> SolverResult<()>;

    /// Whether the last iteration left work to do. May update the state and
    /// working set; calling it again without iterating gives the same answer.
    fn needs_another_iteration(&mut self) -> bool;

    fn perform_iteration(&mut self) -> SolverResult<()>;

    /// Active inequality indices.
    fn active_set(&self) -> Vec<usize> {
        Vec::new()
    }

    fn state(&self) -> SolveStatus {
        self.kkt().state()
    }

    fn iterations(&self) -> usize {
        self.kkt().iterations()
    }

    fn extract_solution(&self) -> DVector<f64> {
        self.kkt().x().clone()
    }

    fn build_result(&self) -> SolveResult {
        self.kkt().build_result(self.active_set())
    }
}

/// Strategy selected from the shape of a problem.
#[derive(Debug, Clone)]
pub enum QuadraticStrategy {
    /// No constraints
    Unconstrained(UnconstrainedSolver),
    /// Equality constraints only
    Nullspace(NullspaceSolver),
    /// Inequality constraints, with or without equalities
    ActiveSet(ActiveSetSolver),
}

impl QuadraticStrategy {
    pub fn for_problem(problem: QuadraticProblem, settings: SolverSettings) -> Self {
        if problem.num_inequalities() > 0 {
            QuadraticStrategy::ActiveSet(ActiveSetSolver::new(problem, settings))
        } else if problem.num_equalities() > 0 {
            QuadraticStrategy::Nullspace(NullspaceSolver::new(problem, settings))
        } else {
            QuadraticStrategy::Unconstrained(UnconstrainedSolver::new(problem, settings))
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $solver:ident => $body:expr) => {
        match $self {
            QuadraticStrategy::Unconstrained($solver) => $body,
            QuadraticStrategy::Nullspace($solver) => $body,
            QuadraticStrategy::ActiveSet($solver) => $body,
        }
    };
}

impl SolverStrategy for QuadraticStrategy {
    fn name(&self) -> &'static str {
        dispatch!(self, s => s.name())
    }

    fn kkt(&self) -> &KktSystem {
        dispatch!(self, s => s.kkt())
    }

    fn kkt_mut(&mut self) -> &mut KktSystem {
        dispatch!(self, s => s.kkt_mut())
    }

    fn validate(&mut self) -> bool {
        dispatch!(self, s => s.validate())
    }

    fn initialise(&mut self, kick_start: Option<&WarmStart>) -> SolverResult<()> {
        dispatch!(self, s => s.initialise(kick_start))
    }

    fn needs_another_iteration(&mut self) -> bool {
        dispatch!(self, s => s.needs_another_iteration())
    }

    fn perform_iteration(&mut self) -> SolverResult<()> {
        dispatch!(self, s => s.perform_iteration())
    }

    fn active_set(&self) -> Vec<usize> {
        dispatch!(self, s => s.active_set())
    }
}

/// Validate, initialise, iterate and collect the result.
///
/// Infeasibility is returned as an error; every other outcome, including
/// `Invalid` and `Unbounded`, is a status on the result.
pub fn run<S: SolverStrategy + ?Sized>(
    strategy: &mut S,
    kick_start: Option<&WarmStart>,
) -> SolverResult<SolveResult> {
    let start = Instant::now();

    if !strategy.validate() {
        let mut result = strategy.build_result();
        result.info.solve_time_ms = start.elapsed().as_millis() as u64;
        return Ok(result);
    }

    let budget = iterate(strategy, kick_start)?;

    let mut result = strategy.build_result();
    result.info.max_iter = budget;
    result.info.solve_time_ms = start.elapsed().as_millis() as u64;

    if strategy.kkt().settings().verbose {
        println!("{}", "-".repeat(60));
        println!("Status: {}", result.status);
        println!("Iterations: {}", result.info.iters);
        println!("Objective: {:.8e}", result.obj_val);
        println!(
            "Residuals: stationarity {:.3e}, equality {:.3e}, inequality {:.3e}",
            result.info.stationarity, result.info.equality_residual, result.info.inequality_violation
        );
        println!();
    }

    log::info!(
        "solve finished: {} after {} iterations (obj = {:.6e})",
        result.status,
        result.info.iters,
        result.obj_val
    );
    Ok(result)
}

/// The iteration loop without validation. Returns the budget that applied.
pub(crate) fn iterate<S: SolverStrategy + ?Sized>(
    strategy: &mut S,
    kick_start: Option<&WarmStart>,
) -> SolverResult<usize> {
    strategy.initialise(kick_start)?;

    let (rows, cols) = {
        let problem = strategy.kkt().problem();
        (problem.num_equalities() + problem.num_inequalities(), problem.num_vars())
    };
    let budget = strategy.kkt().settings().iterations_abort(rows, cols);
    let verbose = strategy.kkt().settings().verbose;

    if verbose {
        println!("qpset {} solver", strategy.name());
        println!("Problem: n = {}, constraints = {}, budget = {}", cols, rows, budget);
        println!();
        println!("{:>4} {:>12} {:>14} {:>12} {:>8}", "Iter", "State", "Objective", "Infeas", "Active");
        println!("{}", "-".repeat(60));
    }

    loop {
        strategy.perform_iteration()?;
        strategy.kkt_mut().increment_iterations();

        if strategy.kkt().x().iter().any(|v| !v.is_finite()) {
            strategy.kkt_mut().set_state(SolveStatus::Failed);
            return Err(SolverError::Numerical(format!(
                "non-finite iterate after iteration {}",
                strategy.iterations()
            )));
        }

        let iter = strategy.iterations();
        if verbose {
            let kkt = strategy.kkt();
            let infeas = kkt.si().iter().fold(0.0_f64, |acc, &s| acc.max(-s));
            println!(
                "{:4} {:>12} {:14.6e} {:12.4e} {:8}",
                iter,
                kkt.state().to_string(),
                kkt.problem().objective(kkt.x()),
                infeas,
                strategy.active_set().len()
            );
        }
        log::debug!("iteration {}: state {}", iter, strategy.state());

        if !strategy.needs_another_iteration() {
            break;
        }

        if iter >= budget {
            let kkt = strategy.kkt_mut();
            let state = if kkt.is_primal_feasible() {
                SolveStatus::Approximate
            } else {
                SolveStatus::Failed
            };
            log::warn!("iteration budget of {} exhausted, stopping as {}", budget, state);
            kkt.set_state(state);
            break;
        }
    }

    Ok(budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn test_strategy_selection() {
        let base = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2));
        let settings = SolverSettings::default();

        let s = QuadraticStrategy::for_problem(base.clone(), settings.clone());
        assert_eq!(s.name(), "unconstrained");

        let eq = base.clone().with_equalities(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_vec(vec![1.0]),
        );
        let s = QuadraticStrategy::for_problem(eq.clone(), settings.clone());
        assert_eq!(s.name(), "nullspace");

        let ineq = eq.with_inequalities(DMatrix::identity(2, 2), DVector::zeros(2));
        let s = QuadraticStrategy::for_problem(ineq, settings);
        assert_eq!(s.name(), "active-set");
    }

    #[test]
    fn test_dispatch_reports_solver_name() {
        let eq = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2)).with_equalities(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_vec(vec![1.0]),
        );
        let settings = SolverSettings::default();
        let s = QuadraticStrategy::for_problem(eq.clone(), settings.clone());
        assert_eq!(s.name(), NullspaceSolver::new(eq.clone(), settings.clone()).name());
        assert_eq!(ActiveSetSolver::new(eq, settings).name(), "active-set");
    }

    #[test]
    fn test_invalid_problem_is_not_iterated() {
        let q = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -2.0]);
        let problem = QuadraticProblem::new(q, DVector::zeros(2));
        let mut s = QuadraticStrategy::for_problem(problem, SolverSettings::default());
        let result = run(&mut s, None).unwrap();
        assert_eq!(result.status, SolveStatus::Invalid);
        assert_eq!(result.info.iters, 0);
    }

    #[test]
    fn test_budget_exhaustion() {
        // Needs two iterations: the first sub-problem violates x1 >= 0.8
        let problem = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
            .with_equalities(
                DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
                DVector::from_vec(vec![1.0]),
            )
            .with_inequalities(
                DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
                DVector::from_vec(vec![0.8]),
            );
        let settings = SolverSettings { max_iter: Some(1), ..Default::default() };
        let mut s = QuadraticStrategy::for_problem(problem, settings);
        let result = run(&mut s, None).unwrap();
        assert_eq!(result.status, SolveStatus::Failed);
        assert_eq!(result.info.iters, 1);
        assert_eq!(result.info.max_iter, 1);
        assert!(result.info.inequality_violation > 0.29);
    }

    #[test]
    fn test_extract_solution() {
        let problem = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::from_vec(vec![2.0, -1.0]));
        let mut s = QuadraticStrategy::for_problem(problem, SolverSettings::default());
        run(&mut s, None).unwrap();
        assert_eq!(s.state(), SolveStatus::Distinct);
        assert_eq!(s.iterations(), 1);
        let x = s.extract_solution();
        assert!((x[0] + 2.0).abs() < 1e-14 && (x[1] - 1.0).abs() < 1e-14);
    }
}
