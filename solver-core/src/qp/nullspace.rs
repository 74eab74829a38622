//! Equality-constrained solver using a null-space basis of AE.
//!
//! With `AE^T P = [Q1 Q2] R`, the columns of Q2 span the null space of AE.
//! Any feasible point is `x_f + Q2 y`, which turns the problem into the
//! unconstrained reduced problem
//!
//! ```text
//! (Q2^T Q Q2) y = -Q2^T (Q x_f + C)
//! ```
//!
//! The equality multipliers follow from `AE^T LE = -(Q X + C)`, solved with
//! the same QR factorization.

use nalgebra::DVector;

use super::kkt::KktSystem;
use super::strategy::SolverStrategy;
use crate::error::{SolverError, SolverResult};
use crate::linalg::qr::PivotedQr;
use crate::linalg::svd::JacobiSvd;
use crate::problem::{QuadraticProblem, SolveStatus, SolverSettings, WarmStart};

#[derive(Debug, Clone)]
pub struct NullspaceSolver {
    kkt: KktSystem,
}

impl NullspaceSolver {
    pub fn new(problem: QuadraticProblem, settings: SolverSettings) -> Self {
        Self {
            kkt: KktSystem::new(problem, settings),
        }
    }

    fn fail_infeasible(&mut self, residual: f64) -> SolverError {
        log::debug!("equality constraints are inconsistent (residual {:.3e})", residual);
        self.kkt.reset_solution();
        self.kkt.set_state(SolveStatus::Infeasible);
        SolverError::InfeasibleEqualities { residual }
    }
}

impl SolverStrategy for NullspaceSolver {
    fn name(&self) -> &'static str {
        "nullspace"
    }

    fn kkt(&self) -> &KktSystem {
        &self.kkt
    }

    fn kkt_mut(&mut self) -> &mut KktSystem {
        &mut self.kkt
    }

    fn initialise(&mut self, _kick_start: Option<&WarmStart>) -> SolverResult<()> {
        Ok(())
    }

    fn needs_another_iteration(&mut self) -> bool {
        false
    }

    fn perform_iteration(&mut self) -> SolverResult<()> {
        let problem = self.kkt.problem();
        let context = self.kkt.settings().solution;

        let qr = PivotedQr::decompose(&problem.AE.transpose(), &context);
        let null_basis = qr.null_basis();

        let x_feasible = JacobiSvd::decompose(&problem.AE).solve_least_norm(&problem.BE, &context);
        let residual = problem.equality_residual(&x_feasible);
        if residual > self.kkt.equality_tolerance(&x_feasible) {
            return Err(self.fail_infeasible(residual));
        }

        let (x, state) = if null_basis.ncols() == 0 {
            (x_feasible, SolveStatus::Optimal)
        } else {
            let reduced = null_basis.tr_mul(&(&problem.Q * &null_basis));
            let gradient = &problem.Q * &x_feasible + &problem.C;
            let rhs = -null_basis.tr_mul(&gradient);

            match PivotedQr::decompose(&reduced, &context).solve(&rhs) {
                Some(y) => {
                    let x = &x_feasible + &null_basis * y;
                    let residual = problem.equality_residual(&x);
                    if residual > self.kkt.equality_tolerance(&x) {
                        log::warn!(
                            "null-space step broke AE x = BE (residual {:.3e}), keeping feasible point",
                            residual
                        );
                        (x_feasible, SolveStatus::Feasible)
                    } else {
                        (x, SolveStatus::Optimal)
                    }
                }
                None => {
                    log::debug!(
                        "reduced Hessian ({0}x{0}) is singular, returning feasible point",
                        reduced.nrows()
                    );
                    (x_feasible, SolveStatus::Feasible)
                }
            }
        };

        let minus_gradient: DVector<f64> = -(&problem.Q * &x + &problem.C);
        let le = qr.solve_basic(&minus_gradient);

        self.kkt.set_x(x);
        self.kkt.set_le(le);
        self.kkt.set_state(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qp::strategy;
    use nalgebra::DMatrix;

    fn simplex_problem() -> QuadraticProblem {
        QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2)).with_equalities(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_vec(vec![1.0]),
        )
    }

    #[test]
    fn test_projection_onto_line() {
        let mut solver = NullspaceSolver::new(simplex_problem(), SolverSettings::default());
        strategy::run(&mut solver, None).unwrap();
        let kkt = solver.kkt();
        assert_eq!(kkt.state(), SolveStatus::Optimal);
        assert!((kkt.x()[0] - 0.5).abs() < 1e-12);
        assert!((kkt.x()[1] - 0.5).abs() < 1e-12);
        // Q x + C + AE^T le = 0 gives le = -0.5
        assert!((kkt.le()[0] + 0.5).abs() < 1e-12);
        assert_eq!(kkt.iterations(), 1);
    }

    #[test]
    fn test_fully_determined() {
        let problem = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
            .with_equalities(
                DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 0.0]),
                DVector::from_vec(vec![1.0, 0.8]),
            );
        let mut solver = NullspaceSolver::new(problem.clone(), SolverSettings::default());
        strategy::run(&mut solver, None).unwrap();
        let kkt = solver.kkt();
        assert_eq!(kkt.state(), SolveStatus::Optimal);
        assert!((kkt.x()[0] - 0.8).abs() < 1e-12);
        assert!((kkt.x()[1] - 0.2).abs() < 1e-12);
        assert!(problem.stationarity_residual(kkt.x(), kkt.le(), kkt.li()) < 1e-12);
    }

    #[test]
    fn test_redundant_rows_get_zero_multiplier() {
        let problem = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
            .with_equalities(
                DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]),
                DVector::from_vec(vec![1.0, 2.0]),
            );
        let mut solver = NullspaceSolver::new(problem.clone(), SolverSettings::default());
        strategy::run(&mut solver, None).unwrap();
        let kkt = solver.kkt();
        assert_eq!(kkt.state(), SolveStatus::Optimal);
        assert!(kkt.le().iter().filter(|v| **v == 0.0).count() >= 1);
        assert!(problem.stationarity_residual(kkt.x(), kkt.le(), kkt.li()) < 1e-12);
    }

    #[test]
    fn test_inconsistent_equalities() {
        let problem = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
            .with_equalities(
                DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]),
                DVector::from_vec(vec![1.0, 2.0]),
            );
        let mut solver = NullspaceSolver::new(problem, SolverSettings::default());
        let err = strategy::run(&mut solver, None).unwrap_err();
        assert!(matches!(err, SolverError::InfeasibleEqualities { .. }));
        assert_eq!(solver.kkt().state(), SolveStatus::Infeasible);
        assert_eq!(solver.kkt().x().as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_flat_reduced_problem_is_feasible() {
        // Q = 0: every point on the line is equally good
        let problem = QuadraticProblem::new(DMatrix::zeros(2, 2), DVector::zeros(2))
            .with_equalities(
                DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
                DVector::from_vec(vec![1.0]),
            );
        let mut solver = NullspaceSolver::new(problem, SolverSettings::default());
        strategy::run(&mut solver, None).unwrap();
        assert_eq!(solver.kkt().state(), SolveStatus::Feasible);
        assert!((solver.kkt().x()[0] - 0.5).abs() < 1e-12);
    }
}
