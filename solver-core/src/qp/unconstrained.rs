//! Solver for problems without constraints.

use nalgebra::linalg::{Cholesky, SymmetricEigen};
use nalgebra::{DMatrix, DVector};

use super::kkt::KktSystem;
use super::strategy::SolverStrategy;
use crate::error::SolverResult;
use crate::linalg::dense;
use crate::problem::{QuadraticProblem, SolveStatus, SolverSettings, WarmStart};
use crate::util::numerics::NumberContext;

/// Minimizes `(1/2) x^T Q x + C^T x` in a single step.
///
/// Positive definite Q gives the unique minimizer `-Q^{-1} C`. A singular Q
/// falls back to the eigen pseudo-inverse, which is accepted when it
/// actually zeroes the gradient; otherwise the problem is unbounded.
#[derive(Debug, Clone)]
pub struct UnconstrainedSolver {
    kkt: KktSystem,
}

impl UnconstrainedSolver {
    pub fn new(problem: QuadraticProblem, settings: SolverSettings) -> Self {
        Self {
            kkt: KktSystem::new(problem, settings),
        }
    }
}

impl SolverStrategy for UnconstrainedSolver {
    fn name(&self) -> &'static str {
        "unconstrained"
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
        self.kkt.iterations() == 0
    }

    fn perform_iteration(&mut self) -> SolverResult<()> {
        let problem = self.kkt.problem();
        let rhs = -&problem.C;

        if let Some(cholesky) = Cholesky::new(problem.Q.clone()) {
            let x = cholesky.solve(&rhs);
            self.kkt.set_x(x);
            self.kkt.set_state(SolveStatus::Distinct);
            return Ok(());
        }

        let eigen = SymmetricEigen::new(problem.Q.clone());
        let x = pseudo_solve(&eigen, &rhs, &self.kkt.settings().solution);

        let gradient = &problem.Q * &x + &problem.C;
        let scale = 1.0 + dense::max_abs_vec(&problem.C);
        let residual = dense::max_abs_vec(&gradient);

        if self.kkt.settings().feasibility.is_small(scale, residual) {
            log::debug!("singular Q, eigen fallback accepted (residual {:.3e})", residual);
            self.kkt.set_x(x);
            self.kkt.set_state(SolveStatus::Optimal);
        } else {
            log::debug!("singular Q, gradient outside range of Q (residual {:.3e})", residual);
            self.kkt.reset_solution();
            self.kkt.set_state(SolveStatus::Unbounded);
        }
        Ok(())
    }
}

fn eigen_cutoff(eigen: &SymmetricEigen<f64, nalgebra::Dyn>, context: &NumberContext) -> f64 {
    let largest = eigen.eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    context.threshold(largest)
}

/// `x = sum over non-negligible λ_i of v_i (v_i^T b) / λ_i`.
fn pseudo_solve(
    eigen: &SymmetricEigen<f64, nalgebra::Dyn>,
    rhs: &DVector<f64>,
    context: &NumberContext,
) -> DVector<f64> {
    let cutoff = eigen_cutoff(eigen, context);

    let mut x = DVector::zeros(rhs.len());
    for (i, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda.abs() <= cutoff {
            continue;
        }
        let v = eigen.eigenvectors.column(i);
        x.axpy(v.dot(rhs) / lambda, &v, 1.0);
    }
    x
}

/// Projection of `-C` onto the null space of Q.
///
/// Along this direction the objective decreases linearly without bound, so
/// it is zero exactly when the unconstrained problem has a minimizer.
pub(crate) fn recession_direction(
    q: &DMatrix<f64>,
    c: &DVector<f64>,
    context: &NumberContext,
) -> DVector<f64> {
    let eigen = SymmetricEigen::new(q.clone());
    let cutoff = eigen_cutoff(&eigen, context);

    let mut d = DVector::zeros(c.len());
    for (i, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda.abs() > cutoff {
            continue;
        }
        let v = eigen.eigenvectors.column(i);
        d.axpy(-v.dot(c), &v, 1.0);
    }
    d
}
