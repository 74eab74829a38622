//! Primal active-set method for inequality-constrained problems.
//!
//! Each iteration treats the working set of inequalities as equalities and
//! solves the resulting equality-constrained sub-problem. Between
//! iterations the working set is updated from two signals:
//!
//! - an active inequality whose multiplier has the wrong sign (`LI_i > 0`)
//!   is holding the objective back and gets excluded
//! - an inactive inequality with negative slack is violated and gets
//!   included
//!
//! When neither signal fires the point satisfies the KKT conditions.
//!
//! A sub-problem without a minimizer (flat curvature along a direction the
//! working set leaves free) has no meaningful multipliers. The solver then
//! walks the recession direction and includes the first inequality that
//! blocks it; only when none does is the problem unbounded.

use nalgebra::DVector;

use super::index_selector::IndexSelector;
use super::kkt::KktSystem;
use super::strategy::{self, QuadraticStrategy, SolverStrategy};
use super::unconstrained;
use crate::error::{SolverError, SolverResult};
use crate::linalg::dense;
use crate::linalg::qr::PivotedQr;
use crate::problem::{QuadraticProblem, SolveResult, SolveStatus, SolverSettings, WarmStart};

#[derive(Debug, Clone)]
pub struct ActiveSetSolver {
    kkt: KktSystem,
    activator: IndexSelector,
    /// Status of the most recent sub-problem solve
    sub_status: SolveStatus,
}

impl ActiveSetSolver {
    pub fn new(problem: QuadraticProblem, settings: SolverSettings) -> Self {
        let activator = IndexSelector::new(problem.num_inequalities());
        Self {
            kkt: KktSystem::new(problem, settings),
            activator,
            sub_status: SolveStatus::Unexplored,
        }
    }

    /// The working set.
    pub fn activator(&self) -> &IndexSelector {
        &self.activator
    }

    /// Active inequality with the largest wrong-signed multiplier.
    ///
    /// The most recently included constraint is only suggested when it is
    /// the sole candidate.
    pub fn suggest_constraint_to_exclude(&self) -> Option<usize> {
        let threshold = self.kkt.settings().solution.threshold(self.kkt.multiplier_scale());
        let li = self.kkt.li();
        let last = self.activator.last_included();

        let mut best: Option<(usize, f64)> = None;
        let mut last_is_candidate = false;
        for i in self.activator.included() {
            if li[i] <= threshold {
                continue;
            }
            if Some(i) == last {
                last_is_candidate = true;
            } else if best.map_or(true, |(_, value)| li[i] > value) {
                best = Some((i, li[i]));
            }
        }

        best.map(|(i, _)| i).or(if last_is_candidate { last } else { None })
    }

    /// Inactive inequality with the most negative slack.
    ///
    /// The most recently excluded constraint is only suggested when it is
    /// the sole candidate.
    pub fn suggest_constraint_to_include(&self) -> Option<usize> {
        let slack = self.kkt.si();
        let last = self.activator.last_excluded();

        let mut best: Option<(usize, f64)> = None;
        let mut last_is_candidate = false;
        for i in self.activator.excluded() {
            if slack[i] >= -self.kkt.slack_tolerance(i) {
                continue;
            }
            if Some(i) == last {
                last_is_candidate = true;
            } else if best.map_or(true, |(_, value)| slack[i] < value) {
                best = Some((i, slack[i]));
            }
        }

        best.map(|(i, _)| i).or(if last_is_candidate { last } else { None })
    }

    /// Direction of unbounded descent that keeps the working set satisfied,
    /// scaled to unit max-norm.
    ///
    /// `None` when the sub-problem over the working set has a minimizer.
    pub fn recession_direction(&self) -> Option<DVector<f64>> {
        let problem = self.kkt.problem();
        let context = &self.kkt.settings().solution;
        let gradient = &problem.Q * self.kkt.x() + &problem.C;
        let active = self.activator.included();

        let d = if problem.num_equalities() + active.len() == 0 {
            unconstrained::recession_direction(&problem.Q, &gradient, context)
        } else {
            let rows = dense::vstack(&problem.AE, &dense::select_rows(&problem.AI, &active));
            let z = PivotedQr::decompose(&rows.transpose(), context).null_basis();
            if z.ncols() == 0 {
                return None;
            }
            let reduced = z.tr_mul(&(&problem.Q * &z));
            let step = unconstrained::recession_direction(&reduced, &z.tr_mul(&gradient), context);
            z * step
        };

        let length = dense::max_abs_vec(&d);
        if context.is_small(self.kkt.multiplier_scale(), length) {
            None
        } else {
            Some(d / length)
        }
    }

    /// Inactive inequality that first stops the recession direction.
    ///
    /// Constraints with `AI_i d < 0` block the direction `d`; the one reached
    /// first from the current X wins. The most recently excluded constraint
    /// is only suggested when it is the sole candidate.
    pub fn suggest_blocking_constraint(&self) -> Option<usize> {
        let problem = self.kkt.problem();
        let context = &self.kkt.settings().solution;
        let d = self.recession_direction()?;
        let rates = &problem.AI * d;
        let slack = self.kkt.si();
        let last = self.activator.last_excluded();

        let mut best: Option<(usize, f64)> = None;
        let mut last_is_candidate = false;
        for i in self.activator.excluded() {
            let tol = context.threshold(1.0 + problem.AI.row(i).amax());
            if rates[i] >= -tol {
                continue;
            }
            let step = slack[i].max(0.0) / -rates[i];
            if Some(i) == last {
                last_is_candidate = true;
            } else if best.map_or(true, |(_, value)| step < value) {
                best = Some((i, step));
            }
        }

        best.map(|(i, _)| i).or(if last_is_candidate { last } else { None })
    }

    /// Equality-constrained problem with the working set as extra equalities.
    fn sub_problem(&self, active: &[usize]) -> QuadraticProblem {
        let problem = self.kkt.problem();
        let ae = dense::vstack(&problem.AE, &dense::select_rows(&problem.AI, active));
        let be = dense::vconcat(&problem.BE, &dense::select_entries(&problem.BI, active));
        QuadraticProblem::new(problem.Q.clone(), problem.C.clone()).with_equalities(ae, be)
    }

    fn solve_sub_problem(&self, active: &[usize]) -> SolverResult<SolveResult> {
        let sub = self.sub_problem(active);
        let mut settings = self.kkt.settings().clone();
        settings.verbose = false;
        settings.warm_start = None;
        settings.max_iter = None;

        // Q was validated by the outer solver
        let mut strategy = QuadraticStrategy::for_problem(sub, settings);
        strategy.kkt_mut().set_state(SolveStatus::Valid);
        strategy::iterate(&mut strategy, None)?;
        Ok(strategy.build_result())
    }

    fn accept(&mut self, active: &[usize], sub: SolveResult) {
        let m_e = self.kkt.problem().num_equalities();

        self.kkt.set_x(DVector::from_vec(sub.x));
        self.kkt.set_le(DVector::from_column_slice(&sub.le[..m_e]));
        let li = self.kkt.li_mut();
        li.fill(0.0);
        for (k, &i) in active.iter().enumerate() {
            li[i] = sub.le[m_e + k];
        }

        self.sub_status = sub.status;
        let state = if sub.status.is_feasible() && self.kkt.is_primal_feasible() {
            SolveStatus::Feasible
        } else {
            SolveStatus::Valid
        };
        self.kkt.set_state(state);
    }

    fn fail_infeasible(&mut self) -> SolverError {
        log::debug!("equality constraints alone are infeasible");
        self.kkt.reset_solution();
        self.kkt.set_state(SolveStatus::Infeasible);
        SolverError::Infeasible
    }
}

impl SolverStrategy for ActiveSetSolver {
    fn name(&self) -> &'static str {
        "active-set"
    }

    fn kkt(&self) -> &KktSystem {
        &self.kkt
    }

    fn kkt_mut(&mut self) -> &mut KktSystem {
        &mut self.kkt
    }

    fn initialise(&mut self, kick_start: Option<&WarmStart>) -> SolverResult<()> {
        let Some(warm) = kick_start else {
            return Ok(());
        };
        let m_i = self.activator.len();

        if let Some(active) = &warm.active {
            for &i in active {
                if i < m_i {
                    self.activator.include(i);
                } else {
                    log::warn!("warm start names inequality {} but there are only {}", i, m_i);
                }
            }
        }

        if let Some(x) = &warm.x {
            if x.len() == self.kkt.problem().num_vars() {
                self.kkt.set_x(DVector::from_column_slice(x));
                let slack = self.kkt.si();
                for i in self.activator.included() {
                    if slack[i].abs() > self.kkt.slack_tolerance(i) {
                        self.activator.exclude(i);
                    }
                }
            } else {
                log::warn!(
                    "ignoring warm-start x of length {} (expected {})",
                    x.len(),
                    self.kkt.problem().num_vars()
                );
            }
        }

        log::debug!(
            "active set warm started with {} of {} inequalities",
            self.activator.count_included(),
            m_i
        );
        Ok(())
    }

    fn needs_another_iteration(&mut self) -> bool {
        let state = self.kkt.state();
        if state.is_optimal() || state == SolveStatus::Approximate || state.is_failure() {
            return false;
        }

        let to_include = self.suggest_constraint_to_include();

        // Without a minimizer over the working set the multipliers carry no
        // information; follow the recession direction to the next constraint.
        let unbounded = match self.sub_status {
            SolveStatus::Unbounded => true,
            SolveStatus::Feasible => self.recession_direction().is_some(),
            _ => false,
        };
        if unbounded {
            return match to_include.or_else(|| self.suggest_blocking_constraint()) {
                Some(i) => {
                    log::debug!("including inequality {} to bound the sub-problem", i);
                    self.activator.include(i);
                    true
                }
                None => {
                    self.kkt.set_state(SolveStatus::Unbounded);
                    false
                }
            };
        }

        let to_exclude = self.suggest_constraint_to_exclude();
        match (to_exclude, to_include) {
            (None, None) => {
                let state = if self.sub_status.is_optimal() {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::Approximate
                };
                self.kkt.set_state(state);
                false
            }
            (exclude, include) => {
                if let Some(i) = exclude {
                    log::debug!("excluding inequality {} (LI = {:.3e})", i, self.kkt.li()[i]);
                    self.activator.exclude(i);
                }
                if let Some(i) = include {
                    log::debug!("including inequality {}", i);
                    self.activator.include(i);
                }
                true
            }
        }
    }

    fn perform_iteration(&mut self) -> SolverResult<()> {
        // Each failed pass drops one constraint, so this terminates
        for _ in 0..=self.activator.count_included() {
            let active = self.activator.included();

            let sub = match self.solve_sub_problem(&active) {
                Ok(sub) => Ok(sub),
                Err(SolverError::InfeasibleEqualities { residual }) => Err(residual),
                Err(err) => return Err(err),
            };

            match sub {
                Ok(sub) => {
                    self.accept(&active, sub);
                    return Ok(());
                }
                Err(_) if active.is_empty() => return Err(self.fail_infeasible()),
                Err(residual) => {
                    let dropped = if active.len() > 2 && self.activator.was_last_inclusion() {
                        self.activator.revert_last_inclusion()
                    } else {
                        self.activator.shrink()
                    };
                    log::debug!(
                        "working set of {} is infeasible (residual {:.3e}), dropped {:?}",
                        active.len(),
                        residual,
                        dropped
                    );
                }
            }
        }

        Err(self.fail_infeasible())
    }

    fn active_set(&self) -> Vec<usize> {
        self.activator.included()
    }
}
