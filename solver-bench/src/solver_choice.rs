use clap::ValueEnum;
use qpset_core::qp::strategy;
use qpset_core::{solve, ActiveSetSolver, QuadraticProblem, SolveResult, SolverResult, SolverSettings};

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum StrategyChoice {
    /// Pick from the constraints present
    #[default]
    Auto,
    /// Always run the active-set method, even without inequalities
    ActiveSet,
}

pub fn solve_with_choice(
    prob: &QuadraticProblem,
    settings: &SolverSettings,
    choice: StrategyChoice,
) -> SolverResult<SolveResult> {
    match choice {
        StrategyChoice::Auto => solve(prob, settings),
        StrategyChoice::ActiveSet => {
            prob.validate()?;
            let mut solver = ActiveSetSolver::new(prob.clone(), settings.clone());
            strategy::run(&mut solver, settings.warm_start.as_ref())
        }
    }
}
