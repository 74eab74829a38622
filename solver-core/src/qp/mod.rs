//! Quadratic solvers.
//!
//! Three strategies share one [`KktSystem`] representation:
//!
//! - [`UnconstrainedSolver`]: Cholesky, falling back to an eigen pseudo-inverse
//! - [`NullspaceSolver`]: equality constraints through a null-space basis
//! - [`ActiveSetSolver`]: inequalities, solved as a sequence of equality
//!   constrained sub-problems over a working set
//!
//! [`QuadraticStrategy::for_problem`] picks the right one and
//! [`strategy::run`] drives it.

pub mod active_set;
pub mod index_selector;
pub mod kkt;
pub mod nullspace;
pub mod strategy;
pub mod unconstrained;

pub use active_set::ActiveSetSolver;
pub use index_selector::{IndexSelector, Toggle};
pub use kkt::KktSystem;
pub use nullspace::NullspaceSolver;
pub use strategy::{QuadraticStrategy, SolverStrategy};
pub use unconstrained::UnconstrainedSolver;
