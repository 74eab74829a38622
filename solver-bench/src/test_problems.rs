//! Named reference problems for the `list` and `run` commands.

use nalgebra::{DMatrix, DVector};
use qpset_core::{QuadraticProblem, SolveStatus};

use crate::random_qp::{self, RandomQpConfig};

/// Test problem definition.
#[derive(Clone)]
pub struct TestProblem {
    pub name: &'static str,
    pub problem_class: &'static str,
    pub builder: fn() -> QuadraticProblem,
    /// `None` when the solve is expected to report infeasibility
    pub expected_status: Option<SolveStatus>,
    pub expected_obj: Option<f64>,
    pub description: &'static str,
}

/// min (1/2)|x|^2  s.t.  x1 + x2 = 1,  x1 >= lower,  x2 >= 0
fn bounded_simplex(lower: f64) -> QuadraticProblem {
    QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
        .with_equalities(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_vec(vec![1.0]),
        )
        .with_inequalities(DMatrix::identity(2, 2), DVector::from_vec(vec![lower, 0.0]))
}

fn build_simplex_interior() -> QuadraticProblem {
    bounded_simplex(0.0)
}

fn build_simplex_bound() -> QuadraticProblem {
    bounded_simplex(0.8)
}

fn build_unconstrained() -> QuadraticProblem {
    QuadraticProblem::new(DMatrix::identity(3, 3), DVector::from_vec(vec![1.0, -2.0, 3.0]))
}

fn build_singular_compatible() -> QuadraticProblem {
    QuadraticProblem::new(
        DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]),
        DVector::from_vec(vec![-2.0, -2.0]),
    )
}

fn build_singular_unbounded() -> QuadraticProblem {
    QuadraticProblem::new(DMatrix::zeros(2, 2), DVector::from_vec(vec![1.0, 0.0]))
}

fn build_indefinite() -> QuadraticProblem {
    QuadraticProblem::new(
        DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]),
        DVector::zeros(2),
    )
    .with_inequalities(DMatrix::identity(2, 2), DVector::zeros(2))
}

fn build_infeasible() -> QuadraticProblem {
    // x1 + x2 = 1 and x1 + x2 = 2
    QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
        .with_equalities(
            DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]),
            DVector::from_vec(vec![1.0, 2.0]),
        )
        .with_inequalities(DMatrix::identity(2, 2), DVector::zeros(2))
}

/// Hock-Schittkowski 21 without the constant term:
/// min 0.01 x1^2 + x2^2  s.t.  10 x1 - x2 >= 10,  2 <= x1 <= 50,  -50 <= x2 <= 50
fn build_hs21() -> QuadraticProblem {
    QuadraticProblem::new(
        DMatrix::from_diagonal(&DVector::from_vec(vec![0.02, 2.0])),
        DVector::zeros(2),
    )
    .with_inequalities(
        DMatrix::from_row_slice(5, 2, &[
            10.0, -1.0,
            1.0, 0.0,
            -1.0, 0.0,
            0.0, 1.0,
            0.0, -1.0,
        ]),
        DVector::from_vec(vec![10.0, 2.0, -50.0, -50.0, -50.0]),
    )
}

/// Hock-Schittkowski 35 without the constant term:
/// min 2 x1^2 + 2 x2^2 + x3^2 + 2 x1 x2 + 2 x1 x3 - 8 x1 - 6 x2 - 4 x3
/// s.t. x >= 0,  x1 + x2 + 2 x3 <= 3
fn build_hs35() -> QuadraticProblem {
    QuadraticProblem::new(
        DMatrix::from_row_slice(3, 3, &[
            4.0, 2.0, 2.0,
            2.0, 4.0, 0.0,
            2.0, 0.0, 2.0,
        ]),
        DVector::from_vec(vec![-8.0, -6.0, -4.0]),
    )
    .with_inequalities(
        DMatrix::from_row_slice(4, 3, &[
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
            -1.0, -1.0, -2.0,
        ]),
        DVector::from_vec(vec![0.0, 0.0, 0.0, -3.0]),
    )
}

fn build_random_small() -> QuadraticProblem {
    random_qp::generate(&RandomQpConfig { n: 8, eq: 2, ineq: 6, seed: 12345 }).0
}

// ============================================================================
// Problem Registry
// ============================================================================

pub fn test_problems() -> Vec<TestProblem> {
    vec![
        TestProblem {
            name: "SIMPLEX_INTERIOR",
            problem_class: "QP",
            builder: build_simplex_interior,
            expected_status: Some(SolveStatus::Optimal),
            expected_obj: Some(0.25),
            description: "projection onto x1 + x2 = 1 with inactive bounds",
        },
        TestProblem {
            name: "SIMPLEX_BOUND",
            problem_class: "QP",
            builder: build_simplex_bound,
            expected_status: Some(SolveStatus::Optimal),
            expected_obj: Some(0.34),
            description: "projection onto x1 + x2 = 1 with x1 >= 0.8 binding",
        },
        TestProblem {
            name: "UNCONSTRAINED",
            problem_class: "UQP",
            builder: build_unconstrained,
            expected_status: Some(SolveStatus::Distinct),
            expected_obj: Some(-7.0),
            description: "Q = I, unique minimizer -C",
        },
        TestProblem {
            name: "SINGULAR_COMPAT",
            problem_class: "UQP",
            builder: build_singular_compatible,
            expected_status: Some(SolveStatus::Optimal),
            expected_obj: Some(-2.0),
            description: "rank-one Q with C in its range",
        },
        TestProblem {
            name: "SINGULAR_UNBND",
            problem_class: "UQP",
            builder: build_singular_unbounded,
            expected_status: Some(SolveStatus::Unbounded),
            expected_obj: None,
            description: "Q = 0 with nonzero C",
        },
        TestProblem {
            name: "INDEFINITE",
            problem_class: "QP",
            builder: build_indefinite,
            expected_status: Some(SolveStatus::Invalid),
            expected_obj: None,
            description: "Q with a negative eigenvalue",
        },
        TestProblem {
            name: "INFEASIBLE",
            problem_class: "QP",
            builder: build_infeasible,
            expected_status: None,
            expected_obj: None,
            description: "contradictory equality constraints",
        },
        TestProblem {
            name: "HS21",
            problem_class: "QP",
            builder: build_hs21,
            expected_status: Some(SolveStatus::Optimal),
            expected_obj: Some(0.04),
            description: "Hock-Schittkowski 21",
        },
        TestProblem {
            name: "HS35",
            problem_class: "QP",
            builder: build_hs35,
            expected_status: Some(SolveStatus::Optimal),
            expected_obj: Some(1.0 / 9.0 - 9.0),
            description: "Hock-Schittkowski 35",
        },
        TestProblem {
            name: "RANDOM_SMALL",
            problem_class: "RANDOM",
            builder: build_random_small,
            expected_status: Some(SolveStatus::Optimal),
            expected_obj: None,
            description: "seeded random convex QP, n = 8",
        },
    ]
}

pub fn find_problem(name: &str) -> Option<TestProblem> {
    test_problems()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}
