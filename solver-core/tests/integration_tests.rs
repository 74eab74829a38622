//! End-to-end tests for the quadratic solvers.
//!
//! These go through `solve` and check statuses, solutions and the KKT
//! conditions of the returned multipliers.

use nalgebra::{DMatrix, DVector};
use qpset_core::linalg::sparse;
use qpset_core::qp::strategy;
use qpset_core::{
    solve, ActiveSetSolver, QuadraticProblem, SolveResult, SolveStatus, SolverError,
    SolverSettings, SolverStrategy, WarmStart,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// min (1/2)|x|^2  s.t.  x1 + x2 = 1,  x1 >= lower,  x2 >= 0
fn bounded_simplex(lower: f64) -> QuadraticProblem {
    QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
        .with_equalities(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_vec(vec![1.0]),
        )
        .with_inequalities(
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]),
            DVector::from_vec(vec![lower, 0.0]),
        )
}

fn assert_kkt(prob: &QuadraticProblem, result: &SolveResult, tol: f64) {
    let x = DVector::from_column_slice(&result.x);
    let le = DVector::from_column_slice(&result.le);
    let li = DVector::from_column_slice(&result.li);

    let stationarity = prob.stationarity_residual(&x, &le, &li);
    assert!(stationarity < tol, "stationarity residual {:.3e}", stationarity);
    assert!(prob.equality_residual(&x) < tol, "equality residual {:.3e}", prob.equality_residual(&x));

    let slack = prob.slack(&x);
    for i in 0..prob.num_inequalities() {
        assert!(slack[i] >= -tol, "constraint {} violated: slack {:.3e}", i, slack[i]);
        assert!(li[i] <= tol, "constraint {} has wrong-signed multiplier {:.3e}", i, li[i]);
        if result.active.contains(&i) {
            assert!(slack[i].abs() < tol, "active constraint {} has slack {:.3e}", i, slack[i]);
        } else {
            assert_eq!(li[i], 0.0, "inactive constraint {} has a multiplier", i);
        }
    }
}

#[test]
fn test_interior_optimum() {
    let prob = bounded_simplex(0.0);
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");

    println!("\n=== Interior optimum ===");
    println!("Status: {:?}", result.status);
    println!("x = {:?}", result.x);

    assert_eq!(result.status, SolveStatus::Optimal);
    assert!((result.x[0] - 0.5).abs() < 1e-9);
    assert!((result.x[1] - 0.5).abs() < 1e-9);
    assert!(result.active.is_empty(), "no inequality should be active");
    assert!((result.obj_val - 0.25).abs() < 1e-9);
    assert_kkt(&prob, &result, 1e-9);
}

#[test]
fn test_binding_lower_bound() {
    let prob = bounded_simplex(0.8);
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");

    println!("\n=== Binding bound ===");
    println!("Status: {:?}", result.status);
    println!("x = {:?}, le = {:?}, li = {:?}", result.x, result.le, result.li);

    assert_eq!(result.status, SolveStatus::Optimal);
    assert!((result.x[0] - 0.8).abs() < 1e-9);
    assert!((result.x[1] - 0.2).abs() < 1e-9);
    assert_eq!(result.active, vec![0]);
    assert!(result.li[0] < -1e-6, "binding constraint needs a strictly negative multiplier");
    assert_eq!(result.li[1], 0.0);
    assert_eq!(result.info.iters, 2);
    assert_kkt(&prob, &result, 1e-9);
}

#[test]
fn test_unconstrained_identity() {
    let c = vec![0.3, -1.5, 2.0, 0.0];
    let prob = QuadraticProblem::new(DMatrix::identity(4, 4), DVector::from_vec(c.clone()));
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");

    assert_eq!(result.status, SolveStatus::Distinct);
    assert_eq!(result.info.iters, 1);
    for i in 0..4 {
        assert!((result.x[i] + c[i]).abs() < 1e-14);
    }
}

#[test]
fn test_zero_hessian_is_unbounded() {
    let prob = QuadraticProblem::new(DMatrix::zeros(3, 3), DVector::from_vec(vec![0.0, 1.0, 0.0]));
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");

    assert_eq!(result.status, SolveStatus::Unbounded);
    assert_eq!(result.x, vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_flat_directions_bounded_by_inactive_constraints() {
    // min (1/2) x1^2 + x2  s.t.  x2 >= 0
    let prob = QuadraticProblem::new(
        DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 0.0])),
        DVector::from_vec(vec![0.0, 1.0]),
    )
    .with_inequalities(DMatrix::from_row_slice(1, 2, &[0.0, 1.0]), DVector::zeros(1));
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!(result.obj_val.abs() < 1e-12);
    assert_kkt(&prob, &result, 1e-9);

    // min x  s.t.  x >= -1
    let prob = QuadraticProblem::new(DMatrix::zeros(1, 1), DVector::from_vec(vec![1.0]))
        .with_inequalities(DMatrix::identity(1, 1), DVector::from_vec(vec![-1.0]));
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!((result.x[0] + 1.0).abs() < 1e-12);
    assert_kkt(&prob, &result, 1e-9);

    // min -x1 - 2 x2  s.t.  x >= 0,  x1 + x2 <= 1
    let prob = QuadraticProblem::new(DMatrix::zeros(2, 2), DVector::from_vec(vec![-1.0, -2.0]))
        .with_inequalities(
            DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, -1.0, -1.0]),
            DVector::from_vec(vec![0.0, 0.0, -1.0]),
        );
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");
    println!("\n=== Simplex LP ===");
    println!("Status: {:?}, x = {:?}, iters = {}", result.status, result.x, result.info.iters);
    assert_eq!(result.status, SolveStatus::Optimal);
    assert!(result.x[0].abs() < 1e-9 && (result.x[1] - 1.0).abs() < 1e-9);
    assert!((result.obj_val + 2.0).abs() < 1e-9);
    assert_kkt(&prob, &result, 1e-9);
}

#[test]
fn test_unblocked_linear_objective_is_unbounded() {
    // min x1  s.t.  x2 >= 0: nothing stops x1 from decreasing
    let prob = QuadraticProblem::new(DMatrix::zeros(2, 2), DVector::from_vec(vec![1.0, 0.0]))
        .with_inequalities(DMatrix::from_row_slice(1, 2, &[0.0, 1.0]), DVector::zeros(1));
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");
    assert_eq!(result.status, SolveStatus::Unbounded);
}

#[test]
fn test_indefinite_hessian_is_invalid() {
    let q = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
    let prob = QuadraticProblem::new(q, DVector::zeros(2))
        .with_inequalities(DMatrix::identity(2, 2), DVector::zeros(2));
    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");

    assert_eq!(result.status, SolveStatus::Invalid);
    assert_eq!(result.info.iters, 0);
}

#[test]
fn test_infeasible_equalities() {
    let prob = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2)).with_equalities(
        DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 0.0]),
        DVector::from_vec(vec![1.0, -1.0]),
    );
    let err = solve(&prob, &SolverSettings::default()).unwrap_err();
    assert!(matches!(err, SolverError::InfeasibleEqualities { residual } if residual > 0.5));
}

#[test]
fn test_infeasible_with_inequalities() {
    let prob = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(2))
        .with_equalities(
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 0.0]),
            DVector::from_vec(vec![1.0, -1.0]),
        )
        .with_inequalities(DMatrix::identity(2, 2), DVector::zeros(2));
    let err = solve(&prob, &SolverSettings::default()).unwrap_err();
    assert_eq!(err, SolverError::Infeasible);
}

#[test]
fn test_dimension_mismatch() {
    let prob = QuadraticProblem::new(DMatrix::identity(2, 2), DVector::zeros(3));
    let err = solve(&prob, &SolverSettings::default()).unwrap_err();
    assert!(matches!(err, SolverError::DimensionMismatch { what: "Q rows", .. }));
}

#[test]
fn test_sparse_input() {
    // Upper triangle of [[2, 1], [1, 2]]
    let q = sparse::from_triplets(2, 2, vec![(0, 0, 2.0), (0, 1, 1.0), (1, 1, 2.0)]);
    let ai = sparse::from_triplets(1, 2, vec![(0, 1, 1.0)]);
    let prob = QuadraticProblem::from_sparse(&q, &[-1.0, -1.0]).with_sparse_inequalities(&ai, &[1.0]);

    let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    // x2 = 1 binding, then 2 x1 + 1 = 1
    assert!((result.x[0] - 0.0).abs() < 1e-9);
    assert!((result.x[1] - 1.0).abs() < 1e-9);
    assert_eq!(result.active, vec![0]);
    assert_kkt(&prob, &result, 1e-9);
}

#[test]
fn test_warm_start_from_previous_result() {
    let prob = bounded_simplex(0.8);
    let cold = solve(&prob, &SolverSettings::default()).expect("Solve failed");

    let settings = SolverSettings {
        warm_start: Some(WarmStart::from(&cold)),
        ..Default::default()
    };
    let warm = solve(&prob, &settings).expect("Solve failed");

    assert_eq!(warm.status, SolveStatus::Optimal);
    assert_eq!(warm.active, cold.active);
    assert_eq!(warm.info.iters, 1, "warm start should converge immediately");
    assert!((warm.x[0] - 0.8).abs() < 1e-9);
}

#[test]
fn test_needs_another_iteration_is_idempotent() {
    let mut solver = ActiveSetSolver::new(bounded_simplex(0.8), SolverSettings::default());
    let result = strategy::run(&mut solver, None).expect("Solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);

    for _ in 0..3 {
        assert!(!solver.needs_another_iteration());
        assert_eq!(solver.state(), SolveStatus::Optimal);
        assert_eq!(solver.active_set(), vec![0]);
    }
}

#[test]
fn test_wrong_active_set_is_repaired() {
    // Start with x2 >= 0 active instead of x1 >= 0.8. The first iteration
    // lands on (1, 0) where x2 >= 0 has a wrong-signed multiplier, so it is
    // released; the unconstrained line optimum then violates x1 >= 0.8.
    let prob = bounded_simplex(0.8);
    let settings = SolverSettings {
        warm_start: Some(WarmStart { x: None, active: Some(vec![1]) }),
        ..Default::default()
    };
    let result = solve(&prob, &settings).expect("Solve failed");
    assert_eq!(result.status, SolveStatus::Optimal);
    assert_eq!(result.active, vec![0]);
    assert_eq!(result.info.iters, 3);
    assert_kkt(&prob, &result, 1e-9);
}

#[test]
fn test_random_diagonal_box_projection() {
    let mut rng = ChaCha8Rng::seed_from_u64(12345);

    for _ in 0..20 {
        let n = rng.gen_range(2..8);
        let q: Vec<f64> = (0..n).map(|_| rng.gen_range(0.5..4.0)).collect();
        let c: Vec<f64> = (0..n).map(|_| rng.gen_range(-5.0..5.0)).collect();
        let lower: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..0.0)).collect();
        let upper: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();

        // x >= lower and -x >= -upper
        let mut ai = DMatrix::zeros(2 * n, n);
        let mut bi = DVector::zeros(2 * n);
        for i in 0..n {
            ai[(i, i)] = 1.0;
            bi[i] = lower[i];
            ai[(n + i, i)] = -1.0;
            bi[n + i] = -upper[i];
        }
        let prob = QuadraticProblem::new(
            DMatrix::from_diagonal(&DVector::from_vec(q.clone())),
            DVector::from_vec(c.clone()),
        )
        .with_inequalities(ai, bi);

        let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");
        assert_eq!(result.status, SolveStatus::Optimal);
        for i in 0..n {
            let expected = (-c[i] / q[i]).clamp(lower[i], upper[i]);
            assert!(
                (result.x[i] - expected).abs() < 1e-9,
                "x[{}] = {}, expected {}",
                i,
                result.x[i],
                expected
            );
        }
        assert_kkt(&prob, &result, 1e-8);
    }
}

#[test]
fn test_random_feasible_qps() {
    let mut rng = ChaCha8Rng::seed_from_u64(54321);

    for trial in 0..10 {
        let n = 5;
        let m_e = 1;
        let m_i = 4;

        let m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
        let q = m.transpose() * &m + DMatrix::identity(n, n) * 0.1;
        let c = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));

        // Strictly feasible reference point
        let x0 = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));
        let ae = DMatrix::from_fn(m_e, n, |_, _| rng.gen_range(-1.0..1.0));
        let be = &ae * &x0;
        let ai = DMatrix::from_fn(m_i, n, |_, _| rng.gen_range(-1.0..1.0));
        let bi = &ai * &x0 - DVector::from_fn(m_i, |_, _| rng.gen_range(0.1..1.0));

        let prob = QuadraticProblem::new(q, c)
            .with_equalities(ae, be)
            .with_inequalities(ai, bi);

        let result = solve(&prob, &SolverSettings::default()).expect("Solve failed");
        println!("trial {}: {:?} in {} iterations", trial, result.status, result.info.iters);

        assert!(result.status.is_feasible(), "trial {} ended {:?}", trial, result.status);
        if result.status.is_optimal() {
            assert_kkt(&prob, &result, 1e-7);
            assert!(result.obj_val <= prob.objective(&x0) + 1e-9);
        }
    }
}
