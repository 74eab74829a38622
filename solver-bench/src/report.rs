//! Benchmark records, summaries and table output.

use qpset_core::{QuadraticProblem, SolveResult, SolveStatus, SolverError};
use serde::Serialize;

/// Outcome of one solve.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    /// Problem name
    pub name: String,
    /// Number of variables
    pub n: usize,
    /// Number of equality constraints
    pub m_e: usize,
    /// Number of inequality constraints
    pub m_i: usize,
    /// Solve status, or "Error" when the solve returned an error
    pub status: String,
    /// Number of iterations
    pub iterations: usize,
    /// Objective value
    pub obj_val: f64,
    /// Number of active inequalities
    pub active: usize,
    /// Max-norm of the stationarity residual
    pub stationarity: f64,
    /// Max-norm of AE x - BE
    pub equality_residual: f64,
    /// Largest inequality violation
    pub inequality_violation: f64,
    /// Solve time in milliseconds
    pub solve_time_ms: f64,
    /// Whether the outcome matched the registry's expectation
    pub as_expected: Option<bool>,
    /// Error message if any
    pub error: Option<String>,
}

impl BenchmarkResult {
    pub fn new(
        name: &str,
        prob: &QuadraticProblem,
        outcome: &Result<SolveResult, SolverError>,
        solve_time_ms: f64,
    ) -> Self {
        let mut record = Self {
            name: name.to_string(),
            n: prob.num_vars(),
            m_e: prob.num_equalities(),
            m_i: prob.num_inequalities(),
            status: "Error".to_string(),
            iterations: 0,
            obj_val: f64::NAN,
            active: 0,
            stationarity: f64::NAN,
            equality_residual: f64::NAN,
            inequality_violation: f64::NAN,
            solve_time_ms,
            as_expected: None,
            error: None,
        };
        match outcome {
            Ok(result) => {
                record.status = result.status.to_string();
                record.iterations = result.info.iters;
                record.obj_val = result.obj_val;
                record.active = result.active.len();
                record.stationarity = result.info.stationarity;
                record.equality_residual = result.info.equality_residual;
                record.inequality_violation = result.info.inequality_violation;
            }
            Err(err) => record.error = Some(err.to_string()),
        }
        record
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal.to_string() || self.status == SolveStatus::Distinct.to_string()
    }
}

/// Summary statistics for a benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkSummary {
    /// Total problems attempted
    pub total: usize,
    /// Problems solved to optimality
    pub optimal: usize,
    /// Problems that returned an error
    pub errors: usize,
    /// Problems whose outcome differed from the expectation
    pub unexpected: usize,
    /// Total solve time in milliseconds
    pub total_time_ms: f64,
    /// Geometric mean of iterations (for solved problems)
    pub geom_mean_iters: f64,
}

pub fn compute_summary(results: &[BenchmarkResult]) -> BenchmarkSummary {
    let mut optimal = 0;
    let mut iter_log_sum = 0.0;
    let mut iter_count = 0;

    for r in results {
        if r.is_optimal() {
            optimal += 1;
            if r.iterations > 0 {
                iter_log_sum += (r.iterations as f64).ln();
                iter_count += 1;
            }
        }
    }

    let geom_mean_iters = if iter_count > 0 {
        (iter_log_sum / iter_count as f64).exp()
    } else {
        0.0
    };

    BenchmarkSummary {
        total: results.len(),
        optimal,
        errors: results.iter().filter(|r| r.error.is_some()).count(),
        unexpected: results.iter().filter(|r| r.as_expected == Some(false)).count(),
        total_time_ms: results.iter().map(|r| r.solve_time_ms).sum(),
        geom_mean_iters,
    }
}

/// Print detailed results table
pub fn print_results_table(results: &[BenchmarkResult]) {
    println!(
        "\n{:<18} {:>4} {:>4} {:>4} {:>12} {:>6} {:>14} {:>10} {:>10}",
        "Problem", "n", "m_e", "m_i", "Status", "Iters", "Obj", "KKT", "Time(ms)"
    );
    println!("{}", "-".repeat(90));

    for r in results {
        if let Some(err) = &r.error {
            println!(
                "{:<18} {:>4} {:>4} {:>4} {:>12} {:>6} {:>14} {:>10} {:>10.3}   {}",
                r.name, r.n, r.m_e, r.m_i, "Error", "-", "-", "-", r.solve_time_ms, err
            );
        } else {
            let kkt = r.stationarity.max(r.equality_residual).max(r.inequality_violation);
            let flag = if r.as_expected == Some(false) { "  (unexpected)" } else { "" };
            println!(
                "{:<18} {:>4} {:>4} {:>4} {:>12} {:>6} {:>14.6e} {:>10.2e} {:>10.3}{}",
                r.name, r.n, r.m_e, r.m_i, r.status, r.iterations, r.obj_val, kkt, r.solve_time_ms, flag
            );
        }
    }
}

/// Print results summary
pub fn print_summary(summary: &BenchmarkSummary) {
    println!("\n{}", "=".repeat(60));
    println!("Benchmark Summary");
    println!("{}", "=".repeat(60));
    println!("Total problems:      {}", summary.total);
    if summary.total > 0 {
        println!(
            "Optimal:             {} ({:.1}%)",
            summary.optimal,
            100.0 * summary.optimal as f64 / summary.total as f64
        );
    }
    println!("Errors:              {}", summary.errors);
    println!("Unexpected:          {}", summary.unexpected);
    println!("Total time:          {:.3}ms", summary.total_time_ms);
    println!("Geom mean iters:     {:.1}", summary.geom_mean_iters);
    println!("{}", "=".repeat(60));
}
