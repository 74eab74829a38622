//! Benchmarking CLI for the qpset solver.

mod random_qp;
mod report;
mod solver_choice;
mod test_problems;

use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use qpset_core::{QuadraticProblem, SolverSettings};

use random_qp::RandomQpConfig;
use report::{compute_summary, print_results_table, print_summary, BenchmarkResult};
use solver_choice::{solve_with_choice, StrategyChoice};
use test_problems::{find_problem, test_problems, TestProblem};

#[derive(Parser)]
#[command(name = "qpset-bench", version, about = "Benchmark runner for the qpset QP solver")]
struct Cli {
    /// Print results as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Override the iteration budget
    #[arg(long, global = true)]
    max_iter: Option<usize>,

    /// Solver strategy
    #[arg(long, value_enum, default_value_t = StrategyChoice::Auto, global = true)]
    strategy: StrategyChoice,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the named reference problems
    List,
    /// Solve named reference problems (all of them when none is given)
    Run {
        names: Vec<String>,

        /// Print the per-iteration table
        #[arg(long)]
        trace: bool,
    },
    /// Solve seeded random convex QPs with a known feasible point
    Random {
        #[arg(long, default_value_t = 20)]
        n: usize,
        #[arg(long, default_value_t = 5)]
        eq: usize,
        #[arg(long, default_value_t = 30)]
        ineq: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn bench_one(
    name: &str,
    prob: &QuadraticProblem,
    settings: &SolverSettings,
    choice: StrategyChoice,
) -> BenchmarkResult {
    let start = Instant::now();
    let outcome = solve_with_choice(prob, settings, choice);
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    BenchmarkResult::new(name, prob, &outcome, elapsed)
}

fn check_expectation(problem: &TestProblem, record: &mut BenchmarkResult) {
    let matched = match (&problem.expected_status, &record.error) {
        (None, Some(_)) => true,
        (Some(status), None) => {
            let obj_ok = problem
                .expected_obj
                .map_or(true, |obj| (record.obj_val - obj).abs() <= 1e-6 * (1.0 + obj.abs()));
            record.status == status.to_string() && obj_ok
        }
        _ => false,
    };
    record.as_expected = Some(matched);
}

fn emit(results: &[BenchmarkResult], json: bool) -> Result<()> {
    let summary = compute_summary(results);
    if json {
        let out = serde_json::json!({ "results": results, "summary": summary });
        let text = serde_json::to_string_pretty(&out).context("serializing results")?;
        println!("{}", text);
    } else {
        print_results_table(results);
        print_summary(&summary);
    }
    Ok(())
}

fn run_named(cli: &Cli, names: &[String], trace: bool) -> Result<()> {
    let problems = if names.is_empty() {
        test_problems()
    } else {
        names
            .iter()
            .map(|name| find_problem(name).with_context(|| format!("unknown problem '{}'", name)))
            .collect::<Result<Vec<_>>>()?
    };

    let settings = SolverSettings {
        max_iter: cli.max_iter,
        verbose: trace,
        ..Default::default()
    };

    let mut results = Vec::with_capacity(problems.len());
    for problem in &problems {
        log::info!("solving {} ({})", problem.name, problem.description);
        let prob = (problem.builder)();
        let mut record = bench_one(problem.name, &prob, &settings, cli.strategy);
        check_expectation(problem, &mut record);
        results.push(record);
    }

    emit(&results, cli.json)?;

    // An explicitly requested problem that turns out infeasible is a failure
    if !names.is_empty() {
        if let Some(r) = results.iter().find(|r| r.error.is_some()) {
            bail!("{} reported {}", r.name, r.error.as_deref().unwrap_or("an error"));
        }
    }

    let unexpected: Vec<&str> = results
        .iter()
        .filter(|r| r.as_expected == Some(false))
        .map(|r| r.name.as_str())
        .collect();
    if !unexpected.is_empty() {
        bail!("unexpected outcome for {}", unexpected.join(", "));
    }
    Ok(())
}

fn run_random(cli: &Cli, base: RandomQpConfig, count: usize) -> Result<()> {
    let settings = SolverSettings {
        max_iter: cli.max_iter,
        ..Default::default()
    };

    let mut results = Vec::with_capacity(count);
    for k in 0..count {
        let config = RandomQpConfig { seed: base.seed + k as u64, ..base };
        let (prob, _) = random_qp::generate(&config);
        let name = format!("random-{}", config.seed);
        results.push(bench_one(&name, &prob, &settings, cli.strategy));
    }

    emit(&results, cli.json)?;

    // Every generated problem has a feasible point
    if let Some(r) = results.iter().find(|r| r.error.is_some()) {
        bail!(
            "{} reported {}",
            r.name,
            r.error.as_deref().unwrap_or("an error")
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::List => {
            if cli.json {
                let list: Vec<_> = test_problems()
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "name": p.name,
                            "class": p.problem_class,
                            "description": p.description,
                            "expected_status": p.expected_status.map(|s| s.to_string()),
                            "expected_obj": p.expected_obj,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                println!("{:<18} {:<6} {}", "Name", "Class", "Description");
                println!("{}", "-".repeat(60));
                for p in test_problems() {
                    println!("{:<18} {:<6} {}", p.name, p.problem_class, p.description);
                }
            }
            Ok(())
        }
        Command::Run { names, trace } => run_named(&cli, names, *trace),
        Command::Random { n, eq, ineq, seed, count } => {
            let base = RandomQpConfig { n: *n, eq: *eq, ineq: *ineq, seed: *seed };
            run_random(&cli, base, *count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qpset_core::SolverError;

    #[test]
    fn test_every_registry_problem_meets_expectation() {
        let settings = SolverSettings::default();
        // Random entries only pin a status; the heuristic working set may end Approximate
        for problem in test_problems().into_iter().filter(|p| p.problem_class != "RANDOM") {
            let prob = (problem.builder)();
            let mut record = bench_one(problem.name, &prob, &settings, StrategyChoice::Auto);
            check_expectation(&problem, &mut record);
            assert_eq!(record.as_expected, Some(true), "{}: {:?}", problem.name, record);
        }
    }

    #[test]
    fn test_infeasible_is_reported_as_error() {
        let problem = find_problem("INFEASIBLE").unwrap();
        let prob = (problem.builder)();
        let outcome = solve_with_choice(&prob, &SolverSettings::default(), StrategyChoice::Auto);
        assert!(matches!(outcome, Err(SolverError::InfeasibleEqualities { .. })
            | Err(SolverError::Infeasible)));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::parse_from(["qpset-bench", "--json", "-vv", "run", "HS21", "--trace"]);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run { names, trace } => {
                assert_eq!(names, vec!["HS21".to_string()]);
                assert!(trace);
            }
            _ => panic!("expected run"),
        }
    }
}
