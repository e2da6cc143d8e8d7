//! A + B: print the sum of two integers.
//!
//! Subtask 1 (30 points): 1 <= A, B <= 1000
//! Subtask 2 (70 points): 1 <= A, B <= 10^9
//!
//! `sum-problem gen` writes the test cases into `tc/`, `sum-problem grade
//! --solution ./a.out` grades a solution against them.

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use std::process::ExitCode;
use std::sync::Arc;
use tcforge::{ConstraintSuite, IoFormat, Problem, Runner, TestSuite};

const SMALL_MAX: i64 = 1_000;
const LARGE_MAX: i64 = 1_000_000_000;

#[derive(Debug, Clone, Default)]
struct Sum {
    a: i64,
    b: i64,
}

struct SumIo;

impl IoFormat<Sum> for SumIo {
    fn write_input(&self, state: &Sum) -> Result<String> {
        Ok(format!("{} {}\n", state.a, state.b))
    }

    fn parse_input(&self, content: &str) -> Result<Sum> {
        let mut tokens = content.split_whitespace();
        let mut next = |name: &str| -> Result<i64> {
            tokens
                .next()
                .ok_or_else(|| anyhow!("Missing {}", name))?
                .parse()
                .with_context(|| format!("Invalid {}", name))
        };
        let a = next("A")?;
        let b = next("B")?;
        Ok(Sum { a, b })
    }
}

fn constraints() -> Result<ConstraintSuite<Sum>> {
    let suite = ConstraintSuite::builder()
        .constraint("1 <= A", |s: &Sum| 1 <= s.a)
        .constraint("1 <= B", |s| 1 <= s.b)
        .subtask(1, 30.0)
        .constraint("A <= 1000", |s| s.a <= SMALL_MAX)
        .constraint("B <= 1000", |s| s.b <= SMALL_MAX)
        .subtask(2, 70.0)
        .constraint("A <= 10^9", |s| s.a <= LARGE_MAX)
        .constraint("B <= 10^9", |s| s.b <= LARGE_MAX)
        .build()?;
    Ok(suite)
}

fn test_suite() -> TestSuite<Sum> {
    TestSuite::builder()
        .sample_for("1 2\n", [1, 2])
        .sample_for("1000 1000\n", [1, 2])
        .group([1, 2])
        .case("minimum", |s: &mut Sum, _| {
            s.a = 1;
            s.b = 1;
            Ok(())
        })
        .case("maximum small", |s, _| {
            s.a = SMALL_MAX;
            s.b = SMALL_MAX;
            Ok(())
        })
        .case("random small", |s, rng| {
            s.a = rng.gen_range(1..=SMALL_MAX);
            s.b = rng.gen_range(1..=SMALL_MAX);
            Ok(())
        })
        .group([2])
        .case("A just above small", |s, rng| {
            s.a = SMALL_MAX + 1;
            s.b = rng.gen_range(1..=SMALL_MAX);
            Ok(())
        })
        .case("maximum", |s, _| {
            s.a = LARGE_MAX;
            s.b = LARGE_MAX;
            Ok(())
        })
        .case("random large", |s, rng| {
            s.a = rng.gen_range(SMALL_MAX + 1..=LARGE_MAX);
            s.b = rng.gen_range(1..=LARGE_MAX);
            Ok(())
        })
        .build()
}

fn problem() -> Result<Problem<Sum>> {
    let io: Arc<dyn IoFormat<Sum>> = Arc::new(SumIo);
    let problem = Problem::builder(io, constraints()?, test_suite()).build()?;
    Ok(problem)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let problem = problem().context("Invalid problem declaration")?;
    Ok(Runner::new(problem).run().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcforge::generator::TracingGeneratorLogger;
    use tcforge::os::{LocalExecutor, LocalFileSystem};
    use tcforge::{GeneratorConfig, GradingPlan, TestSuiteGenerator};

    #[test]
    fn test_declaration_is_valid() {
        let problem = problem().unwrap();
        let plan = GradingPlan::for_problem(&problem, "sum", false);

        assert_eq!(plan.units.len(), 8);
        assert_eq!(plan.units[2].id, "sum_1_1");
        assert_eq!(plan.subtasks.iter().map(|s| s.points).sum::<f64>(), 100.0);
    }

    #[test]
    fn test_io_roundtrip_of_sample() {
        let parsed = SumIo.parse_input("1000 1000\n").unwrap();
        assert_eq!(SumIo.write_input(&parsed).unwrap(), "1000 1000\n");
        assert!(SumIo.parse_input("7").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_every_declared_case_generates() {
        let dir = tempfile::tempdir().unwrap();
        let problem = problem().unwrap();
        let config = GeneratorConfig {
            slug: "sum".to_string(),
            seed: 7,
            solution_command: "awk '{ print $1 + $2 }'".to_string(),
            output_dir: dir.path().join("tc"),
            multiple_test_cases: false,
        };
        let generator = TestSuiteGenerator::for_problem(
            &problem,
            Arc::new(LocalFileSystem),
            Arc::new(LocalExecutor),
            Arc::new(TracingGeneratorLogger),
        );

        let result = generator.generate(&problem, &config).await.unwrap();

        assert!(result.is_successful(), "{:?}", result);
        assert_eq!(result.test_case_count(), 8);
        let expected = std::fs::read_to_string(dir.path().join("tc/sum_2_2.out")).unwrap();
        assert_eq!(expected, "2000000000\n");
    }
}
