//! Command line entry point shared by every problem binary.
//!
//! A problem binary builds its [`Problem`] and hands it to [`Runner::run`],
//! which parses the command line, loads `problem.json`, and runs either
//! the generation or the grading pipeline.

use crate::config::{ProblemMetadata, DEFAULT_METADATA_PATH};
use crate::error::DeclarationError;
use crate::generator::{GenerationResult, TestSuiteGenerator, TracingGeneratorLogger};
use crate::grader::{
    Aggregator, CustomScorer, DiffScorer, Grader, GradingPlan, GradingReport, MinAggregator, Scorer, SumAggregator,
    TracingGraderLogger,
};
use crate::os::{FileSystem, LocalExecutor, LocalFileSystem, ProcessExecutor};
use crate::problem::Problem;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tcforge_common::types::{GeneratorConfig, GradingConfig, SubtaskId};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(about = "Generate and grade test cases for a contest problem", long_about = None)]
pub struct Cli {
    /// Problem slug; overrides problem.json and the executable name
    #[arg(long, global = true)]
    pub slug: Option<String>,

    /// Problem metadata file
    #[arg(long, global = true, default_value = DEFAULT_METADATA_PATH)]
    pub metadata: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate test case inputs and expected outputs
    Gen(GenArgs),

    /// Grade a solution against generated test cases
    Grade(GradeArgs),
}

#[derive(Debug, Args)]
pub struct GenArgs {
    /// Seed for the random generator handed to test cases
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Reference solution producing expected outputs
    #[arg(long, env = "TCFORGE_SOLUTION", default_value = "./solution")]
    pub solution: String,

    /// Test cases directory
    #[arg(long, env = "TCFORGE_OUTPUT", default_value = "tc")]
    pub output: PathBuf,

    /// Print the generation report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AggregationPolicy {
    /// Full points only when every test case passes
    Min,
    /// Points proportional to passed test cases
    Sum,
}

#[derive(Debug, Args)]
pub struct GradeArgs {
    /// Solution to grade
    #[arg(long, env = "TCFORGE_SOLUTION", default_value = "./solution")]
    pub solution: String,

    /// Test cases directory
    #[arg(long, env = "TCFORGE_OUTPUT", default_value = "tc")]
    pub output: PathBuf,

    /// Time limit in milliseconds; overrides problem.json
    #[arg(long, conflicts_with = "no_time_limit")]
    pub time_limit: Option<u64>,

    /// Memory limit in megabytes; overrides problem.json
    #[arg(long, conflicts_with = "no_memory_limit")]
    pub memory_limit: Option<u64>,

    #[arg(long)]
    pub no_time_limit: bool,

    #[arg(long)]
    pub no_memory_limit: bool,

    /// Maximum number of solution processes running at once
    #[arg(long, env = "TCFORGE_WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Checker run as `<checker> <input> <expected> <actual>` instead of diff
    #[arg(long)]
    pub checker: Option<String>,

    #[arg(long, value_enum, default_value_t = AggregationPolicy::Min)]
    pub aggregation: AggregationPolicy,

    /// Grade only these subtasks (repeatable); all by default
    #[arg(long = "subtask")]
    pub subtasks: Vec<SubtaskId>,

    /// Print the grading report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Initialize tracing subscriber; logs go to stderr so stdout stays
/// free for the JSON report
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Slug precedence: flag, then metadata, then the executable's file stem
pub fn resolve_slug(flag: Option<&str>, metadata: &ProblemMetadata, executable: Option<&Path>) -> Result<String> {
    let slug = flag
        .map(str::to_string)
        .or_else(|| metadata.slug.clone())
        .or_else(|| {
            executable
                .and_then(Path::file_stem)
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .ok_or_else(|| anyhow!("Cannot determine problem slug; pass --slug"))?;

    if slug.trim().is_empty() {
        return Err(DeclarationError::EmptySlug.into());
    }
    Ok(slug)
}

pub fn generator_config(args: &GenArgs, slug: String, multiple_test_cases: bool) -> GeneratorConfig {
    GeneratorConfig {
        slug,
        seed: args.seed,
        solution_command: args.solution.clone(),
        output_dir: args.output.clone(),
        multiple_test_cases,
    }
}

/// Limits: flag, then metadata; `--no-*` removes the limit entirely
pub fn grading_config(
    args: &GradeArgs,
    slug: String,
    metadata: &ProblemMetadata,
    multiple_test_cases: bool,
) -> GradingConfig {
    let time_limit_ms = if args.no_time_limit {
        None
    } else {
        args.time_limit.or(metadata.time_limit_ms)
    };
    let memory_limit_mb = if args.no_memory_limit {
        None
    } else {
        args.memory_limit.or(metadata.memory_limit_mb)
    };

    GradingConfig {
        slug,
        solution_command: args.solution.clone(),
        test_cases_dir: args.output.clone(),
        time_limit_ms,
        memory_limit_mb,
        multiple_test_cases,
        workers: args.workers.max(1),
    }
}

/// Outcome of one command: whether it succeeded, plus its report
#[derive(Debug)]
pub enum Outcome {
    Generated(GenerationResult),
    Graded(GradingReport),
}

impl Outcome {
    /// Generation succeeds only if every test case did; grading succeeds
    /// whenever a report was produced
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Generated(result) => result.is_successful(),
            Outcome::Graded(_) => true,
        }
    }

    fn to_json(&self) -> Result<String> {
        fn pretty<T: Serialize>(value: &T) -> Result<String> {
            serde_json::to_string_pretty(value).context("Failed to serialize report")
        }
        match self {
            Outcome::Generated(result) => pretty(result),
            Outcome::Graded(report) => pretty(report),
        }
    }
}

pub struct Runner<S> {
    problem: Problem<S>,
    fs: Arc<dyn FileSystem>,
    executor: Arc<dyn ProcessExecutor>,
}

impl<S: Default + Send + Sync + 'static> Runner<S> {
    pub fn new(problem: Problem<S>) -> Self {
        Self {
            problem,
            fs: Arc::new(LocalFileSystem),
            executor: Arc::new(LocalExecutor),
        }
    }

    /// Replace the local file system and process executor
    pub fn with_collaborators(mut self, fs: Arc<dyn FileSystem>, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.fs = fs;
        self.executor = executor;
        self
    }

    /// Parse the process arguments and run; never returns an error
    pub async fn run(self) -> ExitCode {
        let cli = Cli::parse();
        init_tracing(cli.log_json);

        let json = match &cli.command {
            Command::Gen(args) => args.json,
            Command::Grade(args) => args.json,
        };

        let outcome = tokio::select! {
            outcome = self.execute(cli) => outcome,
            interrupted = signal::ctrl_c() => match interrupted {
                Ok(()) => Err(anyhow!("Interrupted")),
                Err(e) => Err(e).context("Failed to listen for interrupt signal"),
            },
        };

        match outcome.and_then(|outcome| {
            if json {
                println!("{}", outcome.to_json()?);
            }
            Ok(outcome.is_success())
        }) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                error!(error = %format!("{:#}", e), "Run failed");
                ExitCode::FAILURE
            }
        }
    }

    pub async fn execute(&self, cli: Cli) -> Result<Outcome> {
        let metadata = ProblemMetadata::load(&cli.metadata)?;
        let executable = std::env::current_exe().ok();
        let slug = resolve_slug(cli.slug.as_deref(), &metadata, executable.as_deref())?;
        let multiple_test_cases = self.problem.multiple_test_cases();

        match cli.command {
            Command::Gen(args) => {
                let config = generator_config(&args, slug, multiple_test_cases);
                self.generate(&config).await.map(Outcome::Generated)
            }
            Command::Grade(args) => {
                let config = grading_config(&args, slug, &metadata, multiple_test_cases);
                self.grade(&args, &config).await.map(Outcome::Graded)
            }
        }
    }

    async fn generate(&self, config: &GeneratorConfig) -> Result<GenerationResult> {
        let generator = TestSuiteGenerator::for_problem(
            &self.problem,
            Arc::clone(&self.fs),
            Arc::clone(&self.executor),
            Arc::new(TracingGeneratorLogger),
        );
        generator.generate(&self.problem, config).await
    }

    async fn grade(&self, args: &GradeArgs, config: &GradingConfig) -> Result<GradingReport> {
        info!(
            slug = %config.slug,
            solution = %config.solution_command,
            time_limit_ms = ?config.time_limit_ms,
            memory_limit_mb = ?config.memory_limit_mb,
            workers = config.workers,
            "Starting grading"
        );

        let scorer: Arc<dyn Scorer> = match &args.checker {
            Some(checker) => Arc::new(CustomScorer::new(
                checker.as_str(),
                Arc::clone(&self.fs),
                Arc::clone(&self.executor),
            )),
            None => Arc::new(DiffScorer::new(Arc::clone(&self.fs))),
        };
        let aggregator: Arc<dyn Aggregator> = match args.aggregation {
            AggregationPolicy::Min => Arc::new(MinAggregator),
            AggregationPolicy::Sum => Arc::new(SumAggregator),
        };

        let plan = GradingPlan::for_problem(&self.problem, &config.slug, config.multiple_test_cases);
        let subtask_ids: BTreeSet<SubtaskId> = if args.subtasks.is_empty() {
            plan.subtask_ids()
        } else {
            args.subtasks.iter().copied().collect()
        };

        let grader = Grader::new(
            Arc::clone(&self.executor),
            scorer,
            aggregator,
            Arc::new(TracingGraderLogger),
        );
        grader.grade(&plan, &subtask_ids, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintSuite;
    use crate::problem::TestSuite;
    use crate::testing::{ab_io, Ab, InMemoryFileSystem, ScriptedExecutor};
    use tcforge_common::types::Verdict;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sum").chain(args.iter().copied())).unwrap()
    }

    fn grade_args(cli: Cli) -> GradeArgs {
        match cli.command {
            Command::Grade(args) => args,
            other => panic!("expected grade, got {:?}", other),
        }
    }

    fn runner(fs: Arc<InMemoryFileSystem>, executor: Arc<ScriptedExecutor>) -> Runner<Ab> {
        let constraints = ConstraintSuite::<Ab>::builder()
            .constraint("1 <= A", |s: &Ab| 1 <= s.a)
            .subtask(1, 30.0)
            .constraint("A <= 10", |s| s.a <= 10)
            .subtask(2, 70.0)
            .build()
            .unwrap();
        let suite = TestSuite::<Ab>::builder()
            .sample_for("1 2\n", [1, 2])
            .group([1, 2])
            .case("A = 3", |s, _| {
                s.a = 3;
                s.b = 4;
                Ok(())
            })
            .group([2])
            .case("A = 50", |s, _| {
                s.a = 50;
                s.b = 1;
                Ok(())
            })
            .build();
        let problem = Problem::builder(ab_io(), constraints, suite).build().unwrap();
        Runner::new(problem).with_collaborators(fs, executor)
    }

    #[test]
    fn test_gen_defaults() {
        let cli = parse(&["gen"]);
        let Command::Gen(args) = cli.command else {
            panic!("expected gen");
        };
        assert_eq!(args.seed, 0);
        assert_eq!(args.output, PathBuf::from("tc"));
        assert!(!args.json);
        assert_eq!(cli.metadata, PathBuf::from("problem.json"));
    }

    #[test]
    fn test_limits_precedence() {
        let metadata = ProblemMetadata {
            slug: None,
            time_limit_ms: Some(2000),
            memory_limit_mb: Some(256),
        };

        let args = grade_args(parse(&["grade", "--time-limit", "500"]));
        let config = grading_config(&args, "sum".to_string(), &metadata, false);
        assert_eq!(config.time_limit_ms, Some(500));
        assert_eq!(config.memory_limit_mb, Some(256));

        let args = grade_args(parse(&["grade", "--no-time-limit", "--no-memory-limit"]));
        let config = grading_config(&args, "sum".to_string(), &metadata, false);
        assert_eq!(config.time_limit_ms, None);
        assert_eq!(config.memory_limit_mb, None);
    }

    #[test]
    fn test_conflicting_limit_flags_rejected() {
        let result = Cli::try_parse_from(["sum", "grade", "--time-limit", "5", "--no-time-limit"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_grade_flags() {
        let args = grade_args(parse(&[
            "grade",
            "--aggregation",
            "sum",
            "--subtask",
            "1",
            "--subtask",
            "2",
            "--checker",
            "./checker",
            "--workers",
            "0",
        ]));
        assert_eq!(args.aggregation, AggregationPolicy::Sum);
        assert_eq!(args.subtasks, vec![1, 2]);
        assert_eq!(args.checker.as_deref(), Some("./checker"));

        let config = grading_config(&args, "sum".to_string(), &ProblemMetadata::default(), false);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_slug_resolution_order() {
        let metadata = ProblemMetadata {
            slug: Some("from-metadata".to_string()),
            ..Default::default()
        };
        let exe = Path::new("/usr/bin/sum-problem");

        assert_eq!(resolve_slug(Some("flag"), &metadata, Some(exe)).unwrap(), "flag");
        assert_eq!(resolve_slug(None, &metadata, Some(exe)).unwrap(), "from-metadata");
        assert_eq!(
            resolve_slug(None, &ProblemMetadata::default(), Some(exe)).unwrap(),
            "sum-problem"
        );
        assert!(resolve_slug(None, &ProblemMetadata::default(), None).is_err());

        let err = resolve_slug(Some(" "), &metadata, None).unwrap_err();
        assert_eq!(err.downcast_ref::<DeclarationError>(), Some(&DeclarationError::EmptySlug));
    }

    #[tokio::test]
    async fn test_gen_then_grade_through_runner() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = dir.path().join("problem.json");
        std::fs::write(&metadata, r#"{"slug": "sum", "time_limit_ms": 1000}"#).unwrap();
        let metadata = metadata.to_string_lossy().into_owned();

        let fs = Arc::new(InMemoryFileSystem::new());
        let executor = Arc::new(ScriptedExecutor::summing(Arc::clone(&fs)));
        let runner = runner(fs.clone(), executor.clone());

        let generated = runner.execute(parse(&["--metadata", &metadata, "gen"])).await.unwrap();
        assert!(generated.is_success());
        assert_eq!(fs.content(Path::new("tc/sum_1_1.out")).as_deref(), Some("7\n"));

        let graded = runner
            .execute(parse(&["--metadata", &metadata, "grade", "--workers", "2"]))
            .await
            .unwrap();
        let Outcome::Graded(report) = graded else {
            panic!("expected a grading report");
        };
        assert_eq!(report.verdict, Some(Verdict::Ok));
        assert_eq!(report.score, 100.0);
        assert!(executor
            .calls()
            .iter()
            .filter(|c| c.time_limit_ms.is_some())
            .all(|c| c.time_limit_ms == Some(1000)));
    }

    #[tokio::test]
    async fn test_failed_generation_is_unsuccessful_outcome() {
        let fs = Arc::new(InMemoryFileSystem::new());
        let executor = Arc::new(ScriptedExecutor::summing(Arc::clone(&fs)));
        executor.crash_on("sum_2_1.in");

        let outcome = runner(fs, executor)
            .execute(parse(&["--slug", "sum", "--metadata", "/nonexistent/problem.json", "gen"]))
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert!(outcome.to_json().unwrap().contains("\"OTHER\""));
    }
}
