use super::combiner::MultipleTestCasesCombiner;
use super::logger::GeneratorLogger;
use super::result::{GenerationResult, TestGroupGenerationResult};
use super::test_case::TestCaseGenerator;
use super::test_group::TestGroupGenerator;
use crate::os::{FileSystem, ProcessExecutor};
use crate::problem::{Applier, OfficialTestGroup, Problem, Random, TestCase, TestGroup};
use crate::verifier::Verifier;
use anyhow::{Context, Result};
use rand::SeedableRng;
use std::sync::Arc;
use tcforge_common::naming;
use tcforge_common::types::{GeneratorConfig, SAMPLE_GROUP_ID};
use tracing::info;

/// Drives generation of a whole problem: samples first, then every
/// official group in declaration order
pub struct TestSuiteGenerator<S> {
    test_group_generator: TestGroupGenerator<S>,
    fs: Arc<dyn FileSystem>,
    logger: Arc<dyn GeneratorLogger>,
}

impl<S: Default + Send + Sync + 'static> TestSuiteGenerator<S> {
    pub fn new(
        test_group_generator: TestGroupGenerator<S>,
        fs: Arc<dyn FileSystem>,
        logger: Arc<dyn GeneratorLogger>,
    ) -> Self {
        Self {
            test_group_generator,
            fs,
            logger,
        }
    }

    /// Wire the whole generator chain for a problem
    pub fn for_problem(
        problem: &Problem<S>,
        fs: Arc<dyn FileSystem>,
        executor: Arc<dyn ProcessExecutor>,
        logger: Arc<dyn GeneratorLogger>,
    ) -> Self {
        let verifier = Arc::new(Verifier::new(Arc::clone(problem.constraints())));
        let test_case_generator = TestCaseGenerator::new(
            Arc::clone(&verifier),
            Arc::clone(problem.io()),
            Arc::clone(&fs),
            Arc::clone(&executor),
            Arc::clone(&logger),
        );
        let combiner = MultipleTestCasesCombiner::new(
            verifier,
            Arc::clone(problem.io()),
            Arc::clone(&fs),
            executor,
            Arc::clone(&logger),
        );
        let test_group_generator = TestGroupGenerator::new(test_case_generator, combiner, Arc::clone(&logger));

        Self::new(test_group_generator, fs, logger)
    }

    /// Generate every test case of the problem.
    ///
    /// Per-test-case failures are recorded in the result; an `Err` means
    /// the output directory could not be prepared.
    pub async fn generate(&self, problem: &Problem<S>, config: &GeneratorConfig) -> Result<GenerationResult> {
        self.logger.log_introduction();

        self.fs
            .force_make_dir(&config.output_dir)
            .await
            .context("Failed to prepare test cases directory")?;

        info!(
            slug = %config.slug,
            seed = config.seed,
            output_dir = %config.output_dir.display(),
            multiple_test_cases = config.multiple_test_cases,
            "Starting generation"
        );

        let mut rng = Random::seed_from_u64(config.seed);
        let mut groups = Vec::with_capacity(problem.test_suite().official_groups().len() + 1);
        groups.push(self.generate_sample_tests(problem, config, &mut rng).await);
        for group in problem.test_suite().official_groups() {
            groups.push(self.generate_official_group(problem, group, config, &mut rng).await);
        }

        let result = GenerationResult::new(groups);
        self.logger.log_result(&result);
        Ok(result)
    }

    async fn generate_sample_tests(
        &self,
        problem: &Problem<S>,
        config: &GeneratorConfig,
        rng: &mut Random,
    ) -> TestGroupGenerationResult {
        let test_cases = problem
            .test_suite()
            .sample_tests()
            .iter()
            .enumerate()
            .map(|(index, sample)| {
                let io = Arc::clone(problem.io());
                let content = sample.content.clone();
                let applier: Applier<S> = Arc::new(move |state: &mut S, _: &mut Random| {
                    *state = io.parse_input(&content)?;
                    Ok(())
                });
                TestCase::new(
                    naming::test_case_id(&config.slug, SAMPLE_GROUP_ID, index + 1),
                    problem.resolve_assignment(&sample.subtask_ids),
                    applier,
                )
            })
            .collect();

        self.test_group_generator
            .generate(&TestGroup::new(SAMPLE_GROUP_ID, test_cases), rng, config)
            .await
    }

    async fn generate_official_group(
        &self,
        problem: &Problem<S>,
        group: &OfficialTestGroup<S>,
        config: &GeneratorConfig,
        rng: &mut Random,
    ) -> TestGroupGenerationResult {
        let subtask_ids = problem.resolve_assignment(&group.subtask_ids);
        let finalizer = problem.test_suite().input_finalizer().cloned();

        let test_cases = group
            .test_cases
            .iter()
            .enumerate()
            .map(|(index, official)| {
                let closure = Arc::clone(&official.closure);
                let finalizer = finalizer.clone();
                let applier: Applier<S> = Arc::new(move |state: &mut S, rng: &mut Random| {
                    closure(state, rng)?;
                    if let Some(finalize) = &finalizer {
                        finalize(state);
                    }
                    Ok(())
                });
                TestCase::new(
                    naming::test_case_id(&config.slug, group.id, index + 1),
                    subtask_ids.clone(),
                    applier,
                )
                .with_description(official.description.clone())
            })
            .collect();

        self.test_group_generator
            .generate(&TestGroup::new(group.id, test_cases), rng, config)
            .await
    }
}
