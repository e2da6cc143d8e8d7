use super::logger::GeneratorLogger;
use super::result::{TestCaseGenerationFailure, TestCaseGenerationResult};
use super::run_solution;
use crate::io::IoFormat;
use crate::os::{FileSystem, ProcessExecutor};
use crate::problem::{Random, TestCase};
use crate::verifier::Verifier;
use std::sync::Arc;
use tcforge_common::naming;
use tcforge_common::types::GeneratorConfig;

/// A test case that made it through generation, kept for combining
#[derive(Debug)]
pub struct GeneratedTestCase<S> {
    pub state: S,
    pub input: String,
}

/// Generates a single test case:
/// apply -> write input -> verify -> (single-case mode) write expected output
pub struct TestCaseGenerator<S> {
    verifier: Arc<Verifier<S>>,
    io: Arc<dyn IoFormat<S>>,
    fs: Arc<dyn FileSystem>,
    executor: Arc<dyn ProcessExecutor>,
    logger: Arc<dyn GeneratorLogger>,
}

fn other_failure(error: anyhow::Error) -> TestCaseGenerationFailure {
    TestCaseGenerationFailure::other(format!("{:#}", error))
}

impl<S: Default + Send + Sync + 'static> TestCaseGenerator<S> {
    pub fn new(
        verifier: Arc<Verifier<S>>,
        io: Arc<dyn IoFormat<S>>,
        fs: Arc<dyn FileSystem>,
        executor: Arc<dyn ProcessExecutor>,
        logger: Arc<dyn GeneratorLogger>,
    ) -> Self {
        Self {
            verifier,
            io,
            fs,
            executor,
            logger,
        }
    }

    pub async fn generate(
        &self,
        test_case: &TestCase<S>,
        rng: &mut Random,
        config: &GeneratorConfig,
    ) -> (TestCaseGenerationResult, Option<GeneratedTestCase<S>>) {
        self.logger.log_test_case_introduction(test_case.id());

        let description = test_case.description().map(str::to_string);
        let (result, generated) = match self.try_generate(test_case, rng, config).await {
            Ok(generated) => (
                TestCaseGenerationResult::successful(test_case.id(), description),
                Some(generated),
            ),
            Err(failure) => (
                TestCaseGenerationResult::failed(test_case.id(), description, failure),
                None,
            ),
        };

        self.logger.log_test_case_result(&result);
        (result, generated)
    }

    async fn try_generate(
        &self,
        test_case: &TestCase<S>,
        rng: &mut Random,
        config: &GeneratorConfig,
    ) -> Result<GeneratedTestCase<S>, TestCaseGenerationFailure> {
        let mut state = S::default();
        test_case.apply(&mut state, rng).map_err(other_failure)?;

        let input = self.io.write_input(&state).map_err(other_failure)?;
        let input_path = naming::input_path(&config.output_dir, test_case.id());
        self.fs
            .write_file(&input_path, &input)
            .await
            .map_err(other_failure)?;

        // Unassigned samples are held to the global constraints only
        let verification = if test_case.subtask_ids().is_empty() {
            self.verifier.verify_global(&state)
        } else {
            self.verifier.verify(&state, test_case.subtask_ids())
        };
        if !verification.is_valid() {
            return Err(TestCaseGenerationFailure::Verification { result: verification });
        }

        if !config.multiple_test_cases {
            let output_path = naming::output_path(&config.output_dir, test_case.id());
            run_solution(
                self.executor.as_ref(),
                self.fs.as_ref(),
                &config.solution_command,
                &input_path,
                &output_path,
            )
            .await
            .map_err(other_failure)?;
        }

        Ok(GeneratedTestCase { state, input })
    }
}
