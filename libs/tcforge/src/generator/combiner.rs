use super::logger::GeneratorLogger;
use super::result::{CombinationFailure, MultipleTestCasesCombinationResult};
use super::run_solution;
use crate::constraint::CombinedCases;
use crate::io::IoFormat;
use crate::os::{FileSystem, ProcessExecutor};
use crate::verifier::Verifier;
use std::sync::Arc;
use tcforge_common::naming;
use tcforge_common::types::{GeneratorConfig, GroupId};

/// Merges the already generated cases of one group into a single file and
/// verifies the multiple-test-case constraints against it
pub struct MultipleTestCasesCombiner<S> {
    verifier: Arc<Verifier<S>>,
    io: Arc<dyn IoFormat<S>>,
    fs: Arc<dyn FileSystem>,
    executor: Arc<dyn ProcessExecutor>,
    logger: Arc<dyn GeneratorLogger>,
}

impl<S: Send + Sync + 'static> MultipleTestCasesCombiner<S> {
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

    pub async fn combine(
        &self,
        group_id: GroupId,
        states: &[S],
        inputs: &[String],
        config: &GeneratorConfig,
    ) -> MultipleTestCasesCombinationResult {
        let id = naming::combined_test_case_id(&config.slug, group_id);
        self.logger.log_multiple_test_cases_combination_introduction(&id);

        let failure = self.try_combine(&id, states, inputs, config).await.err();
        let result = MultipleTestCasesCombinationResult { id, failure };

        self.logger.log_multiple_test_cases_combination_result(&result);
        result
    }

    async fn try_combine(
        &self,
        id: &str,
        states: &[S],
        inputs: &[String],
        config: &GeneratorConfig,
    ) -> Result<(), CombinationFailure> {
        let other = |e: anyhow::Error| CombinationFailure::Other {
            message: format!("{:#}", e),
        };

        let combined = self.io.combine_inputs(inputs);
        let input_path = naming::input_path(&config.output_dir, id);
        self.fs.write_file(&input_path, &combined).await.map_err(other)?;

        let verification = self.verifier.verify_multiple_test_cases(&CombinedCases { states, inputs });
        if !verification.is_valid() {
            return Err(CombinationFailure::Verification { result: verification });
        }

        let output_path = naming::output_path(&config.output_dir, id);
        run_solution(
            self.executor.as_ref(),
            self.fs.as_ref(),
            &config.solution_command,
            &input_path,
            &output_path,
        )
        .await
        .map_err(other)
    }
}
