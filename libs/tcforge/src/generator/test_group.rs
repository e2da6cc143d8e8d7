use super::combiner::MultipleTestCasesCombiner;
use super::logger::GeneratorLogger;
use super::result::{TestCaseGenerationResult, TestGroupGenerationResult};
use super::test_case::TestCaseGenerator;
use crate::problem::{Random, TestGroup};
use std::sync::Arc;
use tcforge_common::types::GeneratorConfig;
use tracing::debug;

pub struct TestGroupGenerator<S> {
    test_case_generator: TestCaseGenerator<S>,
    combiner: MultipleTestCasesCombiner<S>,
    logger: Arc<dyn GeneratorLogger>,
}

impl<S: Default + Send + Sync + 'static> TestGroupGenerator<S> {
    pub fn new(
        test_case_generator: TestCaseGenerator<S>,
        combiner: MultipleTestCasesCombiner<S>,
        logger: Arc<dyn GeneratorLogger>,
    ) -> Self {
        Self {
            test_case_generator,
            combiner,
            logger,
        }
    }

    /// Generate every test case of the group, in order, regardless of
    /// earlier failures; then combine the group when running in
    /// multiple-test-case mode and every case succeeded
    pub async fn generate(
        &self,
        group: &TestGroup<S>,
        rng: &mut Random,
        config: &GeneratorConfig,
    ) -> TestGroupGenerationResult {
        self.logger.log_test_group_introduction(group.id);

        let mut test_cases = Vec::with_capacity(group.test_cases.len());
        let mut states = Vec::with_capacity(group.test_cases.len());
        let mut inputs = Vec::with_capacity(group.test_cases.len());

        for test_case in &group.test_cases {
            let (result, generated) = self.test_case_generator.generate(test_case, rng, config).await;
            if let Some(generated) = generated {
                states.push(generated.state);
                inputs.push(generated.input);
            }
            test_cases.push(result);
        }

        let combination = if !config.multiple_test_cases || group.test_cases.is_empty() {
            None
        } else if test_cases.iter().all(TestCaseGenerationResult::is_successful) {
            Some(self.combiner.combine(group.id, &states, &inputs, config).await)
        } else {
            debug!(group_id = group.id, "Skipping combination of a group with failed test cases");
            None
        };

        TestGroupGenerationResult {
            group_id: group.id,
            test_cases,
            combination,
        }
    }
}
