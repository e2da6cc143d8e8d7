/// Grading Engine - Runs a Solution Over a Whole Plan
///
/// **Responsibilities:**
/// - Grade every unit in the plan that belongs to a requested subtask, plus
///   unassigned samples
/// - Bound concurrency with a semaphore of `workers` permits
/// - Keep report order equal to plan order
/// - Fold grades into subtask scores via the configured Aggregator
///
/// Collaborator failures (missing expected output, spawn failures) abort
/// the run; dropping the remaining futures kills their processes.
use super::aggregator::Aggregator;
use super::evaluator::BatchEvaluator;
use super::logger::GraderLogger;
use super::scorer::Scorer;
use super::{GradingPlan, GradingReport, GradingUnit, TestCaseGrade};
use crate::generator::describe_failure;
use crate::os::ProcessExecutor;
use anyhow::{bail, Context, Result};
use futures_util::future::try_join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tcforge_common::types::{GradingConfig, SubtaskId, Verdict};
use tokio::sync::Semaphore;
use tracing::debug;

pub struct Grader {
    evaluator: BatchEvaluator,
    scorer: Arc<dyn Scorer>,
    aggregator: Arc<dyn Aggregator>,
    logger: Arc<dyn GraderLogger>,
}

impl Grader {
    pub fn new(
        executor: Arc<dyn ProcessExecutor>,
        scorer: Arc<dyn Scorer>,
        aggregator: Arc<dyn Aggregator>,
        logger: Arc<dyn GraderLogger>,
    ) -> Self {
        Self {
            evaluator: BatchEvaluator::new(executor),
            scorer,
            aggregator,
            logger,
        }
    }

    /// Evaluate and score a single unit
    pub async fn grade_test_case(&self, unit: &GradingUnit, config: &GradingConfig) -> Result<TestCaseGrade> {
        let evaluation = self.evaluator.evaluate(unit, config).await?;

        let (verdict, detail) = match evaluation.verdict {
            Some(verdict) => (verdict, Some(describe_failure(&evaluation.execution))),
            None => {
                let scored = self
                    .scorer
                    .score(unit, config, &evaluation.execution.stdout)
                    .await?;
                (scored.verdict, scored.detail)
            }
        };

        Ok(TestCaseGrade {
            id: unit.id.clone(),
            subtask_ids: unit.subtask_ids.clone(),
            verdict,
            execution_time_ms: evaluation.execution.execution_time_ms,
            detail,
        })
    }

    pub async fn grade(
        &self,
        plan: &GradingPlan,
        subtask_ids: &BTreeSet<SubtaskId>,
        config: &GradingConfig,
    ) -> Result<GradingReport> {
        if let Some(unknown) = subtask_ids.difference(&plan.subtask_ids()).next() {
            bail!("Unknown subtask {}", unknown);
        }

        let units: Vec<&GradingUnit> = plan
            .units
            .iter()
            .filter(|u| u.subtask_ids.is_empty() || !u.subtask_ids.is_disjoint(subtask_ids))
            .collect();
        self.logger.log_introduction(units.len());

        let workers = config.workers.max(1);
        debug!(units = units.len(), workers, "Starting grading pool");
        let semaphore = Semaphore::new(workers);

        let test_cases = try_join_all(units.iter().map(|unit| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.context("Grading pool closed")?;
                let grade = self
                    .grade_test_case(unit, config)
                    .await
                    .with_context(|| format!("Failed to grade {}", unit.id))?;
                self.logger.log_test_case_grade(&grade);
                Ok::<_, anyhow::Error>(grade)
            }
        }))
        .await?;

        let subtasks: Vec<_> = plan
            .subtasks
            .iter()
            .filter(|s| subtask_ids.contains(&s.id))
            .map(|s| {
                let grades: Vec<&TestCaseGrade> = test_cases
                    .iter()
                    .filter(|g| g.subtask_ids.contains(&s.id))
                    .collect();
                self.aggregator.aggregate(s.id, s.points, &grades)
            })
            .collect();

        let report = GradingReport {
            verdict: Verdict::worst(test_cases.iter().map(|g| g.verdict)),
            score: subtasks.iter().map(|s| s.score).sum(),
            test_cases,
            subtasks,
        };

        self.logger.log_result(&report);
        Ok(report)
    }
}
