//! Grading pipeline.
//!
//! Evaluator (run + classify) -> Scorer (compare output) -> Aggregator
//! (fold verdicts per subtask). Every unit is graded; a failing test case
//! is data in the report, never an error.

pub mod aggregator;
pub mod engine;
pub mod evaluator;
pub mod logger;
pub mod scorer;

pub use aggregator::{Aggregator, MinAggregator, SubtaskScore, SumAggregator};
pub use engine::Grader;
pub use evaluator::{classify_execution, BatchEvaluator, EvaluationResult};
pub use logger::{GraderLogger, TracingGraderLogger};
pub use scorer::{CustomScorer, DiffScorer, Scorer, ScoringResult};

use crate::problem::Problem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tcforge_common::naming;
use tcforge_common::types::{SubtaskId, Verdict, SAMPLE_GROUP_ID};

/// One solution run: a test case, or a combined file in multiple-test-case mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingUnit {
    pub id: String,
    /// Empty for samples that count toward no subtask
    pub subtask_ids: BTreeSet<SubtaskId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubtaskWeight {
    pub id: SubtaskId,
    pub points: f64,
}

/// What there is to grade for a problem, derived from its declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingPlan {
    pub units: Vec<GradingUnit>,
    pub subtasks: Vec<SubtaskWeight>,
}

impl GradingPlan {
    /// Units in generation order: samples, then official groups
    pub fn for_problem<S>(problem: &Problem<S>, slug: &str, multiple_test_cases: bool) -> Self {
        let suite = problem.test_suite();
        let mut groups: Vec<(u32, Vec<BTreeSet<SubtaskId>>)> = Vec::with_capacity(suite.official_groups().len() + 1);

        groups.push((
            SAMPLE_GROUP_ID,
            suite
                .sample_tests()
                .iter()
                .map(|s| problem.resolve_assignment(&s.subtask_ids))
                .collect(),
        ));
        for group in suite.official_groups() {
            let assignment = problem.resolve_assignment(&group.subtask_ids);
            groups.push((group.id, vec![assignment; group.test_cases.len()]));
        }

        let mut units = Vec::new();
        for (group_id, assignments) in groups {
            if multiple_test_cases {
                if !assignments.is_empty() {
                    units.push(GradingUnit {
                        id: naming::combined_test_case_id(slug, group_id),
                        subtask_ids: assignments.into_iter().flatten().collect(),
                    });
                }
            } else {
                units.extend(assignments.into_iter().enumerate().map(|(index, subtask_ids)| GradingUnit {
                    id: naming::test_case_id(slug, group_id, index + 1),
                    subtask_ids,
                }));
            }
        }

        let subtasks = problem
            .constraints()
            .scoring_subtasks()
            .into_iter()
            .map(|s| SubtaskWeight {
                id: s.id(),
                points: s.points(),
            })
            .collect();

        Self { units, subtasks }
    }

    pub fn subtask_ids(&self) -> BTreeSet<SubtaskId> {
        self.subtasks.iter().map(|s| s.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseGrade {
    pub id: String,
    pub subtask_ids: BTreeSet<SubtaskId>,
    pub verdict: Verdict,
    pub execution_time_ms: u64,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingReport {
    /// In plan order, independent of completion order
    pub test_cases: Vec<TestCaseGrade>,
    pub subtasks: Vec<SubtaskScore>,
    /// Worst verdict over every graded unit
    pub verdict: Option<Verdict>,
    pub score: f64,
}

impl GradingReport {
    pub fn is_accepted(&self) -> bool {
        self.verdict.is_some_and(|v| v.is_accepted())
    }

    pub fn max_score(&self) -> f64 {
        self.subtasks.iter().map(|s| s.points).sum()
    }
}
