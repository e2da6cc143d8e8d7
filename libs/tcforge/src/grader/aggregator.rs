/// Aggregators - Fold Test Case Grades Into a Subtask Score
///
/// **Policies:**
/// - [`MinAggregator`]: all-or-nothing; full points only if every test
///   case of the subtask is OK
/// - [`SumAggregator`]: points proportional to the fraction of OK test cases
///
/// Both report the worst verdict of the subtask. A subtask with no test
/// cases scores nothing and has no verdict.
use super::TestCaseGrade;
use serde::{Deserialize, Serialize};
use tcforge_common::types::{SubtaskId, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskScore {
    pub subtask_id: SubtaskId,
    /// Points the subtask is worth
    pub points: f64,
    pub verdict: Option<Verdict>,
    /// Points earned
    pub score: f64,
    pub test_cases: usize,
    pub passed: usize,
}

pub trait Aggregator: Send + Sync {
    fn aggregate(&self, subtask_id: SubtaskId, points: f64, grades: &[&TestCaseGrade]) -> SubtaskScore;
}

fn tally(subtask_id: SubtaskId, points: f64, grades: &[&TestCaseGrade]) -> SubtaskScore {
    SubtaskScore {
        subtask_id,
        points,
        verdict: Verdict::worst(grades.iter().map(|g| g.verdict)),
        score: 0.0,
        test_cases: grades.len(),
        passed: grades.iter().filter(|g| g.verdict.is_accepted()).count(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinAggregator;

impl Aggregator for MinAggregator {
    fn aggregate(&self, subtask_id: SubtaskId, points: f64, grades: &[&TestCaseGrade]) -> SubtaskScore {
        let mut score = tally(subtask_id, points, grades);
        if score.test_cases > 0 && score.passed == score.test_cases {
            score.score = points;
        }
        score
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SumAggregator;

impl Aggregator for SumAggregator {
    fn aggregate(&self, subtask_id: SubtaskId, points: f64, grades: &[&TestCaseGrade]) -> SubtaskScore {
        let mut score = tally(subtask_id, points, grades);
        if score.test_cases > 0 {
            score.score = points * score.passed as f64 / score.test_cases as f64;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn grade(id: &str, verdict: Verdict) -> TestCaseGrade {
        TestCaseGrade {
            id: id.to_string(),
            subtask_ids: BTreeSet::from([1]),
            verdict,
            execution_time_ms: 10,
            detail: None,
        }
    }

    #[test]
    fn test_min_all_passed() {
        let grades = [grade("a", Verdict::Ok), grade("b", Verdict::Ok)];
        let refs: Vec<_> = grades.iter().collect();

        let score = MinAggregator.aggregate(1, 40.0, &refs);

        assert_eq!(score.verdict, Some(Verdict::Ok));
        assert_eq!(score.score, 40.0);
        assert_eq!(score.passed, 2);
    }

    #[test]
    fn test_min_single_failure_zeroes_subtask() {
        let grades = [
            grade("a", Verdict::Ok),
            grade("b", Verdict::WrongAnswer),
            grade("c", Verdict::Ok),
        ];
        let refs: Vec<_> = grades.iter().collect();

        let score = MinAggregator.aggregate(1, 40.0, &refs);

        assert_eq!(score.verdict, Some(Verdict::WrongAnswer));
        assert_eq!(score.score, 0.0);
        assert_eq!(score.passed, 2);
    }

    #[test]
    fn test_worst_verdict_reported() {
        let grades = [
            grade("a", Verdict::RuntimeError),
            grade("b", Verdict::TimeLimitExceeded),
            grade("c", Verdict::WrongAnswer),
        ];
        let refs: Vec<_> = grades.iter().collect();

        assert_eq!(
            MinAggregator.aggregate(1, 40.0, &refs).verdict,
            Some(Verdict::TimeLimitExceeded)
        );
    }

    #[test]
    fn test_sum_partial_credit() {
        let grades = [
            grade("a", Verdict::Ok),
            grade("b", Verdict::WrongAnswer),
            grade("c", Verdict::Ok),
            grade("d", Verdict::Ok),
        ];
        let refs: Vec<_> = grades.iter().collect();

        let score = SumAggregator.aggregate(2, 60.0, &refs);

        assert_eq!(score.score, 45.0);
        assert_eq!(score.verdict, Some(Verdict::WrongAnswer));
    }

    #[test]
    fn test_empty_subtask_scores_nothing() {
        for score in [MinAggregator.aggregate(3, 20.0, &[]), SumAggregator.aggregate(3, 20.0, &[])] {
            assert_eq!(score.verdict, None);
            assert_eq!(score.score, 0.0);
            assert_eq!(score.test_cases, 0);
        }
    }
}
