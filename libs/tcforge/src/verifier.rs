//! Constraint verification engine.
//!
//! Pure functions over already-bound state: no I/O, no shared mutation.
//! Every constraint of every subtask is evaluated so reports list all
//! violations, not just the first one.

use crate::constraint::{CombinedCases, ConstraintSuite, Subtask};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tcforge_common::types::SubtaskId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Subtask ID -> descriptions of violated constraints, in declaration order
    pub unsatisfied_constraints: BTreeMap<SubtaskId, Vec<String>>,
    /// Subtasks fully satisfied although the test case is not assigned to them
    pub satisfied_but_not_assigned_subtasks: BTreeSet<SubtaskId>,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        self.unsatisfied_constraints.is_empty() && self.satisfied_but_not_assigned_subtasks.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleTestCasesVerificationResult {
    pub unsatisfied_constraints: Vec<String>,
}

impl MultipleTestCasesVerificationResult {
    pub fn is_valid(&self) -> bool {
        self.unsatisfied_constraints.is_empty()
    }
}

fn violated_constraints<S>(subtask: &Subtask<S>, state: &S) -> Vec<String> {
    subtask
        .constraints()
        .iter()
        .filter(|c| !c.holds(state))
        .map(|c| c.description().to_string())
        .collect()
}

pub struct Verifier<S> {
    suite: Arc<ConstraintSuite<S>>,
}

impl<S> Verifier<S> {
    pub fn new(suite: Arc<ConstraintSuite<S>>) -> Self {
        Self { suite }
    }

    /// Verify bound state against the suite for a test case assigned to
    /// `assigned_subtask_ids`. The global subtask is always checked and is
    /// exempt from the assignment check.
    pub fn verify(&self, state: &S, assigned_subtask_ids: &BTreeSet<SubtaskId>) -> VerificationResult {
        verify_constraints(&self.suite, state, assigned_subtask_ids)
    }

    /// Verify against the global constraints alone
    pub fn verify_global(&self, state: &S) -> VerificationResult {
        let mut result = VerificationResult::default();
        let global = self.suite.global();
        let violated = violated_constraints(global, state);
        if !violated.is_empty() {
            result.unsatisfied_constraints.insert(global.id(), violated);
        }
        result
    }

    pub fn verify_multiple_test_cases(&self, cases: &CombinedCases<'_, S>) -> MultipleTestCasesVerificationResult {
        let unsatisfied_constraints = self
            .suite
            .multiple_test_cases_constraints()
            .iter()
            .filter(|c| !c.holds(cases))
            .map(|c| c.description().to_string())
            .collect();

        MultipleTestCasesVerificationResult { unsatisfied_constraints }
    }
}

pub fn verify_constraints<S>(
    suite: &ConstraintSuite<S>,
    state: &S,
    assigned_subtask_ids: &BTreeSet<SubtaskId>,
) -> VerificationResult {
    let mut result = VerificationResult::default();

    for subtask in suite.subtasks() {
        let violated = violated_constraints(subtask, state);

        if subtask.is_global() || assigned_subtask_ids.contains(&subtask.id()) {
            if !violated.is_empty() {
                result.unsatisfied_constraints.insert(subtask.id(), violated);
            }
        } else if violated.is_empty() {
            result.satisfied_but_not_assigned_subtasks.insert(subtask.id());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintSuite;

    #[derive(Default)]
    struct Ab {
        a: i64,
        b: i64,
    }

    fn ids(ids: &[SubtaskId]) -> BTreeSet<SubtaskId> {
        ids.iter().copied().collect()
    }

    fn nested_suite() -> ConstraintSuite<Ab> {
        ConstraintSuite::builder()
            .constraint("1 <= A", |s: &Ab| 1 <= s.a)
            .constraint("1 <= B", |s: &Ab| 1 <= s.b)
            .subtask(1, 30.0)
            .constraint("A <= 100", |s| s.a <= 100)
            .constraint("B <= 100", |s| s.b <= 100)
            .subtask(2, 70.0)
            .constraint("A <= 1000000", |s| s.a <= 1_000_000)
            .constraint("B <= 1000000", |s| s.b <= 1_000_000)
            .build()
            .unwrap()
    }

    #[test]
    fn test_reports_only_failing_constraint() {
        let suite = ConstraintSuite::<Ab>::builder()
            .subtask(1, 100.0)
            .constraint("1 <= A <= 100", |s| 1 <= s.a && s.a <= 100)
            .constraint("1 <= B <= 100", |s| 1 <= s.b && s.b <= 100)
            .build()
            .unwrap();

        let result = verify_constraints(&suite, &Ab { a: 200, b: 5 }, &ids(&[1]));

        assert!(!result.is_valid());
        assert_eq!(
            result.unsatisfied_constraints.get(&1),
            Some(&vec!["1 <= A <= 100".to_string()])
        );
        assert!(result.satisfied_but_not_assigned_subtasks.is_empty());
    }

    #[test]
    fn test_reports_every_violation_in_declaration_order() {
        let suite = nested_suite();
        let result = verify_constraints(&suite, &Ab { a: 0, b: 5000 }, &ids(&[1]));

        assert_eq!(result.unsatisfied_constraints.get(&0), Some(&vec!["1 <= A".to_string()]));
        assert_eq!(result.unsatisfied_constraints.get(&1), Some(&vec!["B <= 100".to_string()]));
        assert_eq!(result.unsatisfied_constraints.len(), 2);
    }

    #[test]
    fn test_valid_for_largest_subtask_only() {
        let suite = nested_suite();
        let result = verify_constraints(&suite, &Ab { a: 500, b: 7 }, &ids(&[2]));
        assert!(result.is_valid());
    }

    #[test]
    fn test_satisfied_unassigned_subtask_is_surfaced() {
        let suite = nested_suite();
        let result = verify_constraints(&suite, &Ab { a: 5, b: 7 }, &ids(&[2]));

        assert!(!result.is_valid());
        assert!(result.unsatisfied_constraints.is_empty());
        assert_eq!(result.satisfied_but_not_assigned_subtasks, ids(&[1]));
    }

    #[test]
    fn test_global_subtask_never_subject_to_assignment_check() {
        let suite = ConstraintSuite::<Ab>::builder()
            .constraint("1 <= A", |s| 1 <= s.a)
            .build()
            .unwrap();

        let result = verify_constraints(&suite, &Ab { a: 3, b: 0 }, &BTreeSet::new());
        assert!(result.is_valid());

        let result = verify_constraints(&suite, &Ab { a: 0, b: 0 }, &BTreeSet::new());
        assert_eq!(result.unsatisfied_constraints.get(&0), Some(&vec!["1 <= A".to_string()]));
    }

    #[test]
    fn test_multiple_test_cases_constraints() {
        let suite = ConstraintSuite::<Ab>::builder()
            .multiple_test_cases_constraint("1 <= T <= 2", |c| (1..=2).contains(&c.count()))
            .multiple_test_cases_constraint("sum of A <= 10", |c| {
                c.states.iter().map(|s| s.a).sum::<i64>() <= 10
            })
            .build()
            .unwrap();
        let verifier = Verifier::new(Arc::new(suite));

        let states = vec![Ab { a: 3, b: 1 }, Ab { a: 4, b: 1 }];
        let inputs = vec!["3 1\n".to_string(), "4 1\n".to_string()];
        let ok = verifier.verify_multiple_test_cases(&CombinedCases { states: &states, inputs: &inputs });
        assert!(ok.is_valid());

        let states = vec![Ab { a: 9, b: 1 }, Ab { a: 4, b: 1 }, Ab { a: 1, b: 1 }];
        let inputs = vec![String::new(); 3];
        let bad = verifier.verify_multiple_test_cases(&CombinedCases { states: &states, inputs: &inputs });
        assert_eq!(
            bad.unsatisfied_constraints,
            vec!["1 <= T <= 2".to_string(), "sum of A <= 10".to_string()]
        );
    }
}
