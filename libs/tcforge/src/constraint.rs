//! Constraint declarations.
//!
//! A [`ConstraintSuite`] is built once from the problem declaration and is
//! read-only afterwards. Constraints are named predicates over the
//! problem's state type `S`; multiple-test-case constraints are predicates
//! over a whole combined group ([`CombinedCases`]).

use crate::error::DeclarationError;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tcforge_common::types::{SubtaskId, GLOBAL_SUBTASK_ID};

/// Points awarded to the global subtask when a problem has no subtasks
pub const DEFAULT_GLOBAL_POINTS: f64 = 100.0;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A named boolean predicate over the bound variables
pub struct Constraint<S> {
    description: String,
    predicate: Predicate<S>,
}

impl<S> Constraint<S> {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn holds(&self, state: &S) -> bool {
        (self.predicate)(state)
    }
}

impl<S> Clone for Constraint<S> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<S> fmt::Debug for Constraint<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("description", &self.description)
            .finish()
    }
}

pub struct Subtask<S> {
    id: SubtaskId,
    points: f64,
    constraints: Vec<Constraint<S>>,
}

impl<S> Subtask<S> {
    pub fn id(&self) -> SubtaskId {
        self.id
    }

    pub fn points(&self) -> f64 {
        self.points
    }

    pub fn constraints(&self) -> &[Constraint<S>] {
        &self.constraints
    }

    pub fn is_global(&self) -> bool {
        self.id == GLOBAL_SUBTASK_ID
    }
}

impl<S> Clone for Subtask<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            points: self.points,
            constraints: self.constraints.clone(),
        }
    }
}

impl<S> fmt::Debug for Subtask<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subtask")
            .field("id", &self.id)
            .field("points", &self.points)
            .field("constraints", &self.constraints)
            .finish()
    }
}

/// View over the test cases of one group being combined into a single file
pub struct CombinedCases<'a, S> {
    pub states: &'a [S],
    pub inputs: &'a [String],
}

impl<S> CombinedCases<'_, S> {
    pub fn count(&self) -> usize {
        self.states.len()
    }
}

/// Constraint evaluated only against a combined multiple-test-case file
pub struct MultipleTestCasesConstraint<S> {
    description: String,
    predicate: Arc<dyn for<'a> Fn(&CombinedCases<'a, S>) -> bool + Send + Sync>,
}

impl<S> MultipleTestCasesConstraint<S> {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: for<'a> Fn(&CombinedCases<'a, S>) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn holds(&self, cases: &CombinedCases<'_, S>) -> bool {
        (self.predicate)(cases)
    }
}

impl<S> Clone for MultipleTestCasesConstraint<S> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

/// Mapping from subtask ID to subtask, ordered by ID.
///
/// The global subtask (ID 0) is always present, possibly empty. Every
/// constraint belongs to exactly one subtask by construction.
pub struct ConstraintSuite<S> {
    subtasks: Vec<Subtask<S>>,
    multiple_test_cases_constraints: Vec<MultipleTestCasesConstraint<S>>,
}

impl<S> ConstraintSuite<S> {
    pub fn builder() -> ConstraintSuiteBuilder<S> {
        ConstraintSuiteBuilder::new()
    }

    /// All subtasks including the global one, ordered by ID
    pub fn subtasks(&self) -> &[Subtask<S>] {
        &self.subtasks
    }

    pub fn subtask(&self, id: SubtaskId) -> Option<&Subtask<S>> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    pub fn global(&self) -> &Subtask<S> {
        // Builder guarantees the global subtask sits first
        &self.subtasks[0]
    }

    pub fn has_subtasks(&self) -> bool {
        self.subtasks.len() > 1
    }

    /// Subtasks that carry points: the declared ones, or the global
    /// subtask alone when none are declared
    pub fn scoring_subtasks(&self) -> Vec<&Subtask<S>> {
        if self.has_subtasks() {
            self.subtasks.iter().filter(|s| !s.is_global()).collect()
        } else {
            vec![self.global()]
        }
    }

    pub fn scoring_subtask_ids(&self) -> BTreeSet<SubtaskId> {
        self.scoring_subtasks().iter().map(|s| s.id).collect()
    }

    pub fn multiple_test_cases_constraints(&self) -> &[MultipleTestCasesConstraint<S>] {
        &self.multiple_test_cases_constraints
    }
}

impl<S> fmt::Debug for ConstraintSuite<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintSuite")
            .field("subtasks", &self.subtasks)
            .field(
                "multiple_test_cases_constraints",
                &self.multiple_test_cases_constraints.len(),
            )
            .finish()
    }
}

/// Ordered builder for a [`ConstraintSuite`].
///
/// Constraints added before the first `subtask` call are global; after it
/// they belong to the most recently opened subtask.
pub struct ConstraintSuiteBuilder<S> {
    global: Vec<Constraint<S>>,
    subtasks: Vec<Subtask<S>>,
    multiple_test_cases_constraints: Vec<MultipleTestCasesConstraint<S>>,
    global_points: f64,
    error: Option<DeclarationError>,
}

impl<S> ConstraintSuiteBuilder<S> {
    pub fn new() -> Self {
        Self {
            global: Vec::new(),
            subtasks: Vec::new(),
            multiple_test_cases_constraints: Vec::new(),
            global_points: DEFAULT_GLOBAL_POINTS,
            error: None,
        }
    }

    pub fn constraint<F>(mut self, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        let constraint = Constraint::new(description, predicate);
        match self.subtasks.last_mut() {
            Some(subtask) => subtask.constraints.push(constraint),
            None => self.global.push(constraint),
        }
        self
    }

    /// Open a new subtask worth `points`
    pub fn subtask(mut self, id: SubtaskId, points: f64) -> Self {
        if id == GLOBAL_SUBTASK_ID {
            self.error.get_or_insert(DeclarationError::ReservedSubtaskId);
        } else if self.subtasks.iter().any(|s| s.id == id) {
            self.error.get_or_insert(DeclarationError::DuplicateSubtask(id));
        }
        self.subtasks.push(Subtask {
            id,
            points,
            constraints: Vec::new(),
        });
        self
    }

    /// Points of the global subtask; only scored when no subtask is declared
    pub fn global_points(mut self, points: f64) -> Self {
        self.global_points = points;
        self
    }

    pub fn multiple_test_cases_constraint<F>(mut self, description: impl Into<String>, predicate: F) -> Self
    where
        F: for<'a> Fn(&CombinedCases<'a, S>) -> bool + Send + Sync + 'static,
    {
        self.multiple_test_cases_constraints
            .push(MultipleTestCasesConstraint::new(description, predicate));
        self
    }

    pub fn build(self) -> Result<ConstraintSuite<S>, DeclarationError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut subtasks = Vec::with_capacity(self.subtasks.len() + 1);
        subtasks.push(Subtask {
            id: GLOBAL_SUBTASK_ID,
            points: self.global_points,
            constraints: self.global,
        });
        let mut declared = self.subtasks;
        declared.sort_by_key(|s| s.id);
        subtasks.extend(declared);

        Ok(ConstraintSuite {
            subtasks,
            multiple_test_cases_constraints: self.multiple_test_cases_constraints,
        })
    }
}

impl<S> Default for ConstraintSuiteBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
