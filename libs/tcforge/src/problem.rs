//! Problem declaration: test cases, test groups and the problem bundle.
//!
//! Declarations are built once through explicit builders and are read-only
//! afterwards. Appliers receive their own state value and the run's random
//! generator; nothing is bound through shared globals.

use crate::constraint::ConstraintSuite;
use crate::error::DeclarationError;
use crate::io::IoFormat;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tcforge_common::types::{GroupId, SubtaskId, GLOBAL_SUBTASK_ID};

/// Seeded generator handed to appliers; one stream per run
pub type Random = rand_chacha::ChaCha8Rng;

/// Binds a test case's variables into the given state
pub type Applier<S> = Arc<dyn Fn(&mut S, &mut Random) -> anyhow::Result<()> + Send + Sync>;

/// Runs after every official applier, e.g. to append an end-of-input marker
pub type InputFinalizer<S> = Arc<dyn Fn(&mut S) + Send + Sync>;

/// A concrete test case ready for generation
pub struct TestCase<S> {
    id: String,
    description: Option<String>,
    subtask_ids: BTreeSet<SubtaskId>,
    applier: Applier<S>,
}

impl<S> TestCase<S> {
    pub fn new(id: impl Into<String>, subtask_ids: BTreeSet<SubtaskId>, applier: Applier<S>) -> Self {
        Self {
            id: id.into(),
            description: None,
            subtask_ids,
            applier,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn subtask_ids(&self) -> &BTreeSet<SubtaskId> {
        &self.subtask_ids
    }

    pub fn apply(&self, state: &mut S, rng: &mut Random) -> anyhow::Result<()> {
        (self.applier)(state, rng)
    }
}

impl<S> fmt::Debug for TestCase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("subtask_ids", &self.subtask_ids)
            .finish()
    }
}

#[derive(Debug)]
pub struct TestGroup<S> {
    pub id: GroupId,
    pub test_cases: Vec<TestCase<S>>,
}

impl<S> TestGroup<S> {
    pub fn new(id: GroupId, test_cases: Vec<TestCase<S>>) -> Self {
        Self { id, test_cases }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTestCase {
    pub content: String,
    pub subtask_ids: BTreeSet<SubtaskId>,
}

pub struct OfficialTestCase<S> {
    pub description: Option<String>,
    pub closure: Applier<S>,
}

impl<S> Clone for OfficialTestCase<S> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            closure: Arc::clone(&self.closure),
        }
    }
}

pub struct OfficialTestGroup<S> {
    pub id: GroupId,
    pub subtask_ids: BTreeSet<SubtaskId>,
    pub test_cases: Vec<OfficialTestCase<S>>,
}

/// Declared samples and official groups of a problem
pub struct TestSuite<S> {
    sample_tests: Vec<SampleTestCase>,
    official_groups: Vec<OfficialTestGroup<S>>,
    input_finalizer: Option<InputFinalizer<S>>,
}

impl<S> TestSuite<S> {
    pub fn builder() -> TestSuiteBuilder<S> {
        TestSuiteBuilder::new()
    }

    pub fn sample_tests(&self) -> &[SampleTestCase] {
        &self.sample_tests
    }

    pub fn official_groups(&self) -> &[OfficialTestGroup<S>] {
        &self.official_groups
    }

    pub fn input_finalizer(&self) -> Option<&InputFinalizer<S>> {
        self.input_finalizer.as_ref()
    }
}

/// Builder assigning official group IDs 1..N in declaration order
pub struct TestSuiteBuilder<S> {
    sample_tests: Vec<SampleTestCase>,
    official_groups: Vec<OfficialTestGroup<S>>,
    input_finalizer: Option<InputFinalizer<S>>,
}

impl<S> TestSuiteBuilder<S> {
    pub fn new() -> Self {
        Self {
            sample_tests: Vec::new(),
            official_groups: Vec::new(),
            input_finalizer: None,
        }
    }

    pub fn sample(self, content: impl Into<String>) -> Self {
        self.sample_for(content, [])
    }

    pub fn sample_for<I>(mut self, content: impl Into<String>, subtask_ids: I) -> Self
    where
        I: IntoIterator<Item = SubtaskId>,
    {
        self.sample_tests.push(SampleTestCase {
            content: content.into(),
            subtask_ids: subtask_ids.into_iter().collect(),
        });
        self
    }

    /// Open the next official group, assigned to `subtask_ids`
    pub fn group<I>(mut self, subtask_ids: I) -> Self
    where
        I: IntoIterator<Item = SubtaskId>,
    {
        let id = self.official_groups.len() as GroupId + 1;
        self.official_groups.push(OfficialTestGroup {
            id,
            subtask_ids: subtask_ids.into_iter().collect(),
            test_cases: Vec::new(),
        });
        self
    }

    /// Add an official test case to the current group (opening group 1 if
    /// none was declared)
    pub fn case<F>(mut self, description: impl Into<String>, closure: F) -> Self
    where
        F: Fn(&mut S, &mut Random) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if self.official_groups.is_empty() {
            self = self.group([]);
        }
        if let Some(group) = self.official_groups.last_mut() {
            group.test_cases.push(OfficialTestCase {
                description: Some(description.into()),
                closure: Arc::new(closure),
            });
        }
        self
    }

    pub fn input_finalizer<F>(mut self, finalizer: F) -> Self
    where
        F: Fn(&mut S) + Send + Sync + 'static,
    {
        self.input_finalizer = Some(Arc::new(finalizer));
        self
    }

    pub fn build(self) -> TestSuite<S> {
        TestSuite {
            sample_tests: self.sample_tests,
            official_groups: self.official_groups,
            input_finalizer: self.input_finalizer,
        }
    }
}

impl<S> Default for TestSuiteBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a run needs to know about one problem
pub struct Problem<S> {
    io: Arc<dyn IoFormat<S>>,
    constraints: Arc<ConstraintSuite<S>>,
    test_suite: TestSuite<S>,
    multiple_test_cases: bool,
}

impl<S> Problem<S> {
    pub fn builder(
        io: Arc<dyn IoFormat<S>>,
        constraints: ConstraintSuite<S>,
        test_suite: TestSuite<S>,
    ) -> ProblemBuilder<S> {
        ProblemBuilder {
            io,
            constraints,
            test_suite,
            multiple_test_cases: false,
        }
    }

    pub fn io(&self) -> &Arc<dyn IoFormat<S>> {
        &self.io
    }

    pub fn constraints(&self) -> &Arc<ConstraintSuite<S>> {
        &self.constraints
    }

    pub fn test_suite(&self) -> &TestSuite<S> {
        &self.test_suite
    }

    pub fn multiple_test_cases(&self) -> bool {
        self.multiple_test_cases
    }

    /// Subtasks a test case is assigned to once declarations are resolved:
    /// without declared subtasks everything belongs to the global one
    pub fn resolve_assignment(&self, declared: &BTreeSet<SubtaskId>) -> BTreeSet<SubtaskId> {
        if self.constraints.has_subtasks() {
            declared.clone()
        } else {
            BTreeSet::from([GLOBAL_SUBTASK_ID])
        }
    }
}

pub struct ProblemBuilder<S> {
    io: Arc<dyn IoFormat<S>>,
    constraints: ConstraintSuite<S>,
    test_suite: TestSuite<S>,
    multiple_test_cases: bool,
}

impl<S> ProblemBuilder<S> {
    pub fn multiple_test_cases(mut self, enabled: bool) -> Self {
        self.multiple_test_cases = enabled;
        self
    }

    pub fn build(self) -> Result<Problem<S>, DeclarationError> {
        let constraints = &self.constraints;

        if !self.multiple_test_cases && !constraints.multiple_test_cases_constraints().is_empty() {
            return Err(DeclarationError::MultipleTestCasesDisabled);
        }

        let declared = constraints.scoring_subtask_ids();
        let is_declared = |id: &SubtaskId| constraints.has_subtasks() && declared.contains(id);

        for (index, sample) in self.test_suite.sample_tests.iter().enumerate() {
            if let Some(unknown) = sample.subtask_ids.iter().find(|id| !is_declared(id)) {
                return Err(DeclarationError::UnknownSampleSubtask {
                    number: index + 1,
                    subtask_id: *unknown,
                });
            }
        }

        for group in &self.test_suite.official_groups {
            if let Some(unknown) = group.subtask_ids.iter().find(|id| !is_declared(id)) {
                return Err(DeclarationError::UnknownSubtask {
                    group_id: group.id,
                    subtask_id: *unknown,
                });
            }
            if constraints.has_subtasks() && group.subtask_ids.is_empty() {
                return Err(DeclarationError::UnassignedTestGroup(group.id));
            }
        }

        Ok(Problem {
            io: self.io,
            constraints: Arc::new(self.constraints),
            test_suite: self.test_suite,
            multiple_test_cases: self.multiple_test_cases,
        })
    }
}
