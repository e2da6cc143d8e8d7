//! Problem declaration errors.
//!
//! Raised while a problem declaration is being built; any of these aborts
//! the run before a single file is generated or graded.

use tcforge_common::types::{GroupId, SubtaskId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("Subtask {0} is declared more than once")]
    DuplicateSubtask(SubtaskId),

    #[error("Subtask id 0 is reserved for global constraints")]
    ReservedSubtaskId,

    #[error("Test group {group_id} refers to undeclared subtask {subtask_id}")]
    UnknownSubtask { group_id: GroupId, subtask_id: SubtaskId },

    #[error("Sample test case {number} refers to undeclared subtask {subtask_id}")]
    UnknownSampleSubtask { number: usize, subtask_id: SubtaskId },

    #[error("Test group {0} must be assigned to at least one subtask")]
    UnassignedTestGroup(GroupId),

    #[error("Multiple test cases constraints require multiple test cases mode")]
    MultipleTestCasesDisabled,

    #[error("Problem slug must not be empty")]
    EmptySlug,
}
