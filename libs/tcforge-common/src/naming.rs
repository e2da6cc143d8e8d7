use crate::types::{GroupId, SAMPLE_GROUP_ID};
use std::path::{Path, PathBuf};

/// Test case naming semantics - defines only naming, not I/O.
/// Ensures generator and grader never drift: IDs and file names are
/// deterministic functions of slug, group and sequence number.

pub const SAMPLE_SEGMENT: &str = "sample";
pub const INPUT_EXTENSION: &str = "in";
pub const OUTPUT_EXTENSION: &str = "out";

fn group_segment(group_id: GroupId) -> String {
    if group_id == SAMPLE_GROUP_ID {
        SAMPLE_SEGMENT.to_string()
    } else {
        group_id.to_string()
    }
}

/// ID of the `number`-th (1-based) test case of a group:
/// `<slug>_sample_<n>` for samples, `<slug>_<group>_<n>` otherwise
pub fn test_case_id(slug: &str, group_id: GroupId, number: usize) -> String {
    format!("{}_{}_{}", slug, group_segment(group_id), number)
}

/// ID of the file a whole group is combined into in multiple-test-case mode
pub fn combined_test_case_id(slug: &str, group_id: GroupId) -> String {
    format!("{}_{}", slug, group_segment(group_id))
}

pub fn input_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.{}", id, INPUT_EXTENSION))
}

pub fn output_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.{}", id, OUTPUT_EXTENSION))
}

/// Scratch file holding a graded solution's output
pub fn evaluation_output_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("_{}.{}", id, OUTPUT_EXTENSION))
}

/// Sibling temporary file used for write-then-rename
pub fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
}
