// Problem metadata loaded from problem.json next to the problem binary
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_METADATA_PATH: &str = "problem.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProblemMetadata {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,
}

impl ProblemMetadata {
    /// Load metadata from a JSON file. A missing file yields empty
    /// metadata; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
