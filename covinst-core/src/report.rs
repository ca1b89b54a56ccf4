//! Coverage report payload
//!
//! Wraps the per-path maps of a batch together with the repository facts and
//! incremental-coverage settings a coverage store needs to file them.
//!
//! Global invariants enforced:
//! - Deterministic output ordering (maps keyed and sorted by path)
//! - Git fields sit at the top level next to `data`, absent when not requested

use crate::coverage::FileCoverage;
use crate::git::GitInfo;
use serde::Serialize;
use std::collections::BTreeMap;

/// Report for one instrumented batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Initial coverage maps keyed by recorded path
    pub data: BTreeMap<String, FileCoverage>,
    #[serde(flatten)]
    pub git: Option<GitInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment_coverage_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_path_prefix: Option<String>,
}

impl CoverageReport {
    pub fn new(data: BTreeMap<String, FileCoverage>) -> Self {
        CoverageReport {
            data,
            ..Default::default()
        }
    }

    pub fn with_git_info(mut self, git: Option<GitInfo>) -> Self {
        self.git = git;
        self
    }

    pub fn with_increment_coverage_dir(mut self, dir: Option<String>) -> Self {
        self.increment_coverage_dir = dir;
        self
    }

    pub fn with_relative_path_prefix(mut self, prefix: Option<String>) -> Self {
        self.relative_path_prefix = prefix;
        self
    }
}
