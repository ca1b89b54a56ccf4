//! Path normalization for coverage keys
//!
//! Recorded paths are either absolute, or relative to the instrumented root
//! behind an optional prefix. The prefix is a template whose `${field}`
//! placeholders are filled from the repository's git metadata.

use crate::git::GitInfo;
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

/// Prefix template commonly used for relative keys in coverage stores
pub const STORE_PREFIX_TEMPLATE: &str = "store/${project_name}/${branch}/code";

/// Placeholders a prefix template may reference
pub const PREFIX_PLACEHOLDERS: &[&str] = &[
    "commit_hash",
    "version",
    "branch",
    "last_commit_datetime",
    "remote",
    "project_name",
];

/// Render a path with forward slashes on every platform
pub fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `path` relative to `root`, or the normalized `path` when it lies elsewhere
pub fn relative_to(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => normalize(rel),
        _ => normalize(path),
    }
}

/// Last segment of a recorded path
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").unwrap())
}

/// Whether a template needs git metadata to expand
pub fn has_placeholders(template: &str) -> bool {
    placeholder_re().is_match(template)
}

/// Reject templates naming a field git metadata does not carry
pub fn validate_prefix_template(template: &str) -> Result<()> {
    for caps in placeholder_re().captures_iter(template) {
        let name = &caps[1];
        if !PREFIX_PLACEHOLDERS.contains(&name) {
            anyhow::bail!(
                "unknown placeholder ${{{}}} in path prefix (expected one of: {})",
                name,
                PREFIX_PLACEHOLDERS.join(", ")
            );
        }
    }
    Ok(())
}

/// Fill a prefix template from git metadata; unknown fields expand to nothing
pub fn expand_prefix(template: &str, git: &GitInfo) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match &caps[1] {
                "commit_hash" => git.commit_hash.clone(),
                "version" => git.version.clone(),
                "branch" => git.branch.clone(),
                "last_commit_datetime" => git.last_commit_datetime.clone(),
                "remote" => git.remote.clone(),
                "project_name" => git.project_name.clone(),
                _ => String::new(),
            }
        })
        .into_owned()
}

/// Where recorded paths are anchored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathLocation {
    #[default]
    Absolute,
    Relative,
}

/// How a file's recorded path is derived from its location on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathStyle {
    /// The normalized path as found
    #[default]
    Absolute,
    /// Relative to the instrumented root, behind `prefix` when it is non-empty
    Relative { prefix: String },
}

impl PathStyle {
    pub fn relative() -> Self {
        PathStyle::Relative {
            prefix: String::new(),
        }
    }

    /// Build a style from a location and an optional prefix template
    pub fn resolve(location: PathLocation, prefix_template: Option<&str>, git: Option<&GitInfo>) -> Self {
        match location {
            PathLocation::Absolute => PathStyle::Absolute,
            PathLocation::Relative => {
                let empty = GitInfo::default();
                let prefix = prefix_template
                    .map(|template| expand_prefix(template, git.unwrap_or(&empty)))
                    .unwrap_or_default();
                PathStyle::Relative { prefix }
            }
        }
    }

    /// Prefix in effect, if any
    pub fn prefix(&self) -> Option<&str> {
        match self {
            PathStyle::Relative { prefix } if !prefix.is_empty() => Some(prefix),
            _ => None,
        }
    }

    pub fn record(&self, file: &Path, root: &Path) -> String {
        match self {
            PathStyle::Absolute => normalize(file),
            PathStyle::Relative { prefix } => {
                let relative = relative_to(file, root);
                let prefix = prefix.trim_end_matches('/');
                if prefix.is_empty() {
                    relative
                } else {
                    format!("{}/{}", prefix, relative.trim_start_matches('/'))
                }
            }
        }
    }
}

/// Point an input source map at the file it describes
///
/// `file` and `sources` are reduced to the recorded path's basename so maps
/// produced on another machine do not leak its directory layout.
pub fn rebase_source_map(map: &mut Value, recorded_path: &str) {
    let name = basename(recorded_path).to_string();
    if let Value::Object(fields) = map {
        fields.insert("file".to_string(), Value::String(name.clone()));
        fields.insert("sources".to_string(), Value::Array(vec![Value::String(name)]));
    }
}
