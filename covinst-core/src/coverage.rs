//! Per-file coverage map
//!
//! Global invariants enforced:
//! - Indices in every table are dense and assigned in order of discovery
//! - Every counter table is parallel to its map (`s` to `statementMap`, `f` to
//!   `fnMap`, each `b[i]` to `branchMap[i].locations`)
//! - Once frozen, no records are added and the content hash is fixed

use crate::error::InstrumentError;
use crate::fingerprint;
use crate::location::Location;
use serde::{Deserialize, Serialize};

/// Kind of a branch record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchKind {
    If,
    Switch,
    CondExpr,
    BinaryExpr,
    DefaultArg,
}

impl BranchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchKind::If => "if",
            BranchKind::Switch => "switch",
            BranchKind::CondExpr => "cond-expr",
            BranchKind::BinaryExpr => "binary-expr",
            BranchKind::DefaultArg => "default-arg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMapping {
    pub name: String,
    pub decl: Location,
    pub loc: Location,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchMapping {
    pub loc: Location,
    #[serde(rename = "type")]
    pub kind: BranchKind,
    pub locations: Vec<Location>,
    pub line: u32,
}

/// Serializable snapshot of one file's coverage, in istanbul layout
///
/// Tables are keyed by the decimal string of their index when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCoverage {
    pub path: String,
    #[serde(with = "index_map")]
    pub statement_map: Vec<Location>,
    #[serde(with = "index_map")]
    pub fn_map: Vec<FunctionMapping>,
    #[serde(with = "index_map")]
    pub branch_map: Vec<BranchMapping>,
    #[serde(with = "index_map")]
    pub s: Vec<u64>,
    #[serde(with = "index_map")]
    pub f: Vec<u64>,
    #[serde(with = "index_map")]
    pub b: Vec<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_source_map: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl FileCoverage {
    pub fn empty(path: impl Into<String>) -> Self {
        FileCoverage {
            path: path.into(),
            statement_map: Vec::new(),
            fn_map: Vec::new(),
            branch_map: Vec::new(),
            s: Vec::new(),
            f: Vec::new(),
            b: Vec::new(),
            input_source_map: None,
            hash: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statement_map.is_empty() && self.fn_map.is_empty() && self.branch_map.is_empty()
    }
}

/// Mutable coverage map owned by a single instrumentation pass
#[derive(Debug, Clone)]
pub struct CoverageMap {
    data: FileCoverage,
    frozen: bool,
}

impl CoverageMap {
    pub fn new(path: impl Into<String>) -> Self {
        CoverageMap {
            data: FileCoverage::empty(path),
            frozen: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.data.path
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_input_source_map(&mut self, source_map: serde_json::Value) {
        self.data.input_source_map = Some(source_map);
    }

    pub fn statement_count(&self) -> usize {
        self.data.statement_map.len()
    }

    pub fn function_count(&self) -> usize {
        self.data.fn_map.len()
    }

    pub fn branch_count(&self) -> usize {
        self.data.branch_map.len()
    }

    /// Register a statement and return its index
    pub fn new_statement(&mut self, loc: Location) -> Result<usize, InstrumentError> {
        self.ensure_open()?;
        let index = self.data.statement_map.len();
        self.data.statement_map.push(loc);
        self.data.s.push(0);
        Ok(index)
    }

    /// Register a function and return its index
    ///
    /// Anonymous functions are named `(anonymous_N)` after their index.
    pub fn new_function(
        &mut self,
        name: Option<&str>,
        decl: Location,
        loc: Location,
    ) -> Result<usize, InstrumentError> {
        self.ensure_open()?;
        let index = self.data.fn_map.len();
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("(anonymous_{index})"),
        };
        self.data.fn_map.push(FunctionMapping {
            name,
            decl,
            loc,
            line: loc.start.line,
        });
        self.data.f.push(0);
        Ok(index)
    }

    /// Register a branch construct with no paths yet
    pub fn new_branch(&mut self, kind: BranchKind, loc: Location) -> Result<usize, InstrumentError> {
        self.ensure_open()?;
        let index = self.data.branch_map.len();
        self.data.branch_map.push(BranchMapping {
            loc,
            kind,
            locations: Vec::new(),
            line: loc.start.line,
        });
        self.data.b.push(Vec::new());
        Ok(index)
    }

    /// Append a path to an existing branch and return the path index
    pub fn add_branch_path(&mut self, branch: usize, loc: Location) -> Result<usize, InstrumentError> {
        self.ensure_open()?;
        let record = self
            .data
            .branch_map
            .get_mut(branch)
            .ok_or(InstrumentError::UnknownBranch { index: branch })?;
        record.locations.push(loc);
        let counts = &mut self.data.b[branch];
        counts.push(0);
        Ok(counts.len() - 1)
    }

    /// Freeze the map and fix its content hash
    ///
    /// Freezing twice is a no-op.
    pub fn freeze(&mut self) -> Result<(), InstrumentError> {
        if self.frozen {
            return Ok(());
        }
        self.frozen = true;
        self.data.hash = None;
        let hash = fingerprint::compute(&self.data)?;
        self.data.hash = Some(hash);
        Ok(())
    }

    pub fn hash(&self) -> Option<&str> {
        self.data.hash.as_deref()
    }

    /// Snapshot of the current state, safe to hand out to callers
    pub fn snapshot(&self) -> FileCoverage {
        self.data.clone()
    }

    fn ensure_open(&self) -> Result<(), InstrumentError> {
        if self.frozen {
            return Err(InstrumentError::Frozen {
                path: self.data.path.clone(),
            });
        }
        Ok(())
    }
}

/// (De)serialize a dense vector as an object keyed by decimal index
mod index_map {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, T>(items: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_map(items.iter().enumerate().map(|(i, item)| (i.to_string(), item)))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let entries = BTreeMap::<usize, T>::deserialize(deserializer)?;
        if let Some((expected, found)) = entries
            .keys()
            .enumerate()
            .find(|(expected, found)| expected != *found)
        {
            return Err(D::Error::custom(format!(
                "index {found} found where {expected} was expected"
            )));
        }
        Ok(entries.into_values().collect())
    }
}
