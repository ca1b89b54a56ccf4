//! Per-pass traversal state

use crate::attrs::AttributeStore;
use crate::coverage::CoverageMap;
use crate::error::InstrumentError;
use crate::node::NodeKey;

/// Node that switched suppression on, at the depth it was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    key: NodeKey,
    depth: usize,
}

/// State owned by one pass over one file
///
/// Suppression is a single marker: while it is set, no counters are added.
/// It is cleared only when the traversal leaves the node that set it, so a
/// hint inside an already suppressed subtree has no further effect.
#[derive(Debug)]
pub(crate) struct VisitState {
    pub(crate) identifier: String,
    pub(crate) coverage: CoverageMap,
    pub(crate) attrs: AttributeStore,
    pub(crate) source_mapping_url: Option<String>,
    ignore_class_methods: Vec<String>,
    suppression: Option<Anchor>,
    depth: usize,
    error: Option<InstrumentError>,
}

impl VisitState {
    pub(crate) fn new(identifier: String, coverage: CoverageMap, ignore_class_methods: Vec<String>) -> Self {
        VisitState {
            identifier,
            coverage,
            attrs: AttributeStore::new(),
            source_mapping_url: None,
            ignore_class_methods,
            suppression: None,
            depth: 0,
            error: None,
        }
    }

    /// Record entry into a node and return its depth
    pub(crate) fn descend(&mut self) -> usize {
        self.depth += 1;
        self.depth
    }

    /// Record exit from a node, releasing suppression it anchored and its attributes
    pub(crate) fn ascend(&mut self, key: NodeKey, depth: usize) {
        if self.suppression == Some(Anchor { key, depth }) {
            self.suppression = None;
        }
        self.attrs.clear(key);
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn is_suppressed(&self) -> bool {
        self.suppression.is_some()
    }

    pub(crate) fn suppress(&mut self, key: NodeKey, depth: usize) {
        if self.suppression.is_none() {
            self.suppression = Some(Anchor { key, depth });
        }
    }

    pub(crate) fn ignores_method(&self, name: &str) -> bool {
        self.ignore_class_methods.iter().any(|ignored| ignored == name)
    }

    /// Keep the first fatal error; later ones are consequences of it
    pub(crate) fn fail(&mut self, error: InstrumentError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub(crate) fn failed(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn take_error(&mut self) -> Option<InstrumentError> {
        self.error.take()
    }
}
