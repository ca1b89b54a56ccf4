//! covinst core library - coverage instrumentation for JavaScript and TypeScript syntax trees

#![deny(warnings)]

// Global invariants enforced in this crate:
// - One pass owns all of its mutable state; nothing is shared between files
//   except the batch's one-shot git gate
// - Coverage tables are dense and index-aligned with their counters
// - Identical source and path yield identical identifiers, maps, and hashes
// - Batch output is ordered by path regardless of scheduling

pub mod attrs;
pub mod bootstrap;
pub mod config;
pub mod coverage;
pub mod directives;
pub mod error;
pub mod fingerprint;
pub mod git;
pub mod ident;
pub mod instrument;
pub mod location;
pub mod node;
pub mod parser;
pub mod paths;
pub mod report;
pub mod synth;

pub use config::ResolvedConfig;
pub use coverage::{CoverageMap, FileCoverage};
pub use error::InstrumentError;
pub use git::GitInfo;
pub use instrument::{
    instrument_program, BatchContext, InstrumentOptions, InstrumentOutput, PassStatus,
    SourceContext,
};
pub use paths::PathStyle;
pub use report::CoverageReport;

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use swc_common::comments::SingleThreadedComments;
use swc_common::{sync::Lrc, SourceMap};

/// Parse and instrument one source text
///
/// `path` is the key recorded in the coverage map; `filename` picks the
/// parser flavor by extension.
pub fn instrument_source(
    src: &str,
    path: &str,
    filename: &str,
    options: &InstrumentOptions,
    batch: &BatchContext,
) -> Result<InstrumentOutput> {
    let cm: Lrc<SourceMap> = Default::default();
    let comments = SingleThreadedComments::default();
    let mut program = parser::parse_source(src, &cm, &comments, filename)
        .with_context(|| format!("failed to parse {}", path))?;

    let source = SourceContext {
        path,
        source_map: &cm,
        comments: &comments,
    };
    let output = instrument_program(&mut program, &source, options, batch)
        .with_context(|| format!("failed to instrument {}", path))?;
    Ok(output)
}

/// Read, parse, and instrument one file from disk
pub fn instrument_file(
    file: &Path,
    path: &str,
    options: &InstrumentOptions,
    batch: &BatchContext,
) -> Result<InstrumentOutput> {
    let src = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read file: {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    instrument_source(&src, path, filename, options, batch)
}

/// Result of instrumenting every selected file under a root
#[derive(Debug, Default)]
pub struct TreeCoverage {
    /// Snapshots keyed by recorded path
    pub files: BTreeMap<String, FileCoverage>,
    /// Files skipped because they failed to read, parse, or instrument
    pub skipped: usize,
}

/// Instrument every file under `root` that passes the config filters
///
/// Files run in parallel, each with its own source map and comment store.
/// `style` decides how recorded paths relate to `root`.
pub fn instrument_tree(
    root: &Path,
    config: &ResolvedConfig,
    options: &InstrumentOptions,
    batch: &BatchContext,
    style: &PathStyle,
) -> Result<TreeCoverage> {
    let filter_root = if root.is_file() {
        root.parent().unwrap_or(root)
    } else {
        root
    };
    let files: Vec<PathBuf> = collect_source_files(root)?
        .into_iter()
        .filter(|file| config.should_include(Path::new(&paths::relative_to(file, filter_root))))
        .collect();

    let results: Vec<(String, Result<InstrumentOutput>)> = files
        .par_iter()
        .map(|file| {
            let recorded = style.record(file, filter_root);
            let result = instrument_file(file, &recorded, options, batch);
            (recorded, result)
        })
        .collect();

    let mut tree = TreeCoverage::default();
    for (path, result) in results {
        match result {
            Ok(output) => {
                tree.files.insert(path, output.file_coverage);
            }
            Err(e) => {
                tracing::warn!(path = %path, "skipping file: {:#}", e);
                tree.skipped += 1;
            }
        }
    }
    if tree.skipped > 0 {
        tracing::warn!("skipped {} file(s) due to errors", tree.skipped);
    }

    Ok(tree)
}

/// Check if a file is a supported source file
fn is_supported_source_file(filename: &str) -> bool {
    // Declarations carry no runtime code
    if filename.ends_with(".d.ts") {
        return false;
    }
    parser::is_supported_file(filename)
}

/// Collect all supported source files from a path (file or directory)
pub fn collect_source_files(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            if is_supported_source_file(filename) {
                files.push(path.to_path_buf());
            }
        }
    } else if path.is_dir() {
        collect_source_files_recursive(path, &mut files)?;
    } else {
        anyhow::bail!("path does not exist: {}", path.display());
    }

    // Sort files for deterministic order
    files.sort();

    Ok(files)
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || name == "node_modules" || name == "coverage"
}

fn process_dir_entry(
    path: PathBuf,
    metadata: std::fs::Metadata,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    if metadata.is_symlink() {
        return Ok(());
    }

    if metadata.is_dir() {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if is_skipped_dir(name) {
                return Ok(());
            }
        }
        collect_source_files_recursive(&path, files)?;
    } else if metadata.is_file() {
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            if is_supported_source_file(filename) {
                files.push(path);
            }
        }
    }

    Ok(())
}

fn collect_source_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry_result in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry_result?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("failed to read metadata: {}", path.display()))?;
        process_dir_entry(path, metadata, files)?;
    }

    Ok(())
}
