//! Configuration file support for covinst
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.covinstrc.json` in project root
//! 3. `covinst.config.json` in project root
//! 4. `"nyc"` key in `package.json`
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::git::GitInfo;
use crate::instrument::{InstrumentOptions, DEFAULT_COVERAGE_VARIABLE};
use crate::parser::SUPPORTED_EXTENSIONS;
use crate::paths::{self, PathLocation, PathStyle};
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default exclude patterns applied when no config is specified
const DEFAULT_EXCLUDES: &[&str] = &[
    "coverage/**",
    "test/**",
    "tests/**",
    "test.{js,cjs,mjs,ts,tsx,jsx}",
    "test-*.{js,cjs,mjs,ts,tsx,jsx}",
    "**/*{.,-}test.{js,cjs,mjs,ts,tsx,jsx}",
    "**/*{.,-}spec.{js,cjs,mjs,ts,tsx,jsx}",
    "**/__tests__/**",
    "**/__mocks__/**",
    "**/node_modules/**",
    "**/*.d.ts",
    "**/dist/**",
];

/// covinst configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CovinstConfig {
    /// Glob patterns for files to include (default: all supported extensions)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for files to exclude (default: tests, coverage, node_modules)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Global variable holding the coverage registry (default: `__coverage__`)
    #[serde(default)]
    pub coverage_variable: Option<String>,

    /// Class methods never counted
    #[serde(default)]
    pub ignore_class_methods: Vec<String>,

    /// File extensions to instrument (default: every supported extension)
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Record absolute paths, or paths relative to the instrumented root
    #[serde(default)]
    pub path_location: Option<PathLocation>,

    /// Template put in front of relative paths, e.g. `store/${project_name}/${branch}/code`
    #[serde(default)]
    pub relative_path_prefix: Option<String>,

    /// Baseline directory for incremental coverage, passed through to reports
    #[serde(default)]
    pub increment_coverage_dir: Option<String>,
}

/// The subset of an `nyc` section in `package.json` that applies here
///
/// nyc carries many reporter options, so unknown keys are tolerated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NycSection {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    coverage_variable: Option<String>,
    #[serde(default)]
    ignore_class_method: Vec<String>,
    #[serde(default)]
    extension: Vec<String>,
    #[serde(default)]
    file_path_location_type: Option<PathLocation>,
    #[serde(default)]
    relative_path_prefix: Option<String>,
    #[serde(default)]
    increment_coverage_dir: Option<String>,
}

impl From<NycSection> for CovinstConfig {
    fn from(nyc: NycSection) -> Self {
        CovinstConfig {
            include: nyc.include,
            exclude: nyc.exclude,
            coverage_variable: nyc.coverage_variable,
            ignore_class_methods: nyc.ignore_class_method,
            extensions: nyc.extension,
            path_location: nyc.file_path_location_type,
            relative_path_prefix: nyc.relative_path_prefix,
            increment_coverage_dir: nyc.increment_coverage_dir,
        }
    }
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Compiled include patterns (empty means include all)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    pub coverage_variable: String,
    pub ignore_class_methods: Vec<String>,
    /// Extensions, each with its leading dot
    pub extensions: Vec<String>,
    pub path_location: PathLocation,
    pub relative_path_prefix: Option<String>,
    pub increment_coverage_dir: Option<String>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl CovinstConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref variable) = self.coverage_variable {
            if variable.trim().is_empty() {
                anyhow::bail!("coverage_variable must not be empty");
            }
        }

        for name in &self.ignore_class_methods {
            if name.trim().is_empty() {
                anyhow::bail!("ignore_class_methods entries must not be empty");
            }
        }

        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                anyhow::bail!("extensions must start with '.' (got {:?})", ext);
            }
        }

        if let Some(ref template) = self.relative_path_prefix {
            paths::validate_prefix_template(template).context("invalid relative_path_prefix")?;
        }

        if let Some(ref dir) = self.increment_coverage_dir {
            if dir.trim().is_empty() {
                anyhow::bail!("increment_coverage_dir must not be empty");
            }
        }

        for pattern in &self.include {
            Glob::new(pattern).with_context(|| format!("invalid include pattern: {}", pattern))?;
        }
        for pattern in &self.exclude {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let include = if self.include.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.include {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };

        let exclude = {
            let mut builder = GlobSetBuilder::new();
            if self.exclude.is_empty() {
                for pattern in DEFAULT_EXCLUDES {
                    builder.add(Glob::new(pattern)?);
                }
            } else {
                for pattern in &self.exclude {
                    builder.add(Glob::new(pattern)?);
                }
            }
            builder.build()?
        };

        let extensions = if self.extensions.is_empty() {
            SUPPORTED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
        } else {
            self.extensions.clone()
        };

        Ok(ResolvedConfig {
            include,
            exclude,
            coverage_variable: self
                .coverage_variable
                .clone()
                .unwrap_or_else(|| DEFAULT_COVERAGE_VARIABLE.to_string()),
            ignore_class_methods: self.ignore_class_methods.clone(),
            extensions,
            path_location: self.path_location.unwrap_or_default(),
            relative_path_prefix: self.relative_path_prefix.clone(),
            increment_coverage_dir: self.increment_coverage_dir.clone(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Whether a path (relative to the project root) passes the filters
    pub fn should_include(&self, path: &Path) -> bool {
        let path_str = crate::paths::normalize(path);

        if !self.extensions.iter().any(|ext| path_str.ends_with(ext.as_str())) {
            return false;
        }

        if self.exclude.is_match(path_str.as_str()) {
            return false;
        }

        if let Some(ref include) = self.include {
            return include.is_match(path_str.as_str());
        }

        true
    }

    /// Engine options carried by this configuration
    pub fn instrument_options(&self) -> InstrumentOptions {
        InstrumentOptions {
            coverage_variable: self.coverage_variable.clone(),
            ignore_class_methods: self.ignore_class_methods.clone(),
            ..InstrumentOptions::default()
        }
    }

    /// How recorded paths are derived, with the prefix template filled from `git`
    pub fn path_style(&self, git: Option<&GitInfo>) -> PathStyle {
        PathStyle::resolve(self.path_location, self.relative_path_prefix.as_deref(), git)
    }

    pub fn defaults() -> Result<Self> {
        CovinstConfig::default().resolve()
    }
}

/// Discover and load configuration from a project root
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(CovinstConfig, PathBuf)>> {
    let rc_path = project_root.join(".covinstrc.json");
    if rc_path.exists() {
        let config = load_config_file(&rc_path)?;
        return Ok(Some((config, rc_path)));
    }

    let config_path = project_root.join("covinst.config.json");
    if config_path.exists() {
        let config = load_config_file(&config_path)?;
        return Ok(Some((config, config_path)));
    }

    let pkg_path = project_root.join("package.json");
    if pkg_path.exists() {
        if let Some(config) = load_from_package_json(&pkg_path)? {
            return Ok(Some((config, pkg_path)));
        }
    }

    Ok(None)
}

/// Load and validate a config file
pub fn load_config_file(path: &Path) -> Result<CovinstConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: CovinstConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

fn load_from_package_json(path: &Path) -> Result<Option<CovinstConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let pkg: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    match pkg.get("nyc") {
        Some(nyc_value) => {
            let nyc: NycSection = serde_json::from_value(nyc_value.clone())
                .with_context(|| format!("invalid nyc config in {}", path.display()))?;
            let config = CovinstConfig::from(nyc);
            config
                .validate()
                .with_context(|| format!("invalid nyc config in {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Load config from explicit path or discover from project root, then resolve
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (CovinstConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
