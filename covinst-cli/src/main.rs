//! covinst CLI - coverage instrumentation for JavaScript and TypeScript

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering (files keyed and sorted by path)
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use covinst_core::config::{self, ResolvedConfig};
use covinst_core::paths::{self, PathLocation, PathStyle};
use covinst_core::{git, instrument_tree, BatchContext, CoverageReport};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "covinst")]
#[command(about = "Instrument JavaScript and TypeScript sources with coverage counters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Instrument source files and print their initial coverage maps as JSON
    Instrument {
        /// Path to source file or directory
        path: PathBuf,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Global variable holding the coverage registry (overrides config file)
        #[arg(long)]
        coverage_variable: Option<String>,

        /// Class method name never counted (repeatable, added to config file names)
        #[arg(long = "ignore-class-method")]
        ignore_class_methods: Vec<String>,

        /// Write JSON to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Embed git metadata in the first instrumented file and wrap the
        /// output in a report carrying it
        #[arg(long)]
        git_info: bool,

        /// Record paths relative to the instrumented root
        #[arg(long)]
        relative: bool,

        /// Template put in front of relative paths, e.g. 'store/${project_name}/${branch}/code'
        /// (implies --relative)
        #[arg(long)]
        path_prefix: Option<String>,

        /// Baseline directory for incremental coverage, recorded in the report
        #[arg(long)]
        increment_coverage_dir: Option<String>,
    },
    /// Validate or inspect a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without instrumenting anything
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Instrument {
            path,
            config: config_path,
            coverage_variable,
            ignore_class_methods,
            output,
            git_info,
            relative,
            path_prefix,
            increment_coverage_dir,
        } => {
            let normalized_path = if path.is_relative() {
                std::env::current_dir()?.join(&path)
            } else {
                path
            };
            if !normalized_path.exists() {
                anyhow::bail!("Path does not exist: {}", normalized_path.display());
            }

            let project_root = project_root(&normalized_path);
            let resolved = config::load_and_resolve(&project_root, config_path.as_deref())
                .context("failed to load configuration")?;
            if let Some(config_path) = &resolved.config_path {
                tracing::info!(config = %config_path.display(), "using config");
            }

            // CLI flags override config file values
            let mut options = resolved.instrument_options();
            if let Some(variable) = coverage_variable {
                options.coverage_variable = variable;
            }
            options.ignore_class_methods.extend(ignore_class_methods);

            if let Some(template) = &path_prefix {
                paths::validate_prefix_template(template).context("invalid --path-prefix")?;
            }
            let path_location = if relative || path_prefix.is_some() {
                PathLocation::Relative
            } else {
                resolved.path_location
            };
            let prefix_template = path_prefix.or_else(|| resolved.relative_path_prefix.clone());
            let increment_coverage_dir =
                increment_coverage_dir.or_else(|| resolved.increment_coverage_dir.clone());

            // Git is read once, for the bootstrap and for prefix placeholders
            let needs_git = git_info
                || (path_location == PathLocation::Relative
                    && prefix_template.as_deref().is_some_and(paths::has_placeholders));
            let git = needs_git.then(|| git::extract_git_info(&project_root));
            let style = PathStyle::resolve(path_location, prefix_template.as_deref(), git.as_ref());

            let batch = match (&git, git_info) {
                (Some(info), true) => BatchContext::with_git_info(info.clone()),
                _ => BatchContext::new(),
            };

            let tree = instrument_tree(&normalized_path, &resolved, &options, &batch, &style)?;
            if tree.skipped > 0 {
                eprintln!("Skipped {} file(s) due to errors", tree.skipped);
            }
            let file_count = tree.files.len();

            // Plain maps unless report fields were asked for
            let json = if git_info || increment_coverage_dir.is_some() {
                let report = CoverageReport::new(tree.files)
                    .with_git_info(batch.git_info().cloned())
                    .with_increment_coverage_dir(increment_coverage_dir)
                    .with_relative_path_prefix(style.prefix().map(str::to_string));
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string_pretty(&tree.files)?
            };
            match output {
                Some(out) => {
                    std::fs::write(&out, json + "\n")
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    eprintln!("Wrote coverage maps for {} file(s) to {}", file_count, out.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Config { action } => handle_config(action)?,
    }

    Ok(())
}

/// Directory config discovery starts from
fn project_root(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

fn handle_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Validate { path } => {
            let project_root = std::env::current_dir()?;
            match config::load_and_resolve(&project_root, path.as_deref()) {
                Ok(config) => {
                    if let Some(ref p) = config.config_path {
                        println!("Config valid: {}", p.display());
                    } else {
                        println!("No config file found. Using defaults.");
                    }
                }
                Err(e) => {
                    eprintln!("Config validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Show { path } => {
            let project_root = std::env::current_dir()?;
            let resolved = config::load_and_resolve(&project_root, path.as_deref())
                .context("failed to load configuration")?;
            print_config(&resolved);
        }
    }
    Ok(())
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Instrumentation:");
    println!("  coverage_variable: {}", resolved.coverage_variable);
    println!(
        "  ignore_class_methods: {}",
        if resolved.ignore_class_methods.is_empty() {
            "none".to_string()
        } else {
            resolved.ignore_class_methods.join(", ")
        }
    );
    println!(
        "  path_location: {}",
        match resolved.path_location {
            PathLocation::Absolute => "absolute",
            PathLocation::Relative => "relative",
        }
    );
    println!(
        "  relative_path_prefix: {}",
        resolved.relative_path_prefix.as_deref().unwrap_or("none")
    );
    println!(
        "  increment_coverage_dir: {}",
        resolved.increment_coverage_dir.as_deref().unwrap_or("none")
    );
    println!();
    println!("Filters:");
    println!("  extensions: {}", resolved.extensions.join(" "));
    println!(
        "  include: {}",
        if resolved.include.is_some() {
            "custom"
        } else {
            "all"
        }
    );
    println!("  exclude: {} pattern(s)", resolved.exclude.len());
}
