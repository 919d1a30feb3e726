//! Compare command - Diff two builds and decide the next version
//!
//! Compares module files (or directories of modules paired by relative path),
//! prints the added, removed and ignored tokens and, given the current
//! version, the next one. Optionally patches version stamps in source files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use ignore::WalkBuilder;
use serde::Serialize;
use tracing::{debug, info};

use apiprint_core::differ::{analyze_pairs, AnalysisOptions, ChangeType, ModulePair};
use apiprint_core::{decide, BumpKind, ModuleSource, Version};

use super::build_provider;
use crate::filter::FileFilter;
use crate::output::{Output, OutputConfig, Outputter};
use crate::stamp;

/// Inputs of one compare run, after config and flags are merged
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub old: PathBuf,
    pub new: PathBuf,
    pub current_version: Option<String>,
    pub files: Vec<String>,
    pub search_path: Option<PathBuf>,
    pub reference_dirs: Vec<PathBuf>,
    pub check_inheritance: bool,
    pub stamp_dir: Option<PathBuf>,
    pub stamp_file_name: String,
    pub dry_run: bool,
}

/// Per-module statistics
#[derive(Debug, Serialize)]
pub struct ModuleStats {
    pub path: String,
    pub old_count: usize,
    pub new_count: usize,
    pub unchanged: bool,
}

/// Comparison report
#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub modules: Vec<ModuleStats>,
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub ignored: BTreeSet<String>,
    pub bump: BumpKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_version: Option<String>,
    pub patched_files: Vec<String>,
    pub summary: String,
    pub duration_ms: f64,
}

impl CompareReport {
    fn tokens(&self, change: ChangeType) -> &BTreeSet<String> {
        match change {
            ChangeType::Added => &self.added,
            ChangeType::Removed => &self.removed,
            ChangeType::Ignored => &self.ignored,
        }
    }
}

impl Outputter for CompareReport {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = String::new();

        for module in &self.modules {
            let marker = if module.unchanged {
                "=".dimmed()
            } else {
                "*".yellow()
            };
            output.push_str(&format!(
                "{} {} (old={}, new={})\n",
                marker, module.path, module.old_count, module.new_count
            ));
        }
        output.push('\n');

        for change in [ChangeType::Added, ChangeType::Removed, ChangeType::Ignored] {
            let heading = match change {
                ChangeType::Added => change.heading().green().bold(),
                ChangeType::Removed => change.heading().red().bold(),
                ChangeType::Ignored => change.heading().yellow().bold(),
            };
            output.push_str(&format!("{}\n", heading));
            for token in self.tokens(change) {
                output.push_str(&format!("{}\n", token));
            }
        }

        output.push_str(&format!(
            "\n{} ({}, {:.0}ms)\n",
            self.summary,
            self.bump.as_str().bold(),
            self.duration_ms
        ));
        if let (Some(current), Some(next)) = (&self.current_version, &self.next_version) {
            output.push_str(&format!(
                "{} {} -> {}\n",
                "New version:".cyan().bold(),
                current,
                next.green().bold()
            ));
        }
        for file in &self.patched_files {
            output.push_str(&format!("{} {}\n", "Patched versions in".dimmed(), file));
        }

        output
    }
}

/// Run the compare command
pub fn run(options: &CompareOptions, output: &OutputConfig) -> Result<()> {
    let report = compare(options)?;
    Output::new(report, output.clone()).render()
}

fn compare(options: &CompareOptions) -> Result<CompareReport> {
    let current = options
        .current_version
        .as_deref()
        .map(|v| v.parse::<Version>())
        .transpose()
        .context("Invalid --current-version")?;
    if options.stamp_dir.is_some() && current.is_none() {
        bail!("--stamp-dir requires --current-version");
    }

    let pairs = collect_pairs(&options.old, &options.new, &options.files)?;
    if pairs.is_empty() {
        bail!("No modules to compare in {}", options.new.display());
    }
    info!("Comparing {} modules", pairs.len());

    let provider = build_provider(&options.reference_dirs)?;
    let analysis = AnalysisOptions {
        check_inheritance: options.check_inheritance,
        search_path: options.search_path.clone(),
    };
    let result = analyze_pairs(&provider, &pairs, &analysis)?;
    if result.has_breaking_changes() {
        info!("{} tokens removed, breaking change", result.total.removed.len());
    }

    let next = current
        .as_ref()
        .map(|current| decide(&result.total.added, &result.total.removed, current))
        .transpose()
        .context("Cannot bump --current-version")?;

    let mut patched_files = Vec::new();
    if let (Some(dir), Some(next)) = (&options.stamp_dir, &next) {
        let patched =
            stamp::stamp_directory(dir, &options.stamp_file_name, &next.numeric(), options.dry_run)?;
        patched_files = patched.iter().map(|p| p.display().to_string()).collect();
    }

    let bump = result.bump_kind();
    Ok(CompareReport {
        modules: result
            .modules
            .iter()
            .map(|m| ModuleStats {
                path: m.path.clone(),
                old_count: m.old_count,
                new_count: m.new_count,
                unchanged: m.unchanged(),
            })
            .collect(),
        added: result.total.added,
        removed: result.total.removed,
        ignored: result.total.ignored,
        bump,
        current_version: current.map(|v| v.to_string()),
        next_version: next.map(|v| v.to_string()),
        patched_files,
        summary: result.summary_text,
        duration_ms: result.duration_ms,
    })
}

/// Pair modules of the old and new build.
///
/// Two files form a single pair. For directories, every file below `new`
/// accepted by the filter is paired with the same relative path below `old`.
pub fn collect_pairs(old: &Path, new: &Path, patterns: &[String]) -> Result<Vec<ModulePair>> {
    if new.is_file() {
        let name = new
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(vec![ModulePair {
            path: name,
            old: old.is_file().then(|| ModuleSource::Path(old.to_path_buf())),
            new: ModuleSource::Path(new.to_path_buf()),
        }]);
    }
    if !new.is_dir() {
        bail!("Path does not exist: {}", new.display());
    }

    let filter = FileFilter::new(patterns).context("Invalid file pattern")?;
    let mut pairs: Vec<ModulePair> = WalkBuilder::new(new)
        .standard_filters(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(new).ok()?.to_path_buf();
            let key = relative.to_string_lossy().replace('\\', "/");
            if !filter.matches(&key) {
                return None;
            }
            let old_path = old.join(&relative);
            if !old_path.is_file() {
                debug!("{} has no previous build", key);
            }
            Some(ModulePair {
                path: key,
                old: old_path.is_file().then(|| ModuleSource::Path(old_path)),
                new: ModuleSource::Path(entry.into_path()),
            })
        })
        .collect();
    pairs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(pairs)
}
