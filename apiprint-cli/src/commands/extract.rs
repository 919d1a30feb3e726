//! Extract command - Print the API surface of one module
//!
//! Loads a module's metadata, resolves visibility and prints every public
//! signature token together with the surface fingerprint.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use apiprint_core::{
    IgnoreEntry, MetadataProvider, ModuleSource, SignatureEntry, SurfaceExtractor,
};

use super::build_provider;
use crate::output::{Output, OutputConfig, Outputter};

/// Extracted surface report
#[derive(Debug, Serialize)]
pub struct ExtractReport {
    pub module: String,
    pub fingerprint: String,
    pub public_count: usize,
    pub total_count: usize,
    /// Public entries, or every entry with `--all`.
    pub entries: Vec<SignatureEntry>,
    pub ignores: Vec<IgnoreEntry>,
    pub duration_ms: u64,
}

impl Outputter for ExtractReport {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} {} {}\n",
            "SURFACE:".cyan().bold(),
            self.module.bold(),
            self.fingerprint.dimmed()
        ));
        output.push_str(&format!(
            "{} public of {} tokens ({}ms)\n\n",
            self.public_count.to_string().cyan(),
            self.total_count,
            self.duration_ms
        ));

        for entry in &self.entries {
            if entry.is_public {
                output.push_str(&format!("  {}\n", entry.token));
            } else {
                output.push_str(&format!("  {} {}\n", "-".dimmed(), entry.token.dimmed()));
            }
        }

        if !self.ignores.is_empty() {
            output.push_str(&format!("\n{}\n", "IGNORES:".yellow().bold()));
            for ignore in &self.ignores {
                let marker = if ignore.force_included { "+" } else { "~" };
                output.push_str(&format!("  {} {}\n", marker, ignore.pattern));
            }
        }

        output
    }
}

/// Run the extract command
pub fn run(
    module: &Path,
    search_path: Option<PathBuf>,
    reference_dirs: &[PathBuf],
    check_inheritance: bool,
    all: bool,
    output: &OutputConfig,
) -> Result<()> {
    let report = extract_report(module, search_path, reference_dirs, check_inheritance, all)?;
    Output::new(report, output.clone()).render()
}

fn extract_report(
    module: &Path,
    search_path: Option<PathBuf>,
    reference_dirs: &[PathBuf],
    check_inheritance: bool,
    all: bool,
) -> Result<ExtractReport> {
    let start = Instant::now();

    let provider = build_provider(reference_dirs)?;
    let source = ModuleSource::Path(module.to_path_buf());
    let set = provider
        .load_module(&source, search_path.as_deref())
        .with_context(|| format!("Failed to load {}", module.display()))?;
    let surface = SurfaceExtractor::new(check_inheritance)
        .extract(&set)
        .with_context(|| format!("Failed to extract surface of {}", module.display()))?;

    let public = surface.public_tokens();
    let mut entries: Vec<SignatureEntry> = surface
        .entries
        .iter()
        .filter(|e| all || public.contains(e.token.as_str()))
        .map(|e| SignatureEntry::new(e.token.clone(), public.contains(e.token.as_str())))
        .collect();
    entries.sort_by(|a, b| a.token.cmp(&b.token));

    Ok(ExtractReport {
        module: surface.module.clone(),
        fingerprint: surface.fingerprint(),
        public_count: public.len(),
        total_count: surface.entries.len(),
        entries,
        ignores: surface.ignores.clone(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
