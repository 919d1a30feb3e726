//! Comparator logic for diffing surfaces.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::differ::changes::{BatchDiffResult, ModuleDiff, SurfaceDiff};
use crate::error::Result;
use crate::provider::{MetadataProvider, ModuleSource};
use crate::surface::{IgnoreEntry, Surface, SurfaceExtractor};

/// Compare two surfaces under an explicit ignore list.
///
/// Only public tokens take part. A token matching a non-forced pattern is
/// dropped from both sides of the result unless another entry forces the
/// same pattern back in.
pub fn diff(old: &Surface, new: &Surface, ignores: &[IgnoreEntry]) -> SurfaceDiff {
    let forced: HashSet<&str> = ignores
        .iter()
        .filter(|i| i.force_included)
        .map(|i| i.pattern.as_str())
        .collect();
    let suppressed: HashSet<&str> = ignores
        .iter()
        .filter(|i| !i.force_included && !forced.contains(i.pattern.as_str()))
        .map(|i| i.pattern.as_str())
        .collect();

    let old_tokens = old.public_tokens();
    let new_tokens = new.public_tokens();
    let mut result = SurfaceDiff::default();

    let mut classify = |token: &str, into: &mut BTreeSet<String>| {
        if suppressed.contains(token) {
            result.ignored.insert(token.to_string());
        } else {
            into.insert(token.to_string());
        }
    };

    let mut added = BTreeSet::new();
    for token in new_tokens.difference(&old_tokens) {
        classify(token, &mut added);
    }
    let mut removed = BTreeSet::new();
    for token in old_tokens.difference(&new_tokens) {
        classify(token, &mut removed);
    }
    result.added = added;
    result.removed = removed;
    result
}

/// Compare two surfaces using the ignore declarations of both.
pub fn diff_surfaces(old: &Surface, new: &Surface) -> SurfaceDiff {
    let ignores: Vec<IgnoreEntry> = old
        .ignores
        .iter()
        .chain(new.ignores.iter())
        .cloned()
        .collect();
    diff(old, new, &ignores)
}

/// One module to compare, identified by its relative path.
#[derive(Clone, Debug)]
pub struct ModulePair {
    pub path: String,
    /// `None` when the module is new.
    pub old: Option<ModuleSource>,
    pub new: ModuleSource,
}

/// Settings shared by every extraction in a batch.
#[derive(Clone, Debug, Default)]
pub struct AnalysisOptions {
    pub check_inheritance: bool,
    /// Dependency directory; defaults to the new module's directory.
    pub search_path: Option<PathBuf>,
}

/// Extract one module.
pub fn analyze_module<P: MetadataProvider + ?Sized>(
    provider: &P,
    source: &ModuleSource,
    options: &AnalysisOptions,
) -> Result<Surface> {
    let set = provider.load_module(source, options.search_path.as_deref())?;
    SurfaceExtractor::new(options.check_inheritance).extract(&set)
}

fn analyze_pair<P: MetadataProvider + ?Sized>(
    provider: &P,
    pair: &ModulePair,
    options: &AnalysisOptions,
) -> Result<ModuleDiff> {
    // Old builds resolve dependencies next to the new build
    let search_path = options
        .search_path
        .clone()
        .unwrap_or_else(|| pair.new.default_search_path());
    let options = AnalysisOptions {
        check_inheritance: options.check_inheritance,
        search_path: Some(search_path),
    };

    let new = analyze_module(provider, &pair.new, &options)?;
    let old = match &pair.old {
        Some(source) => analyze_module(provider, source, &options)?,
        None => {
            debug!("No previous build of {}, comparing against empty surface", pair.path);
            Surface::empty(&new.module)
        }
    };

    let diff = diff_surfaces(&old, &new);
    debug!(
        "{}: old={} new={} added={} removed={}",
        pair.path,
        old.public_count(),
        new.public_count(),
        diff.added.len(),
        diff.removed.len()
    );
    Ok(ModuleDiff {
        path: pair.path.clone(),
        old_count: old.public_count(),
        new_count: new.public_count(),
        old_fingerprint: old.fingerprint(),
        new_fingerprint: new.fingerprint(),
        diff,
    })
}

/// Compare every pair, one extraction per module in parallel.
///
/// The first failing pair aborts the batch.
pub fn analyze_pairs<P: MetadataProvider + ?Sized>(
    provider: &P,
    pairs: &[ModulePair],
    options: &AnalysisOptions,
) -> Result<BatchDiffResult> {
    let start = Instant::now();

    let modules: Vec<ModuleDiff> = pairs
        .par_iter()
        .map(|pair| analyze_pair(provider, pair, options))
        .collect::<Result<Vec<_>>>()?;

    let mut result = BatchDiffResult::default();
    for module in modules {
        result.add_module(module);
    }
    result.finalize(start.elapsed().as_secs_f64() * 1000.0);
    info!("{} in {:.1}ms", result.summary_text, result.duration_ms);
    Ok(result)
}
