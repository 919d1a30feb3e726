//! Change sets and result structures for surface diffs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::version::BumpKind;

/// Kind of change a token went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Ignored,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Ignored => "ignored",
        }
    }

    /// Section heading used in plain-text reports.
    pub fn heading(&self) -> &'static str {
        match self {
            ChangeType::Added => "*** ADDED ***",
            ChangeType::Removed => "*** REMOVED ***",
            ChangeType::Ignored => "*** IGNORED ***",
        }
    }
}

/// Token-level difference between two surfaces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceDiff {
    /// Public tokens only present in the new surface.
    pub added: BTreeSet<String>,
    /// Public tokens only present in the old surface.
    pub removed: BTreeSet<String>,
    /// Patterns that suppressed a changed token.
    pub ignored: BTreeSet<String>,
}

impl SurfaceDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn has_breaking_changes(&self) -> bool {
        !self.removed.is_empty()
    }

    /// Version component this diff calls for.
    pub fn bump_kind(&self) -> BumpKind {
        BumpKind::from_changes(!self.added.is_empty(), !self.removed.is_empty())
    }

    /// Fold another module's diff into this one.
    pub fn merge(&mut self, other: SurfaceDiff) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.ignored.extend(other.ignored);
    }

    pub fn tokens(&self, change: ChangeType) -> &BTreeSet<String> {
        match change {
            ChangeType::Added => &self.added,
            ChangeType::Removed => &self.removed,
            ChangeType::Ignored => &self.ignored,
        }
    }
}

/// Diff of one module pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleDiff {
    /// Relative path identifying the pair.
    pub path: String,
    pub old_count: usize,
    pub new_count: usize,
    pub old_fingerprint: String,
    pub new_fingerprint: String,
    pub diff: SurfaceDiff,
}

impl ModuleDiff {
    /// Whether both sides hashed to the same surface.
    pub fn unchanged(&self) -> bool {
        self.old_fingerprint == self.new_fingerprint
    }
}

/// Summary counts over a batch of module diffs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub modules: u32,
    pub modules_changed: u32,
    pub tokens_added: u32,
    pub tokens_removed: u32,
    pub patterns_ignored: u32,
}

impl DiffSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, module: &ModuleDiff) {
        self.modules += 1;
        if !module.diff.is_empty() {
            self.modules_changed += 1;
        }
        self.tokens_added += module.diff.added.len() as u32;
        self.tokens_removed += module.diff.removed.len() as u32;
        self.patterns_ignored += module.diff.ignored.len() as u32;
    }

    /// Human-readable summary string.
    pub fn text(&self) -> String {
        if self.tokens_added == 0 && self.tokens_removed == 0 {
            return format!("No surface changes in {} modules", self.modules);
        }

        let mut parts = Vec::new();
        if self.tokens_added > 0 {
            parts.push(format!("{} added", self.tokens_added));
        }
        if self.tokens_removed > 0 {
            parts.push(format!("{} removed", self.tokens_removed));
        }
        if self.patterns_ignored > 0 {
            parts.push(format!("{} ignored", self.patterns_ignored));
        }
        format!(
            "{} of {} modules changed: {}",
            self.modules_changed,
            self.modules,
            parts.join(", ")
        )
    }
}

/// Result of comparing a batch of module pairs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchDiffResult {
    pub modules: Vec<ModuleDiff>,
    /// Union of all per-module diffs.
    pub total: SurfaceDiff,
    pub summary: DiffSummary,
    pub summary_text: String,
    pub duration_ms: f64,
}

impl BatchDiffResult {
    pub fn add_module(&mut self, module: ModuleDiff) {
        self.summary.record(&module);
        self.total.merge(module.diff.clone());
        self.modules.push(module);
    }

    pub fn has_breaking_changes(&self) -> bool {
        self.total.has_breaking_changes()
    }

    pub fn bump_kind(&self) -> BumpKind {
        self.total.bump_kind()
    }

    /// Finalize the result with timing.
    pub fn finalize(&mut self, duration_ms: f64) {
        self.duration_ms = duration_ms;
        self.summary_text = self.summary.text();
    }
}
