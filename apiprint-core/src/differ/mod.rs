//! Diff engine for comparing extracted surfaces.
//!
//! Two surfaces are compared as sets of public tokens. Module-declared ignore
//! patterns filter the result, and batches of module pairs are extracted and
//! compared concurrently via Rayon.
//!
//! # Example
//!
//! ```no_run
//! use apiprint_core::differ::{analyze_pairs, AnalysisOptions, ModulePair};
//! use apiprint_core::provider::{JsonMetadataProvider, ModuleSource};
//!
//! let pairs = vec![ModulePair {
//!     path: "Contoso.Core.dll".to_string(),
//!     old: Some(ModuleSource::Path("old/Contoso.Core.dll".into())),
//!     new: ModuleSource::Path("new/Contoso.Core.dll".into()),
//! }];
//! let result = analyze_pairs(&JsonMetadataProvider::new(), &pairs, &AnalysisOptions::default())?;
//! for token in &result.total.removed {
//!     println!("BREAKING: {}", token);
//! }
//! # Ok::<(), apiprint_core::SurfaceError>(())
//! ```

pub mod changes;
pub mod comparator;

pub use changes::{BatchDiffResult, ChangeType, DiffSummary, ModuleDiff, SurfaceDiff};
pub use comparator::{
    analyze_module, analyze_pairs, diff, diff_surfaces, AnalysisOptions, ModulePair,
};
