//! Command implementations for the apiprint CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod compare;
pub mod extract;

use std::path::PathBuf;

use anyhow::{Context, Result};
use apiprint_core::JsonMetadataProvider;

/// Provider with every module in `reference_dirs` registered up front.
pub fn build_provider(reference_dirs: &[PathBuf]) -> Result<JsonMetadataProvider> {
    let mut provider = JsonMetadataProvider::new();
    for dir in reference_dirs {
        provider = provider
            .with_reference_dir(dir)
            .with_context(|| format!("Failed to load references from {}", dir.display()))?;
    }
    Ok(provider)
}
