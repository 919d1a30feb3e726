//! apiprint core - API surface fingerprinting for compiled modules.
//!
//! This crate turns a module's type and member metadata into a set of
//! canonical signature tokens, compares two such sets and decides the
//! semantic-version bump the difference calls for.
//!
//! # Features
//!
//! - **Visibility resolution**: obfuscation hints, module defaults and nested-type inheritance
//! - **Canonical signatures**: order-independent, culture-invariant tokens per declared element
//! - **Surface diffing**: added / removed / ignored tokens with module-declared ignore patterns
//! - **Parallel batches**: one extraction per module pair via Rayon
//! - **Version policy**: major / minor / patch decisions
//!
//! # Nested types
//!
//! Nested types are named `Namespace.Outer+Inner`, so two nested types with
//! the same simple name in different enclosing types get distinct tokens.
//! Tools that name nested types `Namespace.Inner` produce different tokens
//! for them; surfaces from such tools cannot be diffed against these.
//!
//! # Usage
//!
//! ```no_run
//! use apiprint_core::{JsonMetadataProvider, MetadataProvider, ModuleSource, SurfaceExtractor};
//!
//! let provider = JsonMetadataProvider::new();
//! let set = provider.load_module(&ModuleSource::Path("bin/Contoso.Core.dll".into()), None)?;
//! let surface = SurfaceExtractor::new(false).extract(&set)?;
//! for token in surface.public_tokens() {
//!     println!("{}", token);
//! }
//! # Ok::<(), apiprint_core::SurfaceError>(())
//! ```

pub mod differ;
pub mod error;
pub mod hints;
pub mod provider;
pub mod render;
pub mod surface;
pub mod types;
pub mod version;
pub mod visibility;

pub use differ::{analyze_pairs, diff, diff_surfaces, AnalysisOptions, ModulePair, SurfaceDiff};
pub use error::{Result, SurfaceError};
pub use hints::ObfuscationHint;
pub use provider::{JsonMetadataProvider, MetadataProvider, ModuleSet, ModuleSource};
pub use render::{SignatureEntry, SignatureRenderer};
pub use surface::{IgnoreEntry, Surface, SurfaceExtractor};
pub use types::{MemberNode, ModuleMetadata, TypeKind, TypeNode, TypeRef};
pub use version::{decide, BumpKind, Version};
pub use visibility::{resolve, VisibilityMap, VisibilityState};
