//! Error types for apiprint-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for apiprint-core operations.
pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Errors that can occur while extracting or comparing API surfaces.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// A referenced module could not be located, even after probing the search path.
    #[error("Cannot resolve module '{module}' (searched {})", search_path.display())]
    MetadataResolution {
        /// Name of the module that was requested.
        module: String,
        /// Directory probed for `<module>.exe` / `<module>.dll`.
        search_path: PathBuf,
    },

    /// More than one visibility hint is attached to the same element.
    #[error("Conflicting visibility hints on {element}: found {count}")]
    DuplicateHint {
        /// Human-readable identity of the offending element.
        element: String,
        /// Number of hints found.
        count: usize,
    },

    /// Two distinct declared elements rendered to the same token.
    #[error("Duplicate signature token: {token}")]
    DuplicateToken {
        /// The token that was produced twice.
        token: String,
    },

    /// An attribute carried a payload of the wrong shape.
    #[error("Malformed attribute {attribute} on {element}: {message}")]
    MalformedAttribute {
        /// Attribute type name.
        attribute: String,
        /// Element the attribute is attached to.
        element: String,
        /// Description of the problem.
        message: String,
    },

    /// Version text could not be parsed.
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    /// IO error reading module files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Module metadata could not be decoded.
    #[error("Metadata decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
