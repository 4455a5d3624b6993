//! Error types for registry loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while loading the service registry
///
/// Any of these rejects the whole registry; no partial record set is returned.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry file could not be read
    #[error("Failed to read registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a structurally valid registry
    #[error("Malformed registry: {0}")]
    Format(String),

    /// The document parsed but violates registry invariants
    #[error("Invalid registry: {}", issues.join("; "))]
    Validation {
        /// Every violation found, in document order
        issues: Vec<String>,
    },
}

impl RegistryError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}
