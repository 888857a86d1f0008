//! Error handling types and utilities.

use std::path::PathBuf;

/// A specialized Result type for regidx operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods throughout the codebase.
pub type Result<T> = anyhow::Result<T>;

/// Error returned when the registry source cannot be located.
///
/// This is the fatal class of build-time failures: a single malformed
/// descriptor is skipped, but a missing registry root aborts the whole build.
#[derive(Debug, Clone)]
pub enum SourceError {
    /// No candidate directory contained the registry metadata and index.
    RootNotFound { candidates: Vec<PathBuf> },
    /// The registry root exists but its metadata file is unreadable.
    MetadataUnreadable { path: PathBuf, error: String },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootNotFound { candidates } => {
                write!(
                    f,
                    "registry root not found; expected a directory containing registry.json and index/ at one of: {}",
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Self::MetadataUnreadable { path, error } => {
                write!(
                    f,
                    "failed to read registry metadata at {}: {}",
                    path.display(),
                    error
                )
            }
        }
    }
}

impl std::error::Error for SourceError {}
