//! Error types for autowiki-core.
//!
//! One variant per category, plus `#[from]` wraps for
//! the external errors the pipeline actually produces. `status_code`
//! centralizes the taxonomy -> HTTP mapping so the axum adapter has a
//! single place to look.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all autowiki-core operations.
#[derive(Debug, Error)]
pub enum AutoWikiError {
    /// Bad repo URL, bad project id, or other caller-supplied garbage.
    #[error("invalid input: {0}")]
    InputError(String),

    /// Vector collection absent or tree file absent. Never fatal: callers
    /// degrade to an empty result rather than propagating this upward,
    /// except `SearchService::search` which surfaces it as `TreeMissing`.
    #[error("resource missing: {0}")]
    ResourceMissing(String),

    /// Tree-sitter failure or non-UTF-8 content for one file. Recovered
    /// locally; ingestion continues with the rest of the repository.
    #[error("parse failure for {path}: {message}")]
    ParseFailure {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// Human-readable description.
        message: String,
    },

    /// Could not create/remove a directory the pipeline needs.
    #[error("filesystem error: {0}")]
    FilesystemError(String),

    /// Git clone failure or vector-store I/O failure. Fatal for the
    /// current request.
    #[error("external error: {0}")]
    ExternalError(String),

    /// The module tree for a project has not been built yet (or was
    /// never built), distinct from a generic `ResourceMissing` because
    /// `SearchService` has a documented fallback path for it.
    #[error("module tree missing for project {0}")]
    TreeMissing(String),

    /// Git operation failed.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse error.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl AutoWikiError {
    /// HTTP status code the axum adapter should return for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AutoWikiError::InputError(_) => 400,
            AutoWikiError::ResourceMissing(_) | AutoWikiError::TreeMissing(_) => 404,
            AutoWikiError::ParseFailure { .. }
            | AutoWikiError::FilesystemError(_)
            | AutoWikiError::ExternalError(_)
            | AutoWikiError::Git(_)
            | AutoWikiError::Io(_)
            | AutoWikiError::Serialization(_)
            | AutoWikiError::Config(_) => 500,
        }
    }
}

/// Convenience type alias for Results in autowiki-core.
pub type AutoWikiResult<T> = Result<T, AutoWikiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_maps_to_400() {
        assert_eq!(AutoWikiError::InputError("bad url".into()).status_code(), 400);
    }

    #[test]
    fn missing_resources_map_to_404() {
        assert_eq!(AutoWikiError::ResourceMissing("x".into()).status_code(), 404);
        assert_eq!(AutoWikiError::TreeMissing("p".into()).status_code(), 404);
    }

    #[test]
    fn everything_else_maps_to_500() {
        assert_eq!(AutoWikiError::FilesystemError("x".into()).status_code(), 500);
        assert_eq!(AutoWikiError::ExternalError("x".into()).status_code(), 500);
    }
}
