use std::path::PathBuf;
use thiserror::Error;

/// Failure to enumerate a corpus folder. Individual unreadable documents are
/// not errors; they are skipped with a warning.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("folder does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("invalid corpus pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Failure to load a persisted JSON resource (schema forest, category table).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {} at JSON path {json_path} → {message}", path.display())]
    Json {
        path: PathBuf,
        json_path: String,
        message: String,
    },
}
