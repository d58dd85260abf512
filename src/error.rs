//! Error types for the estimator.

use std::path::PathBuf;

/// Errors raised while building an estimation engine.
///
/// These are fatal at startup: no partial engine is ever constructed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The dataset or configuration file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The historical dataset is not valid CSV.
    #[error("Malformed dataset {}: {reason}", .path.display())]
    Csv { path: PathBuf, reason: String },

    /// A required column is absent from the dataset header.
    #[error("Dataset {} is missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A dataset row has an unusable value.
    #[error("Invalid record at {}:{line}: {reason}", .path.display())]
    InvalidRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// The dataset has a header but no records.
    #[error("Dataset {} contains no records", .path.display())]
    EmptyDataset { path: PathBuf },

    /// The model configuration is not valid JSON or has the wrong shape.
    #[error("Malformed model configuration {}: {reason}", .path.display())]
    Json { path: PathBuf, reason: String },

    /// The configured keyword table could not be compiled.
    #[error("Invalid keyword table: {reason}")]
    Keywords { reason: String },

    /// A mandatory configuration section is absent.
    #[error("Model configuration is missing the '{section}' section")]
    MissingSection { section: String },

    /// None of the candidate configuration paths exist.
    #[error("Model configuration not found (tried: {})", display_paths(.candidates))]
    ConfigNotFound { candidates: Vec<PathBuf> },
}

/// Errors in a prediction request, reported by the surfaces before calling the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("A bug summary is required")]
    MissingSummary,

    #[error("Unknown product '{0}', expected 'diecisiete' or 'diez'")]
    UnknownProduct(String),
}

/// Errors from the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
