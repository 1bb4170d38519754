use std::path::PathBuf;
use thiserror::Error;

pub type ShelfResult<T> = Result<T, ShelfError>;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The dependency listing is malformed. Raised before any installation starts.
    #[error("Invalid dependency listing: {0}")]
    Validation(String),

    /// A local manifest exists but cannot be decoded. Never repaired automatically.
    #[error(
        "Local manifest {} is corrupt ({reason}). Remove the installed package manually and re-run install.",
        path.display()
    )]
    ManifestDecode { path: PathBuf, reason: String },

    #[error("Integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Transport error for {address}: {reason}")]
    Transport { address: String, reason: String },

    #[error("Not found: {address}")]
    NotFound { address: String },

    #[error("Already exists: {address}")]
    AlreadyExists { address: String },

    /// Two packages sharing an installation root ship the same path.
    #[error("{package} cannot be installed into {}: '{path}' is already installed there by {owner}", local.display())]
    PathConflict {
        package: String,
        owner: String,
        path: String,
        local: PathBuf,
    },

    /// Malformed archive stream or a failed archive write.
    #[error("Archive error: {0}")]
    Archive(String),

    /// A resolution task ended without reporting (panicked or was aborted).
    #[error("Task error: {0}")]
    Task(String),

    /// Some dependencies of a run failed; each failure has already been reported.
    #[error("{failed} of {total} dependencies failed")]
    PartialFailure { failed: usize, total: usize },
}

impl ShelfError {
    /// Whether a retry could plausibly succeed.
    ///
    /// `NotFound` and `AlreadyExists` are definitive answers from the storage
    /// backend and are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ShelfError::Transport { .. } | ShelfError::Http(_) | ShelfError::Io(_)
        )
    }
}

/// Reasons installed state does not match a manifest.
///
/// The resolver treats every variant the same way: uninstall, then install.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("size mismatch for {path}: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("checksum mismatch for {path}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("version mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("package name mismatch: expected {expected}, found {actual}")]
    NameMismatch { expected: String, actual: String },
}
