use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the installer.
/// Every module returns `Result<T, InstallerError>`.
///
/// Only the install orchestrator lets these end a run; the checksum verifier
/// and the reconciliation engine degrade to booleans and partitions instead.
#[derive(Debug, Error)]
pub enum InstallerError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Destination is not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("Path escapes the install directory: {0}")]
    UnsafePath(String),

    #[error("Another installer is running against {0:?} (remove the lock file if it is stale)")]
    InstallLocked(PathBuf),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Pack API error: {0}")]
    Api(String),

    // ── Integrity ───────────────────────────────────────
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    // ── Versions ────────────────────────────────────────
    #[error("Invalid version string {raw:?}: {reason}")]
    InvalidVersion { raw: String, reason: String },

    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Loader ──────────────────────────────────────────
    #[error("Unsupported mod loader {name} {version}")]
    UnsupportedLoader { name: String, version: String },

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Loader metadata unreachable: {0}")]
    LoaderApi(String),

    // ── External process ────────────────────────────────
    #[error("{installer} failed after {attempts} attempts (last exit code {last_code:?})")]
    InstallerProcess {
        installer: String,
        attempts: u32,
        last_code: Option<i32>,
    },

    // ── Java runtime ────────────────────────────────────
    #[error("Java runtime error: {0}")]
    Runtime(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── User ────────────────────────────────────────────
    #[error("Installation aborted: {0}")]
    Aborted(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type InstallerResult<T> = Result<T, InstallerError>;

impl From<std::io::Error> for InstallerError {
    fn from(source: std::io::Error) -> Self {
        InstallerError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl InstallerError {
    /// Shorthand for the very common "IO error at path" construction.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallerError::Io {
            path: path.into(),
            source,
        }
    }
}
