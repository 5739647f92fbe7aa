//! Error types for report generation.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a whole report request.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Intentional early exit. Callers log it instead of showing an error.
    #[error("Report cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Listing(#[from] ListError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ReportError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ReportError::Cancelled(_))
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Directory listing failed for a reason other than a missing root.
#[derive(Debug, Error)]
#[error("Failed to list directory {path:?}: {source}")]
pub struct ListError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Hashing a single file failed.
#[derive(Debug, Error)]
#[error("Failed to hash {path:?}: {code} ({source})")]
pub struct HashError {
    pub path: PathBuf,
    /// Portable error code, e.g. `ENOENT` or `EMFILE`.
    pub code: String,
    #[source]
    pub source: io::Error,
}

impl HashError {
    pub fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            code: io_error_code(&source),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == "ENOENT"
    }

    /// True for file descriptor exhaustion, which goes away once other
    /// handles are closed.
    pub fn is_descriptor_exhaustion(&self) -> bool {
        matches!(self.code.as_str(), "EMFILE" | "ENFILE")
    }
}

/// Returned by a closed concurrency limiter instead of running the operation.
#[derive(Debug, Clone, Copy, Error)]
#[error("concurrency limiter closed")]
pub struct LimiterClosed;

impl From<LimiterClosed> for HashError {
    fn from(_: LimiterClosed) -> Self {
        Self {
            path: PathBuf::new(),
            code: "ECANCELED".to_string(),
            source: io::Error::new(io::ErrorKind::Interrupted, LimiterClosed),
        }
    }
}

/// Maps an I/O error to a short POSIX style code so reports read the same on
/// every platform.
pub fn io_error_code(err: &io::Error) -> String {
    if let Some(code) = err.raw_os_error().and_then(os_error_code) {
        return code.to_string();
    }

    match err.kind() {
        io::ErrorKind::NotFound => "ENOENT",
        io::ErrorKind::PermissionDenied => "EPERM",
        io::ErrorKind::AlreadyExists => "EEXIST",
        io::ErrorKind::InvalidInput => "EINVAL",
        io::ErrorKind::Interrupted => "EINTR",
        io::ErrorKind::WouldBlock => "EAGAIN",
        _ => "EIO",
    }
    .to_string()
}

#[cfg(unix)]
fn os_error_code(code: i32) -> Option<&'static str> {
    match code {
        1 => Some("EPERM"),
        2 => Some("ENOENT"),
        5 => Some("EIO"),
        13 => Some("EACCES"),
        16 => Some("EBUSY"),
        21 => Some("EISDIR"),
        23 => Some("ENFILE"),
        24 => Some("EMFILE"),
        _ => None,
    }
}

#[cfg(windows)]
fn os_error_code(code: i32) -> Option<&'static str> {
    match code {
        2 | 3 => Some("ENOENT"),
        4 => Some("EMFILE"),
        5 => Some("EPERM"),
        32 | 33 => Some("EBUSY"),
        _ => None,
    }
}

#[cfg(not(any(unix, windows)))]
fn os_error_code(_code: i32) -> Option<&'static str> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds_to_codes() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(io_error_code(&err), "ENOENT");

        let err = io::Error::new(io::ErrorKind::Other, "odd");
        assert_eq!(io_error_code(&err), "EIO");
    }

    #[cfg(unix)]
    #[test]
    fn maps_raw_os_errors_to_codes() {
        assert_eq!(io_error_code(&io::Error::from_raw_os_error(24)), "EMFILE");
        assert_eq!(io_error_code(&io::Error::from_raw_os_error(2)), "ENOENT");
    }

    #[cfg(unix)]
    #[test]
    fn descriptor_exhaustion_is_detected() {
        let err = HashError::new(Path::new("x"), io::Error::from_raw_os_error(24));
        assert!(err.is_descriptor_exhaustion());
        assert!(!err.is_not_found());

        let err = HashError::new(Path::new("x"), io::Error::from_raw_os_error(23));
        assert!(err.is_descriptor_exhaustion());
    }

    #[test]
    fn cancellation_is_distinguishable() {
        assert!(ReportError::Cancelled("no mod".into()).is_cancellation());
        assert!(!ReportError::Runtime("boom".into()).is_cancellation());
    }
}
