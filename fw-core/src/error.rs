//! Error types for Fileway

use std::fmt;
use thiserror::Error;

/// Result type alias
pub type FwResult<T> = Result<T, FwError>;

/// Closed set of failure kinds every backend error is folded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidPath,
    NotFound,
    Permission,
    Conflict,
    AmbiguousTarget,
    RootProtection,
    Connection,
    Transfer,
    InvalidTarget,
    Io,
    Unsupported,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidPath => "invalid path",
            ErrorKind::NotFound => "not found",
            ErrorKind::Permission => "permission denied",
            ErrorKind::Conflict => "conflict",
            ErrorKind::AmbiguousTarget => "ambiguous target",
            ErrorKind::RootProtection => "root protection",
            ErrorKind::Connection => "connection",
            ErrorKind::Transfer => "transfer",
            ErrorKind::InvalidTarget => "invalid target",
            ErrorKind::Io => "io",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Config => "configuration",
        };
        f.write_str(s)
    }
}

/// Multi-step operation that can fail partway through a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Copy,
    Move,
    Delete,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOp::Copy => f.write_str("copy"),
            TransferOp::Move => f.write_str("move"),
            TransferOp::Delete => f.write_str("delete"),
        }
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum FwError {
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Ambiguous target, a new name is required: {0}")]
    AmbiguousTarget(String),

    #[error("Refusing to delete backend root: {0}")]
    RootProtection(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{op} failed at {path} after {} completed entries: {source}", .completed.len())]
    Transfer {
        op: TransferOp,
        path: String,
        completed: Vec<String>,
        #[source]
        source: Box<FwError>,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend error on {path}: {message}")]
    Backend { path: String, message: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FwError {
    /// Discriminator shared by all variants
    pub fn kind(&self) -> ErrorKind {
        match self {
            FwError::InvalidPath(_) => ErrorKind::InvalidPath,
            FwError::NotFound(_) => ErrorKind::NotFound,
            FwError::PermissionDenied(_) => ErrorKind::Permission,
            FwError::Conflict(_) => ErrorKind::Conflict,
            FwError::AmbiguousTarget(_) => ErrorKind::AmbiguousTarget,
            FwError::RootProtection(_) => ErrorKind::RootProtection,
            FwError::InvalidTarget(_) => ErrorKind::InvalidTarget,
            FwError::Connection(_) => ErrorKind::Connection,
            FwError::Transfer { .. } => ErrorKind::Transfer,
            FwError::Io { .. } | FwError::Backend { .. } => ErrorKind::Io,
            FwError::Unsupported(_) => ErrorKind::Unsupported,
            FwError::Config(_) => ErrorKind::Config,
        }
    }

    /// Wrap an io error, folding the well-known io kinds into the taxonomy
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => FwError::NotFound(path),
            std::io::ErrorKind::PermissionDenied => FwError::PermissionDenied(path),
            std::io::ErrorKind::AlreadyExists => FwError::Conflict(path),
            _ => FwError::Io { path, source },
        }
    }

    pub fn transfer(
        op: TransferOp,
        path: impl Into<String>,
        completed: Vec<String>,
        source: FwError,
    ) -> Self {
        FwError::Transfer {
            op,
            path: path.into(),
            completed,
            source: Box::new(source),
        }
    }

    /// Entries already written or removed before a multi-step operation stopped
    pub fn completed(&self) -> &[String] {
        match self {
            FwError::Transfer { completed, .. } => completed,
            _ => &[],
        }
    }

    /// Innermost error, looking through transfer wrappers
    pub fn root_cause(&self) -> &FwError {
        match self {
            FwError::Transfer { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
