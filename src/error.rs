//! Engine error type
//!
//! Every fallible operation in the renderer returns [`EngineError`]. The
//! render context additionally keeps the most recent failure around as a
//! [`LastError`] so diagnostic overlays can show it after the fact.

use std::path::{Path, PathBuf};

/// Broad category of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Mesh too large, triangle queue full
    CapacityExceeded,
    /// Texture or terrain dimensions outside what the engine supports
    UnsupportedSize,
    /// No camera / entity / texture / driver at the requested slot
    ResourceMissing,
    /// Unrecognized mesh, material or config syntax
    FormatInvalid,
    /// File open/read failure
    Io,
    /// Requested accelerator not present or no compatible display mode
    BackendUnavailable,
}

/// Centralized error type for all renderer operations
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("size exceeded: {what} ({requested} > {max})")]
    SizeExceeded {
        what: &'static str,
        requested: usize,
        max: usize,
    },

    #[error("triangle queue full ({capacity} elements)")]
    QueueFull { capacity: usize },

    #[error("unsupported size: {0}")]
    UnsupportedSize(String),

    #[error("missing resource: {0}")]
    Missing(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("read error on {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::SizeExceeded { .. } | EngineError::QueueFull { .. } => {
                ErrorKind::CapacityExceeded
            }
            EngineError::UnsupportedSize(_) => ErrorKind::UnsupportedSize,
            EngineError::Missing(_) => ErrorKind::ResourceMissing,
            EngineError::Format(_) => ErrorKind::FormatInvalid,
            EngineError::Read { .. } => ErrorKind::Io,
            EngineError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
        }
    }

    /// Convenience constructors for common error types
    pub fn format<T: ToString>(msg: T) -> Self {
        EngineError::Format(msg.to_string())
    }

    pub fn missing<T: ToString>(msg: T) -> Self {
        EngineError::Missing(msg.to_string())
    }

    pub fn unsupported<T: ToString>(msg: T) -> Self {
        EngineError::UnsupportedSize(msg.to_string())
    }

    pub fn read(path: &Path, err: impl std::fmt::Display) -> Self {
        EngineError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<ron::error::SpannedError> for EngineError {
    fn from(e: ron::error::SpannedError) -> Self {
        EngineError::Format(format!("RON {}", e))
    }
}

impl From<ron::Error> for EngineError {
    fn from(e: ron::Error) -> Self {
        EngineError::Format(format!("RON {}", e))
    }
}

/// Snapshot of the most recent failure recorded by the render context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&EngineError> for LastError {
    fn from(e: &EngineError) -> Self {
        LastError {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let e = EngineError::SizeExceeded { what: "vertices", requested: 70_000, max: 65_000 };
        assert_eq!(e.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(EngineError::QueueFull { capacity: 8192 }.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(EngineError::format("bad").kind(), ErrorKind::FormatInvalid);
        assert_eq!(EngineError::read(Path::new("x.obj"), "nope").kind(), ErrorKind::Io);
    }

    #[test]
    fn test_last_error_snapshot() {
        let e = EngineError::BackendUnavailable("hardware B: no driver".into());
        let last = LastError::from(&e);
        assert_eq!(last.kind, ErrorKind::BackendUnavailable);
        assert!(last.message.contains("no driver"));
    }
}
