//! Mesh asset error types

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error type for mesh loading
#[derive(Debug)]
pub enum AssetError {
    /// IO error other than a missing file (permission denied, etc.)
    Io(io::Error),
    /// Malformed mesh data
    Parse {
        /// 1-based line number, 0 if not tied to a line
        line: usize,
        message: String,
    },
    /// The mesh file does not exist
    NotFound(PathBuf),
}

impl AssetError {
    /// Create a parse error at the given line
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        AssetError::Parse {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Io(err) => write!(f, "Mesh IO error: {}", err),
            AssetError::Parse { line: 0, message } => write!(f, "Mesh parse error: {}", message),
            AssetError::Parse { line, message } => {
                write!(f, "Mesh parse error at line {}: {}", line, message)
            }
            AssetError::NotFound(path) => write!(f, "Mesh not found: {}", path.display()),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io(err) => Some(err),
            AssetError::Parse { .. } | AssetError::NotFound(_) => None,
        }
    }
}

impl From<io::Error> for AssetError {
    fn from(err: io::Error) -> Self {
        AssetError::Io(err)
    }
}
