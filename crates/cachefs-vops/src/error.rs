//! Control plane error types.

use std::fmt;
use std::io;
use thiserror::Error;

/// Errors produced while resolving, rendering or parsing a virtual file.
#[derive(Debug, Error)]
pub enum VopsError {
    /// Path does not live under the virtual directory.
    #[error("not a virtual file path: {0}")]
    NotVirtual(String),

    /// No descriptor is registered under this name.
    #[error("unknown virtual file: {0}")]
    UnknownVirtualFile(String),

    /// Written text matched none of the file's symbols.
    #[error("invalid value '{value}' for {file}")]
    InvalidEnumValue { file: String, value: String },

    /// The setter refused the decoded value.
    #[error("value rejected for {file}: {reason}")]
    ValueRejected { file: String, reason: String },

    /// The file has no write behavior.
    #[error("virtual file is not writable: {0}")]
    NotWritable(String),

    /// Render attempted on a buffer whose handle is already closed.
    #[error("content buffer already released: {0}")]
    BufferReleased(String),

    /// Two descriptors share a name.
    #[error("duplicate virtual file name: {0}")]
    DuplicateName(String),

    /// A collaborator action failed.
    #[error("{file}: {reason}")]
    Action { file: String, reason: String },

    /// Formatting into a content buffer failed.
    #[error("format error")]
    Fmt(#[from] fmt::Error),

    /// I/O error from a collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VopsError {
    /// Create an UnknownVirtualFile error.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownVirtualFile(name.into())
    }

    /// Create an InvalidEnumValue error, rendering the payload lossily.
    pub fn invalid_enum(file: impl Into<String>, payload: &[u8]) -> Self {
        Self::InvalidEnumValue {
            file: file.into(),
            value: String::from_utf8_lossy(payload).into_owned(),
        }
    }

    /// Create a ValueRejected error.
    pub fn rejected(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValueRejected {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create an Action error.
    pub fn action(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Action {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the submitted text rather than the path.
    pub fn is_invalid_value(&self) -> bool {
        matches!(
            self,
            VopsError::InvalidEnumValue { .. } | VopsError::ValueRejected { .. }
        )
    }
}

/// Control plane result type.
pub type VopsResult<T> = Result<T, VopsError>;
