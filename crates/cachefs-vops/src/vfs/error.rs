//! Session layer error types.

use std::io;
use thiserror::Error;

use crate::error::VopsError;

/// Error returned to the filesystem front end.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Path is neither the virtual directory nor a registered file.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not allowed on this file or handle.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Write would stage more than a control file can hold.
    #[error("write too large: {0}")]
    TooLarge(String),

    /// Handle was never opened or is already released.
    #[error("bad file handle: {0}")]
    BadHandle(u64),

    /// The control plane refused the operation.
    #[error(transparent)]
    Vops(#[from] VopsError),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a TooLarge error.
    pub fn too_large(path: impl Into<String>) -> Self {
        Self::TooLarge(path.into())
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }
}

/// Convert VfsError to std::io::Error for filesystem front ends.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::PermissionDenied(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::TooLarge(msg) => io::Error::new(io::ErrorKind::FileTooLarge, msg),
            VfsError::BadHandle(fh) => {
                io::Error::new(io::ErrorKind::InvalidInput, format!("bad file handle: {fh}"))
            }
            VfsError::Vops(e) => match e {
                VopsError::NotVirtual(msg) | VopsError::UnknownVirtualFile(msg) => {
                    io::Error::new(io::ErrorKind::NotFound, msg)
                }
                VopsError::NotWritable(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
                VopsError::Io(e) => e,
                e @ (VopsError::InvalidEnumValue { .. } | VopsError::ValueRejected { .. }) => {
                    io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
                }
                e => io::Error::other(e.to_string()),
            },
        }
    }
}

/// Session layer result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let e: io::Error = VfsError::from(VopsError::unknown("nope")).into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = VfsError::from(VopsError::invalid_enum("read_state", b"bogus")).into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);

        let e: io::Error = VfsError::too_large("/.cachefs/file_ttl").into();
        assert_eq!(e.kind(), io::ErrorKind::FileTooLarge);

        let e: io::Error = VfsError::BadHandle(7).into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);

        let e: io::Error = VfsError::from(VopsError::NotWritable("journal".into())).into();
        assert_eq!(e.kind(), io::ErrorKind::PermissionDenied);
    }
}
