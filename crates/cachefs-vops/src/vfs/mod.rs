//! Filesystem-facing view of the control plane.
//!
//! [`VirtualDir`] is what a FUSE front end would call from its
//! `getattr`/`readdir`/`open`/`read`/`write`/`release` handlers for paths
//! under the virtual directory.

mod dir;
mod error;
mod types;

pub use dir::{MAX_STAGED, VirtualDir};
pub use error::{VfsError, VfsResult};
pub use types::{DirEntry, FileAttr, FileType, OpenFlags};
