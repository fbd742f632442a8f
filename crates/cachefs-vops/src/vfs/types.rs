//! Attribute and listing types handed to the filesystem front end.

/// Kind of node, as far as the control plane and metadata cache care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

impl FileType {
    /// Label used in the metadata dump.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Directory => "dir",
            FileType::Symlink => "link",
        }
    }
}

/// The attributes a control file or cached metadata entry reports.
///
/// Virtual files report size 0, as procfs does; their content only exists
/// once an instance is opened and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttr {
    pub size: u64,
    pub kind: FileType,
    /// Permission bits, e.g. `0o644`.
    pub perm: u32,
}

impl FileAttr {
    pub fn file(size: u64, perm: u32) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm,
        }
    }

    pub fn directory(perm: u32) -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            perm,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileType::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileType::Directory
    }
}

/// One name in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileType,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }
}

/// Access mode requested at open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
}

impl OpenFlags {
    pub fn read() -> Self {
        Self {
            read: true,
            write: false,
        }
    }

    /// Write-only, as `echo value > file` opens it.
    pub fn write() -> Self {
        Self {
            read: false,
            write: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_constructors() {
        let file = FileAttr::file(0, 0o644);
        assert!(file.is_file());
        assert!(!file.is_dir());

        let dir = FileAttr::directory(0o755);
        assert!(dir.is_dir());
        assert_eq!(dir.kind.as_str(), "dir");
        assert_eq!(FileType::Symlink.as_str(), "link");
    }

    #[test]
    fn test_open_flags() {
        assert!(OpenFlags::read().read && !OpenFlags::read().write);
        assert!(OpenFlags::write().write && !OpenFlags::write().read);
    }
}
