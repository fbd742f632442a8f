//! Open-handle session layer over the control plane.
//!
//! This is the piece a filesystem front end talks to. Every open gets its
//! own [`ContentBuffer`]; the first read renders it, later reads slice it.
//! Writes accumulate per handle and are parsed once, on release.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::{debug, error, warn};

use crate::buffer::ContentBuffer;
use crate::codec;
use crate::descriptor::{Accessor, Descriptor};
use crate::error::{VopsError, VopsResult};
use crate::resolver::Resolver;
use crate::settings::ErrorPolicy;
use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::types::{DirEntry, FileAttr, OpenFlags};

/// Most bytes a single open instance will stage for parsing.
pub const MAX_STAGED: usize = 64 * 1024;

/// State of one open instance of a virtual file.
#[derive(Debug)]
struct OpenFile {
    path: String,
    /// `None` for an unknown name opened under [`ErrorPolicy::Legacy`].
    name: Option<&'static str>,
    flags: OpenFlags,
    content: ContentBuffer,
    pending: Vec<u8>,
    written: bool,
}

/// The virtual control directory as seen by a filesystem front end.
#[derive(Debug)]
pub struct VirtualDir {
    resolver: Resolver,
    policy: ErrorPolicy,
    handles: DashMap<u64, OpenFile>,
    next_fh: AtomicU64,
}

impl VirtualDir {
    pub fn new(resolver: Resolver, policy: ErrorPolicy) -> Self {
        Self {
            resolver,
            policy,
            handles: DashMap::new(),
            next_fh: AtomicU64::new(1),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Number of handles not yet released.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// True if `path` is the virtual directory or lies directly under it.
    pub fn is_virtual(&self, path: &Path) -> bool {
        match path.to_str() {
            Some(p) => {
                self.resolver.is_virtual_dir(p)
                    || !matches!(self.resolver.bare_name(p), Err(VopsError::NotVirtual(_)))
            }
            None => false,
        }
    }

    pub fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let p = path_str(path)?;
        if self.resolver.is_virtual_dir(p) {
            return Ok(FileAttr::directory(0o755));
        }
        let descriptor = self.lookup(p)?;
        let perm = if descriptor.writable() { 0o644 } else { 0o444 };
        Ok(FileAttr::file(0, perm))
    }

    /// List the virtual directory in registration order.
    pub fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let p = path_str(path)?;
        if !self.resolver.is_virtual_dir(p) {
            return Err(VfsError::not_found(p));
        }
        Ok(self
            .resolver
            .registry()
            .list_names()
            .iter()
            .map(|name| DirEntry::file(*name))
            .collect())
    }

    /// Open an instance of a virtual file and return its handle.
    pub fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<u64> {
        let p = path_str(path)?;
        if self.resolver.is_virtual_dir(p) {
            return Err(VfsError::IsADirectory(p.to_string()));
        }

        let name = match self.lookup(p) {
            Ok(descriptor) => {
                if flags.write && !descriptor.writable() {
                    match self.policy {
                        ErrorPolicy::Strict => return Err(VfsError::permission_denied(p)),
                        ErrorPolicy::Legacy => {
                            warn!(path = p, "opened read-only virtual file for writing");
                        }
                    }
                }
                Some(descriptor.name())
            }
            Err(VfsError::Vops(e @ VopsError::UnknownVirtualFile(_)))
                if self.policy == ErrorPolicy::Legacy =>
            {
                error!(path = p, "{e}");
                None
            }
            Err(e) => return Err(e),
        };

        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.handles.insert(
            fh,
            OpenFile {
                path: p.to_string(),
                name,
                flags,
                content: ContentBuffer::new(),
                pending: Vec::new(),
                written: false,
            },
        );
        debug!(path = p, fh, "virtual file opened");
        Ok(fh)
    }

    /// Read from an open instance, rendering it on first use.
    pub fn read(&self, fh: u64, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let mut file = self.handles.get_mut(&fh).ok_or(VfsError::BadHandle(fh))?;
        if !file.flags.read {
            return Err(VfsError::permission_denied(file.path.clone()));
        }

        if let Some(name) = file.name {
            let descriptor = self.descriptor(name)?;
            if let Err(e) = codec::render(&mut file.content, descriptor) {
                self.absorb(&file.path, e)?;
            }
        }
        Ok(file.content.slice(offset, size).to_vec())
    }

    /// Stage bytes for the parse at release.
    pub fn write(&self, fh: u64, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let mut file = self.handles.get_mut(&fh).ok_or(VfsError::BadHandle(fh))?;
        if !file.flags.write {
            return Err(VfsError::permission_denied(file.path.clone()));
        }

        let len = u32::try_from(data.len()).map_err(|_| VfsError::too_large(&file.path))?;
        let (start, end) = usize::try_from(offset)
            .ok()
            .and_then(|start| Some((start, start.checked_add(data.len())?)))
            .filter(|&(_, end)| end <= MAX_STAGED)
            .ok_or_else(|| VfsError::too_large(&file.path))?;

        // A gap before `start` stays NUL-filled; a NUL-led payload has no
        // leading integer and parses like any other malformed value.
        if end > file.pending.len() {
            file.pending.resize(end, 0);
        }
        file.pending[start..end].copy_from_slice(data);
        file.written = true;
        Ok(len)
    }

    /// Close an instance. Staged writes are parsed and applied here.
    pub fn release(&self, fh: u64) -> VfsResult<()> {
        let (_, mut file) = self.handles.remove(&fh).ok_or(VfsError::BadHandle(fh))?;
        file.content.release();

        if !file.written {
            return Ok(());
        }

        let result = match file.name {
            Some(name) => {
                let descriptor = self.descriptor(name)?;
                commit(descriptor, &file.pending)
            }
            None => Err(VopsError::unknown(file.path.clone())),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.absorb(&file.path, e),
        }
    }

    /// Open, read everything, release.
    pub fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let fh = self.open(path, OpenFlags::read())?;
        let mut out = Vec::new();
        let result = loop {
            match self.read(fh, out.len() as u64, 4096) {
                Ok(chunk) if chunk.is_empty() => break Ok(()),
                Ok(chunk) => out.extend_from_slice(&chunk),
                Err(e) => break Err(e),
            }
        };
        self.release(fh)?;
        result.map(|()| out)
    }

    /// Open for writing, write `data`, release.
    pub fn write_file(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        let fh = self.open(path, OpenFlags::write())?;
        if let Err(e) = self.write(fh, 0, data) {
            let _ = self.release(fh);
            return Err(e);
        }
        self.release(fh)
    }

    fn lookup(&self, path: &str) -> VfsResult<&Descriptor> {
        self.resolver.try_resolve(path).map_err(|e| match e {
            VopsError::NotVirtual(p) => VfsError::NotFound(p),
            e => VfsError::Vops(e),
        })
    }

    fn descriptor(&self, name: &str) -> VfsResult<&Descriptor> {
        self.resolver
            .registry()
            .find(name)
            .ok_or_else(|| VfsError::Vops(VopsError::unknown(name)))
    }

    /// Surface or swallow a control plane error according to the policy.
    fn absorb(&self, path: &str, e: VopsError) -> VfsResult<()> {
        match self.policy {
            ErrorPolicy::Strict => Err(VfsError::Vops(e)),
            ErrorPolicy::Legacy => {
                error!(path, "{e}");
                Ok(())
            }
        }
    }
}

/// Apply staged bytes to the file behind `descriptor`.
///
/// Settings go through the parse engine; dispatcher files hand the bytes
/// to their collaborator untouched.
fn commit(descriptor: &Descriptor, raw: &[u8]) -> VopsResult<()> {
    match descriptor.accessor() {
        Accessor::External(dispatcher) => {
            if !dispatcher.accepts_writes() {
                return Err(VopsError::NotWritable(descriptor.name().to_string()));
            }
            dispatcher.commit(descriptor.name(), raw)
        }
        _ => codec::parse(raw, descriptor).map(|_| ()),
    }
}

fn path_str(path: &Path) -> VfsResult<&str> {
    path.to_str()
        .ok_or_else(|| VfsError::not_found(path.display().to_string()))
}
