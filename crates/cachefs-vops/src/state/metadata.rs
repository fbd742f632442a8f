//! Metadata cache and its control files.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::buffer::ContentBuffer;
use crate::codec::{parse_int, payload};
use crate::descriptor::Dispatcher;
use crate::error::{VopsError, VopsResult};
use crate::vfs::{DirEntry, FileAttr, FileType};

/// Where metadata comes from on a cache miss or fill.
pub trait MetadataSource: Send + Sync {
    /// Attributes of `path` (absolute within the backing tree).
    fn stat(&self, path: &str) -> io::Result<FileAttr>;

    /// Children of the directory at `path`.
    fn list(&self, path: &str) -> io::Result<Vec<DirEntry>>;
}

/// Source for a cache with no backing tree configured.
#[derive(Debug, Default)]
pub struct NoSource;

impl MetadataSource for NoSource {
    fn stat(&self, path: &str) -> io::Result<FileAttr> {
        Err(io::Error::new(io::ErrorKind::NotFound, format!("no backing for {path}")))
    }

    fn list(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        self.stat(path).map(|_| Vec::new())
    }
}

/// Reads metadata from a local backing directory.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        let relative = normalize(path);
        self.root.join(relative.trim_start_matches('/'))
    }
}

fn kind_of(file_type: std::fs::FileType) -> FileType {
    if file_type.is_dir() {
        FileType::Directory
    } else if file_type.is_symlink() {
        FileType::Symlink
    } else {
        FileType::File
    }
}

impl MetadataSource for LocalSource {
    fn stat(&self, path: &str) -> io::Result<FileAttr> {
        let meta = std::fs::symlink_metadata(self.full_path(path))?;
        Ok(FileAttr {
            size: meta.len(),
            kind: kind_of(meta.file_type()),
            perm: meta.permissions().mode() & 0o7777,
        })
    }

    fn list(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(self.full_path(path))? {
            let entry = entry?;
            let kind = kind_of(entry.file_type()?);
            entries.push(DirEntry::new(entry.file_name().to_string_lossy(), kind));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// A cached attribute set.
#[derive(Debug, Clone)]
pub struct MetadataEntry {
    pub attr: FileAttr,
    pub cached_at: Instant,
}

/// Path-keyed attribute cache.
pub struct MetadataCache {
    entries: RwLock<BTreeMap<String, MetadataEntry>>,
    source: Arc<dyn MetadataSource>,
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(Arc::new(NoSource))
    }
}

impl MetadataCache {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            source,
        }
    }

    pub fn insert(&self, path: &str, attr: FileAttr) {
        self.entries.write().insert(
            normalize(path),
            MetadataEntry {
                attr,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, path: &str) -> Option<MetadataEntry> {
        self.entries.read().get(&normalize(path)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Forget everything; returns how many entries were dropped.
    pub fn flush(&self) -> usize {
        let mut entries = self.entries.write();
        let n = entries.len();
        entries.clear();
        n
    }

    /// Forget `path` and everything below it.
    pub fn flush_entry(&self, path: &str) -> usize {
        let path = normalize(path);
        if path == "/" {
            return self.flush();
        }
        let below = format!("{path}/");
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|k, _| *k != path && !k.starts_with(&below));
        before - entries.len()
    }

    /// Load `path` and, for directories, everything below it from the source.
    pub fn fill(&self, path: &str) -> VopsResult<usize> {
        let mut stack = vec![normalize(path)];
        let mut loaded = 0;

        while let Some(current) = stack.pop() {
            let attr = self.source.stat(&current)?;
            if attr.is_dir() {
                for child in self.source.list(&current)? {
                    stack.push(join(&current, &child.name));
                }
            }
            debug!(path = %current, "metadata filled");
            self.insert(&current, attr);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// One line per entry: `path kind perm size age`.
    pub fn dump(&self, out: &mut impl Write) -> std::fmt::Result {
        let entries = self.entries.read();
        for (path, entry) in entries.iter() {
            writeln!(
                out,
                "{} {} {:o} {} {}s",
                path,
                entry.attr.kind.as_str(),
                entry.attr.perm,
                entry.attr.size,
                entry.cached_at.elapsed().as_secs()
            )?;
        }
        Ok(())
    }
}

/// Absolute form of `path` with `.`/`..` resolved; never escapes `/`.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(s) => parts.push(s.to_str().unwrap_or_default()),
            Component::ParentDir => {
                parts.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    format!("/{}", parts.join("/"))
}

fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

fn payload_str<'a>(file: &str, raw: &'a [u8]) -> VopsResult<&'a str> {
    let text = std::str::from_utf8(payload(raw))
        .map_err(|_| VopsError::rejected(file, "path is not valid UTF-8"))?;
    if text.is_empty() {
        return Err(VopsError::rejected(file, "empty path"));
    }
    Ok(text)
}

/// `metadata`: cached entries.
pub struct MetadataDump {
    cache: Arc<MetadataCache>,
}

impl MetadataDump {
    pub fn new(cache: Arc<MetadataCache>) -> Self {
        Self { cache }
    }
}

impl Dispatcher for MetadataDump {
    fn render(&self, buf: &mut ContentBuffer) -> VopsResult<()> {
        self.cache.dump(buf)?;
        Ok(())
    }
}

/// `metadata_flush`: write `1` to flush everything, or a path to flush it.
pub struct MetadataFlush {
    cache: Arc<MetadataCache>,
}

impl MetadataFlush {
    pub fn new(cache: Arc<MetadataCache>) -> Self {
        Self { cache }
    }
}

impl Dispatcher for MetadataFlush {
    fn render(&self, buf: &mut ContentBuffer) -> VopsResult<()> {
        writeln!(buf, "Write '1' to flush, or a path to flush one entry.")?;
        Ok(())
    }

    fn accepts_writes(&self) -> bool {
        true
    }

    fn commit(&self, file: &str, raw: &[u8]) -> VopsResult<()> {
        if parse_int(payload(raw)) == Some(1) {
            let flushed = self.cache.flush();
            info!(flushed, "metadata flushed");
            return Ok(());
        }
        let path = payload_str(file, raw)?;
        let flushed = self.cache.flush_entry(path);
        info!(path, flushed, "metadata entry flushed");
        Ok(())
    }
}

/// `metadata_fill`: write a path to load its metadata tree.
pub struct MetadataFill {
    cache: Arc<MetadataCache>,
}

impl MetadataFill {
    pub fn new(cache: Arc<MetadataCache>) -> Self {
        Self { cache }
    }
}

impl Dispatcher for MetadataFill {
    fn render(&self, buf: &mut ContentBuffer) -> VopsResult<()> {
        writeln!(buf, "Write a path to load its metadata.")?;
        Ok(())
    }

    fn accepts_writes(&self) -> bool {
        true
    }

    fn commit(&self, file: &str, raw: &[u8]) -> VopsResult<()> {
        let path = payload_str(file, raw)?;
        let loaded = self.cache.fill(path)?;
        info!(path, loaded, "metadata filled");
        Ok(())
    }
}
