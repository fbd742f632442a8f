//! Path resolution for the virtual directory.
//!
//! A virtual file path is `<prefix>/<name>` where `<name>` is exactly one
//! path component registered in the [`Registry`].

use std::sync::Arc;

use tracing::error;

use crate::descriptor::Descriptor;
use crate::error::{VopsError, VopsResult};
use crate::registry::Registry;

/// Default location of the virtual directory inside the mount.
pub const DEFAULT_PREFIX: &str = "/.cachefs";

/// Maps full paths under the virtual directory to descriptors.
#[derive(Debug, Clone)]
pub struct Resolver {
    prefix: String,
    registry: Arc<Registry>,
}

impl Resolver {
    /// Create a resolver for `prefix`.
    ///
    /// The prefix is normalized to start with `/` and carry no trailing slash.
    pub fn new(prefix: impl AsRef<str>, registry: Arc<Registry>) -> Self {
        Self {
            prefix: normalize_prefix(prefix.as_ref()),
            registry,
        }
    }

    pub fn prefix(&self) -> &str {
        if self.prefix.is_empty() { "/" } else { &self.prefix }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// True if `path` names the virtual directory itself.
    pub fn is_virtual_dir(&self, path: &str) -> bool {
        let trimmed = path.trim_end_matches('/');
        trimmed == self.prefix
    }

    /// Strip the prefix and return the bare file name.
    ///
    /// The prefix must match whole path components: with prefix `/.cachefs`,
    /// `/.cachefsx/a` is not virtual.
    pub fn bare_name<'a>(&self, full_path: &'a str) -> VopsResult<&'a str> {
        let rest = full_path
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| VopsError::NotVirtual(full_path.to_string()))?;

        if rest.is_empty() || rest.contains('/') {
            return Err(VopsError::unknown(rest));
        }
        Ok(rest)
    }

    /// Resolve a full path, reporting why it failed.
    pub fn try_resolve(&self, full_path: &str) -> VopsResult<&Descriptor> {
        let name = self.bare_name(full_path)?;
        self.registry.find(name).ok_or_else(|| VopsError::unknown(name))
    }

    /// Resolve a full path; failures are logged and reported as `None`.
    pub fn resolve(&self, full_path: &str) -> Option<&Descriptor> {
        match self.try_resolve(full_path) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                error!(path = full_path, "invalid virtual file: {e}");
                None
            }
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(prefix: &str) -> Resolver {
        let registry = Registry::new(vec![
            Descriptor::numeric("file_ttl", || 300, |_| Ok(())),
            Descriptor::numeric("journal_size", || 0, |_| Ok(())),
        ])
        .unwrap();
        Resolver::new(prefix, Arc::new(registry))
    }

    #[test]
    fn test_resolve_registered() {
        let r = resolver(DEFAULT_PREFIX);
        let d = r.resolve("/.cachefs/file_ttl").unwrap();
        assert_eq!(d.name(), "file_ttl");
    }

    #[test]
    fn test_unknown_name() {
        let r = resolver(DEFAULT_PREFIX);
        assert!(r.resolve("/.cachefs/does_not_exist").is_none());
        assert!(matches!(
            r.try_resolve("/.cachefs/does_not_exist"),
            Err(VopsError::UnknownVirtualFile(n)) if n == "does_not_exist"
        ));
    }

    #[test]
    fn test_no_partial_matches() {
        let r = resolver(DEFAULT_PREFIX);
        for path in [
            "/.cachefs/file",
            "/.cachefs/file_tt",
            "/.cachefs/file_ttl_",
            "/.cachefs/file_ttl/",
            "/.cachefs/file_ttl/x",
            "/.cachefs/",
            "/.cachefs",
        ] {
            assert!(r.resolve(path).is_none(), "{path} should not resolve");
        }
    }

    #[test]
    fn test_prefix_is_component_wise() {
        let r = resolver(DEFAULT_PREFIX);
        assert!(matches!(
            r.try_resolve("/.cachefsx/file_ttl"),
            Err(VopsError::NotVirtual(_))
        ));
        assert!(matches!(
            r.try_resolve("/data/file_ttl"),
            Err(VopsError::NotVirtual(_))
        ));
    }

    #[test]
    fn test_prefix_normalization() {
        let r = resolver(".ctl/");
        assert_eq!(r.prefix(), "/.ctl");
        assert!(r.resolve("/.ctl/file_ttl").is_some());
        assert!(r.is_virtual_dir("/.ctl"));
        assert!(r.is_virtual_dir("/.ctl/"));
        assert!(!r.is_virtual_dir("/.ctl/file_ttl"));
    }

    #[test]
    fn test_root_prefix() {
        let r = resolver("/");
        assert_eq!(r.prefix(), "/");
        assert!(r.resolve("/file_ttl").is_some());
        assert!(r.is_virtual_dir("/"));
    }
}
