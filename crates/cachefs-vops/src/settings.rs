//! Startup settings, loaded from a RON file.
//!
//! These seed the live values at process start. Changes made through the
//! control files are not written back.
//!
//! ```ron
//! (
//!     prefix: "/.cachefs",
//!     error_policy: strict,
//!     read_state: normal,
//!     file_ttl: 600,
//!     backing_root: Some("/srv/backing"),
//! )
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resolver::DEFAULT_PREFIX;
use crate::state::{check_file_thread_interval, check_file_ttl, check_non_negative};
use crate::tables::{ReadState, WriteState};

/// How failed control writes are reported to the filesystem front end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Unknown files fail to open; rejected writes fail on close.
    #[default]
    Strict,
    /// Log and carry on: unknown files read empty, rejected writes succeed.
    Legacy,
}

/// Control plane settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Virtual directory inside the mount.
    pub prefix: String,
    pub error_policy: ErrorPolicy,
    pub read_state: ReadState,
    pub write_state: WriteState,
    /// Seconds between expiry passes, 1..=99.
    pub file_thread_interval: i64,
    /// Seconds an unused cached file stays open, 1..=`max_file_ttl`.
    pub file_ttl: i64,
    pub max_file_ttl: i64,
    /// Seconds a metadata entry stays valid.
    pub metadata_ttl: i64,
    /// Bytes per second; 0 disables throttling.
    pub transfer_max_rate: i64,
    /// Backing directory read by `metadata_fill`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backing_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            error_policy: ErrorPolicy::Strict,
            read_state: ReadState::Normal,
            write_state: WriteState::Cache,
            file_thread_interval: 1,
            file_ttl: 300,
            max_file_ttl: 3600,
            metadata_ttl: 120,
            transfer_max_rate: 100_000,
            backing_root: None,
        }
    }
}

/// Error loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl Settings {
    /// Load and validate settings from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Parse and validate settings from RON text.
    pub fn from_ron(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = ron::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply the same bounds the live setters enforce.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.prefix.is_empty() {
            return Err(invalid("prefix")("must not be empty".to_string()));
        }
        check_non_negative(self.max_file_ttl).map_err(invalid("max_file_ttl"))?;
        check_file_thread_interval(self.file_thread_interval)
            .map_err(invalid("file_thread_interval"))?;
        check_file_ttl(self.file_ttl, self.max_file_ttl).map_err(invalid("file_ttl"))?;
        check_non_negative(self.metadata_ttl).map_err(invalid("metadata_ttl"))?;
        check_non_negative(self.transfer_max_rate).map_err(invalid("transfer_max_rate"))?;
        Ok(())
    }
}

fn invalid(field: &'static str) -> impl Fn(String) -> SettingsError {
    move |reason| SettingsError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let s = Settings::from_ron(
            r#"(
                read_state: handsup,
                error_policy: legacy,
                file_ttl: 600,
                backing_root: Some("/srv/backing"),
            )"#,
        )
        .unwrap();
        assert_eq!(s.read_state, ReadState::Handsup);
        assert_eq!(s.error_policy, ErrorPolicy::Legacy);
        assert_eq!(s.file_ttl, 600);
        assert_eq!(s.backing_root, Some(PathBuf::from("/srv/backing")));
        assert_eq!(s.prefix, DEFAULT_PREFIX);
        assert_eq!(s.metadata_ttl, 120);
    }

    #[test]
    fn test_out_of_range() {
        let err = Settings::from_ron("(file_thread_interval: 0)").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "file_thread_interval", .. }));

        let err = Settings::from_ron("(file_ttl: 5000)").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "file_ttl", .. }));
    }

    #[test]
    fn test_bad_symbol() {
        assert!(matches!(
            Settings::from_ron("(read_state: sideways)"),
            Err(SettingsError::Ron(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vops.ron");
        std::fs::write(&path, "(transfer_max_rate: 0, prefix: \"/.ctl\")").unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.transfer_max_rate, 0);
        assert_eq!(s.prefix, "/.ctl");

        assert!(matches!(
            Settings::load(dir.path().join("missing.ron")),
            Err(SettingsError::Io(_))
        ));
    }
}
